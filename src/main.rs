//! Finance digest binary entrypoint.
//! Loads config, runs one digest, writes the HTML and optionally mails it.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use finance_digest::cli::Cli;
use finance_digest::config::{ai::DEFAULT_AI_CONFIG_PATH, AiConfig, DigestConfig, SourcesConfig};
use finance_digest::metrics::{write_then, Metrics};
use finance_digest::notify::{send_digest, Outgoing};
use finance_digest::pipeline::{build_digest, fallback_sources, http_client, primary_providers};
use finance_digest::summarize::build_summarizer;

const DEFAULT_FILTER: &str =
    "finance_digest=info,ingest=info,select=info,summarize=info,notify=info,warn";

/// Compact logs by default; JSON lines when `DIGEST_LOG_JSON=1`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("DIGEST_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env if present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let metrics = match cli.metrics_out.as_ref() {
        Some(_) => Some(Metrics::init()?),
        None => None,
    };

    let cfg = DigestConfig::load(cli.config.as_deref())?;
    let sources = SourcesConfig::load(cli.sources.as_deref())?;
    let ai_path = cli
        .ai_config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_AI_CONFIG_PATH));
    let ai = AiConfig::load_or_disabled(&ai_path);

    let http = http_client(&sources)?;
    let primary = primary_providers(&sources, &http);
    let fallbacks = fallback_sources(&sources, &http);
    let summarizer = build_summarizer(&ai);

    let now = chrono::Utc::now().with_timezone(&cfg.window.tz());
    let digest = build_digest(
        &cfg,
        &primary,
        &fallbacks,
        summarizer.as_ref(),
        cli.period,
        now,
    )
    .await;

    let report = &digest.selection.report;
    if !report.failed_sources.is_empty() {
        warn!(failed = ?report.failed_sources, "some sources were unavailable");
    }

    if let Some(dir) = cli.out.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(&cli.out, &digest.html)
        .with_context(|| format!("writing {}", cli.out.display()))?;
    info!(path = %cli.out.display(), subject = %digest.subject, "digest written");
    println!("Wrote {}", cli.out.display());

    let sent = if cli.send {
        let msg = Outgoing {
            subject: &digest.subject,
            html: &digest.html,
            email: &cfg.email,
            recipients: &cfg.recipients,
        };
        send_digest(&msg, &http).await
    } else {
        Ok(())
    };

    write_then(metrics.as_ref(), cli.metrics_out.as_deref(), sent)
}
