//! Command-line interface.
//!
//! Config paths fall back to their env vars (`DIGEST_CONFIG_PATH`,
//! `DIGEST_SOURCES_PATH`) and then to the files under `config/`.

use clap::Parser;
use std::path::PathBuf;

use crate::render::Period;

pub const DEFAULT_OUT: &str = "out/latest.html";

/// Build the finance digest and optionally mail it.
///
/// ```sh
/// # write out/latest.html for the current week
/// finance-digest
///
/// # daily run, mailed, with metrics for a textfile collector
/// finance-digest --period day --send --metrics-out /var/lib/node_exporter/digest.prom
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Reporting period used for the label and subject
    #[arg(long, value_enum, default_value_t = Period::Week)]
    pub period: Period,

    /// Send the rendered digest by email
    #[arg(long)]
    pub send: bool,

    /// Path to digest.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to sources.toml
    #[arg(long)]
    pub sources: Option<PathBuf>,

    /// Path to ai.json
    #[arg(long, env = "DIGEST_AI_CONFIG_PATH")]
    pub ai_config: Option<PathBuf>,

    /// Where to write the HTML
    #[arg(long, default_value = DEFAULT_OUT)]
    pub out: PathBuf,

    /// Write Prometheus text exposition here at the end of the run
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["finance-digest"]);
        assert_eq!(cli.period, Period::Week);
        assert!(!cli.send);
        assert_eq!(cli.out, PathBuf::from(DEFAULT_OUT));
        assert!(cli.config.is_none());
        assert!(cli.metrics_out.is_none());
    }

    #[test]
    fn test_cli_all_flags() {
        let cli = Cli::parse_from([
            "finance-digest",
            "--period",
            "day",
            "--send",
            "--config",
            "/etc/digest.toml",
            "--sources",
            "/etc/sources.toml",
            "--out",
            "/tmp/d.html",
            "--metrics-out",
            "/tmp/d.prom",
        ]);
        assert_eq!(cli.period, Period::Day);
        assert!(cli.send);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/digest.toml")));
        assert_eq!(cli.sources, Some(PathBuf::from("/etc/sources.toml")));
        assert_eq!(cli.out, PathBuf::from("/tmp/d.html"));
        assert_eq!(cli.metrics_out, Some(PathBuf::from("/tmp/d.prom")));
    }

    #[test]
    fn test_cli_rejects_unknown_period() {
        assert!(Cli::try_parse_from(["finance-digest", "--period", "month"]).is_err());
    }
}
