use anyhow::{Context, Result};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use tracing::warn;

/// Prometheus recorder for one run. The exposition is written to a file at
/// the end (textfile-collector style) instead of being served.
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder and describe every metric the crate emits.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        std::fs::write(path, self.render())
            .with_context(|| format!("writing metrics to {}", path.display()))
    }
}

/// Write the exposition when enabled, then hand back `outcome`. A failed send
/// still leaves this run's metrics on disk.
pub fn write_then<T>(metrics: Option<&Metrics>, path: Option<&Path>, outcome: Result<T>) -> Result<T> {
    if let (Some(m), Some(path)) = (metrics, path) {
        if let Err(e) = m.write_to(path) {
            if outcome.is_ok() {
                return Err(e);
            }
            warn!(error = %e, "metrics not written");
        }
    }
    outcome
}

fn describe() {
    describe_counter!("digest_items_fetched_total", "Raw entries returned by sources");
    describe_counter!("digest_source_errors_total", "Source fetches that failed");
    describe_counter!("digest_dedup_dropped_total", "Items dropped as near-duplicates");
    describe_counter!("digest_stage_added_total", "Items added to buckets, by cascade stage");
    describe_counter!("digest_placeholders_total", "Buckets filled with a placeholder");
    describe_counter!("digest_summarize_retries_total", "Summaries retried after a quality miss");
    describe_counter!("digest_summarize_fallbacks_total", "Summaries replaced by the source snippet");
    describe_histogram!("digest_feed_parse_ms", Unit::Milliseconds, "Feed parse time");
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn detached() -> Metrics {
        let recorder = PrometheusBuilder::new().build_recorder();
        Metrics {
            handle: recorder.handle(),
        }
    }

    #[test]
    fn metrics_are_written_even_when_the_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/metrics.prom");
        let m = detached();

        let res: Result<()> = write_then(Some(&m), Some(&path), Err(anyhow!("smtp down")));
        assert_eq!(res.unwrap_err().to_string(), "smtp down");
        assert!(path.exists());
    }

    #[test]
    fn disabled_metrics_pass_the_outcome_through() {
        assert_eq!(write_then(None, None, Ok(7)).unwrap(), 7);
    }
}
