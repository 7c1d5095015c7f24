//! Log setup and the resolution report sink.
//!
//! Logs go to stderr so stdout only ever carries results. The report is a
//! pretty-printed [`Resolution`] snapshot, overwritten on each run.

use std::path::Path;

use anyhow::{Context, Result};
use resolution::Resolution;
use tracing::info;

/// Install the global subscriber: `RUST_LOG` if set, else `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Write `resolution` as JSON to `path`.
pub fn write_report(resolution: &Resolution, path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(resolution).context("Failed to serialize resolution")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!(path = %path.display(), run_id = %resolution.run_id, "Wrote resolution report");
    Ok(())
}
