//! Process-wide tracing setup shared by `mana-base` and the standalone binaries.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Default filter for every binary when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Line layout picked with `LOG_FORMAT`. `compact` drops file and line numbers,
/// which keeps the progress lines of a long import on one screen row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Full,
    Compact,
}

impl LogFormat {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Full,
        }
    }
}

/// A blank or unparsable `RUST_LOG` falls back to `default_filter`.
fn build_filter(rust_log: Option<&str>, default_filter: &str) -> EnvFilter {
    rust_log
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}

pub fn init_tracing(default_filter: &str) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(rust_log.as_deref(), default_filter))
        .with_target(true);

    let installed = match format {
        LogFormat::Full => builder.with_file(true).with_line_number(true).try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| anyhow!("failed to initialize tracing: {e}"))
}
