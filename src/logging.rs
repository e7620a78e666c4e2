//! Diagnostic logging with `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `KICK_LOG` environment variable (a level or any `EnvFilter` directive)
//! 3. default to `warn`
//!
//! Logs go to STDERR. User-facing progress messages are printed by the
//! execution context instead and are not affected by this filter.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted when no level is passed on the command line
pub const LOG_ENV: &str = "KICK_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(cli_level: Option<&str>) {
    let directive = cli_level
        .map(str::to_string)
        .or_else(|| std::env::var(LOG_ENV).ok())
        .and_then(|s| parse_filter(&s))
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let _ = fmt()
        .with_env_filter(directive)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_filter(s: &str) -> Option<EnvFilter> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    let s = if s == "warning" { "warn".to_string() } else { s };
    EnvFilter::try_new(s).ok()
}
