//! Logging setup
//!
//! Logs go to stderr so `run` and `classify` can keep stdout for JSON.
//! The filter comes from `TRIAGE_LOG`, then `RUST_LOG`, then the `-v`
//! count (`info`, `debug`, `trace`).

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "TRIAGE_LOG";

/// Filter directive to use given the verbosity flag and environment.
pub fn filter_directive(verbose: u8, lookup: impl Fn(&str) -> Option<String>) -> String {
    if let Some(directive) = [LOG_ENV, "RUST_LOG"]
        .into_iter()
        .filter_map(&lookup)
        .find(|v| !v.trim().is_empty())
    {
        return directive;
    }
    match verbose {
        0 => "info".to_string(),
        1 => "info,triage=debug,support_agents=debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbose: u8) {
    let directive = filter_directive(verbose, |key| std::env::var(key).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
