//! Logging setup for the `shield` binary.
//!
//! The filter comes from `RUST_LOG`, then `SHIELD_LOG_LEVEL`, then `info`.
//! `SHIELD_JSON_LOGS=true` switches to JSON output. Logs go to stderr so
//! command output on stdout stays machine-readable.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

/// Filter directive from the given environment lookup.
pub fn filter_directive(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("RUST_LOG")
        .or_else(|| lookup("SHIELD_LOG_LEVEL"))
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

fn json_logs(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup("SHIELD_JSON_LOGS").is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Install the global subscriber.
pub fn init() -> Result<()> {
    let lookup = |key: &str| std::env::var(key).ok();
    let directive = filter_directive(lookup);
    let env_filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter '{directive}'"))?;

    if json_logs(lookup) {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .context("failed to install JSON logger")?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(true)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("failed to install logger")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_filter_precedence() {
        assert_eq!(filter_directive(env(&[])), "info");
        assert_eq!(filter_directive(env(&[("SHIELD_LOG_LEVEL", "debug")])), "debug");
        assert_eq!(
            filter_directive(env(&[("SHIELD_LOG_LEVEL", "debug"), ("RUST_LOG", "shield_console=trace")])),
            "shield_console=trace"
        );
    }

    #[test]
    fn test_json_logs_flag() {
        assert!(json_logs(env(&[("SHIELD_JSON_LOGS", "TRUE")])));
        assert!(!json_logs(env(&[("SHIELD_JSON_LOGS", "1")])));
        assert!(!json_logs(env(&[])));
    }
}
