//! Structured logging.
//!
//! `RUST_LOG` takes precedence; otherwise the configured level applies to the
//! gateway and to `tower_http` request spans.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Default filter directive for a log level.
pub fn default_directive(level: &str) -> String {
    format!("service_gateway={level},tower_http={level}")
}

/// Install the global subscriber. Call once, from `main`.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(
            default_directive("debug"),
            "service_gateway=debug,tower_http=debug"
        );
    }
}
