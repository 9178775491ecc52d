use std::sync::Once;

use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::{EnvFilter, prelude::*};

static INIT: Once = Once::new();

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber once. `RUST_LOG` overrides `log_level`.
pub fn init_logging(log_level: &str) {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(env_filter(log_level))
            .with(tracing_fmt::layer().with_target(false))
            .try_init();
    });
}

/// Subscriber for test binaries; output is captured by the test runner.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("info,tedge_it=debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init_logging("debug");
        init_logging("info");
        init_test_logging();
        tracing::info!("logging initialised twice without panicking");
    }

    #[test]
    fn test_invalid_level_falls_back() {
        // an invalid directive must not panic
        let _ = env_filter("not a level ===");
    }
}
