//! Log output for tests.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Send client logs to the test harness output. Only the first call in a
/// test binary installs the subscriber; `RUST_LOG` overrides
/// [`DEFAULT_FILTER`].
pub fn init_test_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_test_tracing();
        init_test_tracing();
        tracing::warn!("visible in captured test output");
    }
}
