/// Tracing setup for TaskTrack binaries
///
/// `RUST_LOG` wins when set; otherwise the given default filter is used.
/// Log lines go to stderr so command output on stdout stays clean.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter for the TaskTrack crates
pub const DEFAULT_FILTER: &str = "tasktrack_shared=info,tasktrack_cli=info";

/// Installs the global tracing subscriber
///
/// # Errors
///
/// Fails if a global subscriber is already installed
pub fn init_tracing(default_filter: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Only the first call in the process can install a subscriber.
        let _ = init_tracing(DEFAULT_FILTER);
        assert!(init_tracing(DEFAULT_FILTER).is_err());
    }
}
