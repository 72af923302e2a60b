//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Honor `RUST_LOG` when set, else the configured level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Fallback filter scopes the level to this crate so dependency noise stays quiet

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build the filter directive used when `RUST_LOG` is unset.
pub fn default_directive(level: &str) -> String {
    format!("tcp_http={}", level.to_ascii_lowercase())
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_is_scoped_to_crate() {
        assert_eq!(default_directive("DEBUG"), "tcp_http=debug");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init("info");
        init("trace");
    }
}
