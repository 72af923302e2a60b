//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Request parser limits.
    pub parser: ParserConfig,

    /// Shutdown behavior.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Settings for the bundled demo handler.
    pub demo: DemoConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:42069").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:42069".to_string(),
            max_connections: 1024,
        }
    }
}

/// Request parser configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Starting size of the per-connection read buffer in bytes.
    pub initial_buffer_size: usize,

    /// Largest the read buffer may grow. Bounds a single unparsed line.
    pub max_buffer_size: usize,

    /// Largest Content-Length accepted.
    pub max_body_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            initial_buffer_size: 1024,
            max_buffer_size: 64 * 1024,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long to wait for in-flight connections after shutdown is signaled.
    pub drain_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Demo handler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Directory holding static assets such as `vim.mp4`.
    pub assets_dir: String,

    /// Upstream base URL for the `/httpbin/` relay.
    pub relay_base_url: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            assets_dir: "assets".to_string(),
            relay_base_url: "https://httpbin.org".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:8080"

            [parser]
            max_buffer_size = 4096
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert_eq!(config.listener.max_connections, 1024);
        assert_eq!(config.parser.initial_buffer_size, 1024);
        assert_eq!(config.parser.max_buffer_size, 4096);
        assert_eq!(config.lifecycle.drain_timeout_secs, 30);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.demo.relay_base_url, "https://httpbin.org");
    }

    #[test]
    fn empty_file_is_default() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:42069");
        assert!(!config.observability.metrics_enabled);
    }
}
