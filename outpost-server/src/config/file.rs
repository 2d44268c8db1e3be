//! TOML file configuration structures.
//!
//! These structs directly map to the `outpost-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub dispatcher: DispatcherSection,
    #[serde(default)]
    pub delivery: DeliverySection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default address")
}

/// Dispatcher configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSection {
    /// Number of dispatcher workers to run.
    #[serde(default = "default_workers")]
    pub workers: u32,
    /// Maximum events claimed per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Seconds between polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Per-attempt delivery timeout in seconds.
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    /// Base delay of the exponential backoff schedule, in seconds.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Exponent cap of the backoff schedule.
    #[serde(default = "default_backoff_max_exponent")]
    pub backoff_max_exponent: u32,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval_secs(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_exponent: default_backoff_max_exponent(),
        }
    }
}

fn default_workers() -> u32 {
    2
}

fn default_batch_size() -> i64 {
    32
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_delivery_timeout_secs() -> u64 {
    30
}

fn default_backoff_base_secs() -> u64 {
    1
}

fn default_backoff_max_exponent() -> u32 {
    outpost_core::retry::MAX_BACKOFF_EXPONENT
}

/// Delivery routing section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliverySection {
    /// Fallback destination for event types without an explicit route.
    pub default_url: Option<Url>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// Maps one event type to its destination webhook URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub event_type: String,
    pub url: Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[dispatcher]
workers = 4
batch_size = 64
poll_interval_secs = 2

[delivery]
default_url = "https://hooks.example.com/events"

[[delivery.routes]]
event_type = "BOOKING_CONFIRMED"
url = "https://bookings.example.com/webhook"

[[delivery.routes]]
event_type = "QUOTE_EXPIRED"
url = "https://quotes.example.com/webhook"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.dispatcher.workers, 4);
        assert_eq!(config.dispatcher.batch_size, 64);
        assert_eq!(config.dispatcher.poll_interval_secs, 2);
        // Unspecified dispatcher fields keep their defaults.
        assert_eq!(config.dispatcher.delivery_timeout_secs, 30);
        assert_eq!(config.delivery.routes.len(), 2);
        assert!(config.delivery.default_url.is_some());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let toml_str = r#"
[server]
listen = "0.0.0.0:8080"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dispatcher.workers, 2);
        assert_eq!(config.dispatcher.batch_size, 32);
        assert_eq!(config.dispatcher.backoff_base_secs, 1);
        assert!(config.delivery.routes.is_empty());
        assert!(config.delivery.default_url.is_none());
    }
}
