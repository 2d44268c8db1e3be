//! Runtime configuration derived from the TOML file.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use outpost_core::dispatcher::DispatcherConfig;
use outpost_core::retry::RetryPolicy;
use url::Url;

use crate::config::file::FileConfig;

/// Fully-resolved configuration the server runs with.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub listen: SocketAddr,
    /// Number of dispatcher workers to spawn.
    pub workers: u32,
    /// Dispatch loop settings handed to each worker.
    pub dispatcher: DispatcherConfig,
    /// Destination URL per event type.
    pub routes: HashMap<String, Url>,
    /// Fallback destination for unrouted event types.
    pub default_route: Option<Url>,
}

impl RuntimeConfig {
    pub fn from_file(config: FileConfig) -> Self {
        let dispatcher = DispatcherConfig {
            batch_size: config.dispatcher.batch_size,
            poll_interval: Duration::from_secs(config.dispatcher.poll_interval_secs),
            delivery_timeout: Duration::from_secs(config.dispatcher.delivery_timeout_secs),
            retry: RetryPolicy {
                base: time::Duration::seconds(config.dispatcher.backoff_base_secs as i64),
                max_exponent: config.dispatcher.backoff_max_exponent,
            },
        };

        let routes = config
            .delivery
            .routes
            .into_iter()
            .map(|r| (r.event_type, r.url))
            .collect();

        Self {
            listen: config.server.listen,
            workers: config.dispatcher.workers,
            dispatcher,
            routes,
            default_route: config.delivery.default_url,
        }
    }
}
