//! Service API client (producer systems → Outpost server).
//!
//! Producers that share a database with the server should prefer inserting
//! through `outpost-core` inside their own transaction; this client is for
//! producers enqueueing over HTTP.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::events::{EnqueueEventRequest, EnqueueEventResponse};

/// Typed HTTP client for the Outpost **Service API**.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: Url,
}

impl ServiceClient {
    /// Create a new `ServiceClient`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/service/events` – durably enqueue an event for
    /// delivery. Returns the assigned event id.
    pub async fn enqueue_event(
        &self,
        request: &EnqueueEventRequest,
    ) -> Result<EnqueueEventResponse, ClientError> {
        let url = self.base_url.join("/api/v1/service/events")?;

        let resp = self.http.post(url).json(request).send().await?;

        parse_response(resp).await
    }
}
