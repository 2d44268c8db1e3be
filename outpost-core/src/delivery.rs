//! Delivery clients: the boundary between the dispatcher and the systems
//! that actually receive events.
//!
//! Success or failure is the entire contract surface. The dispatcher folds
//! every failure – timeout, transport error, destination rejection – into
//! the same retry path, so delivery clients do not classify their errors.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

/// Errors that can occur during a delivery attempt.
///
/// The `Display` rendering of the error becomes the event's `last_error`
/// verbatim, so messages are written for operators.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// HTTP request error (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The destination answered with a non-2xx status.
    #[error("destination returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// No destination is configured for the event type.
    #[error("no destination configured for event type {0:?}")]
    NoRoute(String),

    /// Failure scripted by a test double.
    #[error("{0}")]
    Scripted(String),
}

/// Transmits an event payload to its downstream destination.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn send(&self, event_type: &str, payload: &serde_json::Value)
    -> Result<(), DeliveryError>;
}

/// Delivers events as HTTP POST webhooks, routed by event type.
///
/// Types without an explicit route fall back to the default destination if
/// one is configured; otherwise the attempt fails like any other delivery
/// failure and the operator sees it in `last_error`.
#[derive(Debug, Clone)]
pub struct WebhookDeliveryClient {
    http: reqwest::Client,
    routes: HashMap<String, Url>,
    default_route: Option<Url>,
}

impl WebhookDeliveryClient {
    pub fn new(routes: HashMap<String, Url>, default_route: Option<Url>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            routes,
            default_route,
        }
    }

    fn route(&self, event_type: &str) -> Option<&Url> {
        self.routes.get(event_type).or(self.default_route.as_ref())
    }
}

#[async_trait]
impl DeliveryClient for WebhookDeliveryClient {
    async fn send(
        &self,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), DeliveryError> {
        let Some(url) = self.route(event_type) else {
            return Err(DeliveryError::NoRoute(event_type.to_string()));
        };

        let response = self
            .http
            .post(url.clone())
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Scripted delivery double for tests: pops one queued outcome per send and
/// records every attempt. An exhausted script keeps returning success.
#[derive(Debug, Default)]
pub struct ScriptedDeliveryClient {
    outcomes: Mutex<VecDeque<Result<(), String>>>,
    attempts: Mutex<Vec<(String, serde_json::Value)>>,
}

impl ScriptedDeliveryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next outcomes, in order. `Err` values become the failure
    /// detail the store records as `last_error`.
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Result<(), String>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Append an outcome to the script.
    pub async fn push_outcome(&self, outcome: Result<(), String>) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// All `(event_type, payload)` pairs attempted so far.
    pub async fn attempts(&self) -> Vec<(String, serde_json::Value)> {
        self.attempts.lock().await.clone()
    }

    pub async fn attempt_count(&self) -> usize {
        self.attempts.lock().await.len()
    }
}

#[async_trait]
impl DeliveryClient for ScriptedDeliveryClient {
    async fn send(
        &self,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), DeliveryError> {
        self.attempts
            .lock()
            .await
            .push((event_type.to_string(), payload.clone()));

        match self.outcomes.lock().await.pop_front() {
            Some(Ok(())) | None => Ok(()),
            Some(Err(detail)) => Err(DeliveryError::Scripted(detail)),
        }
    }
}
