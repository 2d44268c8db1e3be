//! Admin API client (operator console → Outpost server).

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::{ClientError, check_response, parse_response};
use crate::objects::events::{
    AdminEventResponse, BulkEventRequest, BulkEventResponse, EventPage, ListEventsQuery,
};

/// Typed HTTP client for the Outpost **Admin API**.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
}

impl AdminClient {
    /// Create a new `AdminClient`.
    ///
    /// * `base_url` – root URL of the Outpost server.
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

    /// `GET /api/v1/admin/events` – list events with optional filters.
    pub async fn list_events(&self, query: &ListEventsQuery) -> Result<EventPage, ClientError> {
        let url = self.base_url.join("/api/v1/admin/events")?;

        let resp = self.http.get(url).query(query).send().await?;

        parse_response(resp).await
    }

    /// `GET /api/v1/admin/events/{event_id}` – fetch a single event.
    pub async fn get_event(&self, event_id: Uuid) -> Result<AdminEventResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/admin/events/{event_id}"))?;

        let resp = self.http.get(url).send().await?;

        parse_response(resp).await
    }

    /// `POST /api/v1/admin/events/{event_id}/retry` – re-queue a failed
    /// event for delivery, bypassing the retry cap.
    pub async fn retry_event(&self, event_id: Uuid) -> Result<AdminEventResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/admin/events/{event_id}/retry"))?;

        let resp = self.http.post(url).send().await?;

        parse_response(resp).await
    }

    /// `DELETE /api/v1/admin/events/{event_id}` – delete a sent or failed
    /// event.
    pub async fn delete_event(&self, event_id: Uuid) -> Result<(), ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/admin/events/{event_id}"))?;

        let resp = self.http.delete(url).send().await?;

        check_response(resp).await
    }

    /// `POST /api/v1/admin/events/bulk-retry` – retry many events; the
    /// response reports a per-id outcome.
    pub async fn bulk_retry(&self, event_ids: Vec<Uuid>) -> Result<BulkEventResponse, ClientError> {
        let url = self.base_url.join("/api/v1/admin/events/bulk-retry")?;

        let resp = self
            .http
            .post(url)
            .json(&BulkEventRequest { event_ids })
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /api/v1/admin/events/bulk-delete` – delete many events; the
    /// response reports a per-id outcome.
    pub async fn bulk_delete(
        &self,
        event_ids: Vec<Uuid>,
    ) -> Result<BulkEventResponse, ClientError> {
        let url = self.base_url.join("/api/v1/admin/events/bulk-delete")?;

        let resp = self
            .http
            .post(url)
            .json(&BulkEventRequest { event_ids })
            .send()
            .await?;

        parse_response(resp).await
    }
}
