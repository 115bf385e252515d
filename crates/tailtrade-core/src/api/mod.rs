//! HTTP client for the Tail Trading API
//!
//! Thin typed wrappers over the service endpoints. Every authenticated
//! request carries the bearer token; a 401 surfaces as
//! [`ClientError::AuthExpired`] so callers can re-authenticate.

mod scheduler;
mod selection;
mod types;

pub use types::{
    AckResponse, ConceptRow, ConceptsResponse, Health, LoginRequest, LoginResponse,
    MessageResponse, NumOrStr, SchedulerLogs, SchedulerStartRequest, SchedulerStatus,
    SelectRequest, SelectResponse, StockRow, Strategy, StrategyResults, StrategyResultsData,
    StrategySlot,
};

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{status_error, ClientError};
use crate::stream::{self, EventSink, StreamSession};

/// Client for one Tail Trading deployment.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` points at the API root, e.g. `http://host:8000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Install a bearer token obtained out of band.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.get(self.url(path)))
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.post(self.url(path)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode the JSON body, mapping non-success
    /// statuses to the matching error kind.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Authenticate and hold the returned token for later requests.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .execute(self.http.post(self.url("/auth/login")).json(&body))
            .await?;
        info!("logged in as {}", response.username);
        self.token = Some(response.access_token.clone());
        Ok(response)
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        self.execute(self.get("/health")).await
    }

    /// Drop the server-side data cache.
    pub async fn clear_cache(&self) -> Result<AckResponse, ClientError> {
        self.execute(self.post("/stock/clear-cache")).await
    }

    /// Open the data-update progress stream.
    ///
    /// The returned session is active; events arrive on `sink` until a
    /// terminal event, end-of-stream, timeout, or an explicit close.
    pub async fn open_update_stream<S>(
        &self,
        top_n: u32,
        timeout: Duration,
        sink: S,
    ) -> Result<StreamSession, ClientError>
    where
        S: EventSink + 'static,
    {
        let request = self
            .get("/stock/update-stream")
            .query(&[("top_n", top_n)]);
        stream::open(request, timeout, sink).await
    }
}
