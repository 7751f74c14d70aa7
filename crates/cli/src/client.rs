//! API client for a running ConcreteIQ server

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strength_lib::MixDesign;
use url::Url;

/// Header carrying the session id
const SESSION_HEADER: &str = "x-session-id";

/// API client for the prediction server
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self {
            client,
            base_url,
            session: None,
        })
    }

    /// Scope history requests to a session
    pub fn with_session(mut self, session: Option<String>) -> Self {
        self.session = session;
        self
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => builder.header(SESSION_HEADER, session),
            None => builder,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .request(self.client.get(url))
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .request(self.client.delete(url))
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => err.messages.join("; "),
                Err(_) => body,
            };
            anyhow::bail!("API error ({}): {}", status, detail);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Fetch the session's recent predictions
    pub async fn history(&self, limit: Option<usize>) -> Result<HistoryView> {
        let path = match limit {
            Some(limit) => format!("api/v1/history?limit={}", limit),
            None => "api/v1/history".to_string(),
        };
        self.get(&path).await
    }

    /// Clear the session's predictions
    pub async fn clear_history(&self) -> Result<ClearedHistory> {
        self.delete("api/v1/history").await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub mix: MixDesign,
    pub prediction: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryView {
    pub session: String,
    pub total: usize,
    pub records: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedHistory {
    pub session: String,
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub messages: Vec<String>,
}
