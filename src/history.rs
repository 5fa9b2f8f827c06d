//! History loader for transcripts and the session list
//!
//! Request/response calls to the backend's HTTP surface. Every call is
//! bounded by a fixed timeout, after which reqwest cancels the in-flight
//! request. The client is built without a cookie store, so credentials are
//! never attached to these calls.

use std::time::Duration;

use serde::Deserialize;

use crate::model::{Message, Session, SessionId};
use crate::{Error, Result};

/// Timeout applied to every history call
pub const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the backend's transcript and session endpoints
#[derive(Debug, Clone)]
pub struct HistoryLoader {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SessionListResponse {
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    messages: Vec<Message>,
}

impl HistoryLoader {
    /// Create a loader for the given base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fetch the transcript for a session via `GET /chat/{sessionId}`
    ///
    /// # Errors
    ///
    /// Returns `Timeout` on deadline expiry and `HttpStatus` on non-2xx
    pub async fn fetch_transcript(&self, id: &SessionId) -> Result<Vec<Message>> {
        let url = format!("{}/chat/{id}", self.base_url);
        let response = self.get(&url).await?;
        let parsed: TranscriptResponse = response.json().await.map_err(map_reqwest)?;
        tracing::debug!(session_id = %id, count = parsed.messages.len(), "fetched transcript");
        Ok(parsed.messages)
    }

    /// Fetch the session list via `GET /session`
    ///
    /// # Errors
    ///
    /// Returns `Timeout` on deadline expiry and `HttpStatus` on non-2xx
    pub async fn fetch_session_list(&self) -> Result<Vec<Session>> {
        let url = format!("{}/session", self.base_url);
        let response = self.get(&url).await?;
        let parsed: SessionListResponse = response.json().await.map_err(map_reqwest)?;
        Ok(parsed.sessions)
    }

    /// Delete a session's transcript via `DELETE /chat/{sessionId}`
    ///
    /// # Errors
    ///
    /// Returns `Timeout` on deadline expiry and `HttpStatus` on non-2xx
    pub async fn delete_transcript(&self, id: &SessionId) -> Result<()> {
        let url = format!("{}/chat/{id}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(map_reqwest)?;
        check_status(&response)?;
        tracing::info!(session_id = %id, "deleted transcript");
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;
        check_status(&response)?;
        Ok(response)
    }
}

fn check_status(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::HttpStatus(status.as_u16()))
    }
}

/// Map reqwest timeouts to the timeout error variant
fn map_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e)
    }
}
