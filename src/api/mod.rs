pub mod channels;
pub mod stats;
pub mod timeline;
pub mod types;

use chrono::{DateTime, Utc};
use reqwest::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited until {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },
    #[error("API error (status {status}): {detail}")]
    ApiError { status: u16, detail: String },
    #[error("deserialization error: {0}")]
    Deserialize(String),
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

/// Client for the lucerne backend.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted, so
/// spawned tasks each take their own copy.
#[derive(Debug, Clone)]
pub struct LucerneClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl LucerneClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path (e.g. "/timeline?max=1").
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Issue a GET and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiClientError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let body = Self::check_status(resp).await?.text().await?;
        serde_json::from_str::<T>(&body)
            .map_err(|e| ApiClientError::Deserialize(format!("{e}: {body}")))
    }

    /// Issue a PUT with a JSON body, ignoring the response body.
    pub(crate) async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiClientError> {
        let url = self.url(path);
        tracing::debug!(%url, "PUT");
        let resp = self.http_client.put(&url).json(body).send().await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    /// Map non-success statuses to errors.
    async fn check_status(resp: Response) -> Result<Response, ApiClientError> {
        let status = resp.status();

        if status.as_u16() == 429 {
            let reset_at = resp
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .unwrap_or_else(Utc::now);
            return Err(ApiClientError::RateLimited { reset_at });
        }

        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ApiClientError::ApiError {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = LucerneClient::new("http://localhost:7238/");
        assert_eq!(client.url("/timeline"), "http://localhost:7238/timeline");
    }

    #[test]
    fn errors_render_for_popup() {
        let err = ApiClientError::ApiError {
            status: 502,
            detail: "upstream timeout".into(),
        };
        assert_eq!(err.to_string(), "API error (status 502): upstream timeout");
    }
}
