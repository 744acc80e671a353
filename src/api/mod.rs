pub mod auth;
pub mod chat;

use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: None,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn client(&self) -> Result<Client, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Turn a non-2xx response into `ApiError::Api`, using the body's `error`
/// field when the server sent one.
pub(crate) async fn check_status(resp: Response) -> Result<Response, ApiError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| "Something went wrong".to_string());
    Err(ApiError::Api { status, message })
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}
