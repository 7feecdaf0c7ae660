//! Shared request plumbing for the adapters.

use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ServicesConfig;
use crate::error::ServiceResult;

/// Status code and decoded body of a response.
///
/// `body` is `None` when the payload was not valid JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Build the client shared by all adapters.
pub fn build_client(config: &ServicesConfig) -> ServiceResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(concat!("pocket/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Send a request once. `None` means the request never got a response.
pub async fn fetch(service: &'static str, request: RequestBuilder) -> Option<RawResponse> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(service, error = %e, "Request failed");
            return None;
        }
    };

    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(text) => serde_json::from_str(&text).ok(),
        Err(e) => {
            warn!(service, status, error = %e, "Failed to read response body");
            None
        }
    };
    debug!(service, status, "Response received");
    Some(RawResponse { status, body })
}
