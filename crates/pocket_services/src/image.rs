//! Unsplash random-photo adapter.

use async_trait::async_trait;
use pocket_core::{ImageFailure, ImageRef, ImageService};
use tracing::warn;

use crate::http::{fetch, RawResponse};

pub struct UnsplashClient {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
}

impl UnsplashClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            access_key: access_key.into(),
        }
    }
}

#[async_trait]
impl ImageService for UnsplashClient {
    async fn random(&self, query: &str) -> Result<ImageRef, ImageFailure> {
        let request = self
            .client
            .get(&self.base_url)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .query(&[("query", query), ("orientation", "portrait")]);
        let Some(response) = fetch("image", request).await else {
            return Err(ImageFailure::UpstreamError);
        };
        let outcome = parse_image(&response);
        if outcome.is_err() {
            warn!(query, status = response.status, "Image lookup failed");
        }
        outcome
    }
}

pub fn parse_image(response: &RawResponse) -> Result<ImageRef, ImageFailure> {
    if !response.is_ok() {
        return Err(ImageFailure::UpstreamError);
    }
    response
        .body
        .as_ref()
        .and_then(|body| body.pointer("/urls/regular"))
        .and_then(|url| url.as_str())
        .map(|url| ImageRef {
            url: url.to_string(),
        })
        .ok_or(ImageFailure::UpstreamError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_regular_url() {
        let body = json!({
            "id": "abc",
            "urls": {"raw": "https://r", "regular": "https://images.unsplash.com/photo-1?w=1080"}
        });
        assert_eq!(
            parse_image(&RawResponse::new(200, body)).unwrap().url,
            "https://images.unsplash.com/photo-1?w=1080"
        );
    }

    #[test]
    fn test_every_failure_is_upstream() {
        let missing = json!({"urls": {"raw": "https://r"}});
        let limited = json!({"errors": ["Rate Limit Exceeded"]});
        assert_eq!(parse_image(&RawResponse::new(200, missing)), Err(ImageFailure::UpstreamError));
        assert_eq!(parse_image(&RawResponse::new(403, limited)), Err(ImageFailure::UpstreamError));
        assert_eq!(
            parse_image(&RawResponse { status: 200, body: None }),
            Err(ImageFailure::UpstreamError)
        );
    }
}
