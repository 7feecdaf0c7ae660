//! apilayer exchange-rates adapter.

use async_trait::async_trait;
use pocket_core::{ExchangeFailure, ExchangeQuote, ExchangeService};
use tracing::warn;

use crate::http::{fetch, RawResponse};

pub struct ExchangeRatesClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ExchangeRatesClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ExchangeService for ExchangeRatesClient {
    async fn rate(&self, amount: f64, from: &str, to: &str) -> Result<ExchangeQuote, ExchangeFailure> {
        let amount = amount.to_string();
        let request = self
            .client
            .get(&self.base_url)
            .header("apikey", &self.api_key)
            .query(&[("to", to), ("from", from), ("amount", amount.as_str())]);
        let Some(response) = fetch("exchange", request).await else {
            return Err(ExchangeFailure::UpstreamError);
        };
        let outcome = parse_exchange(&response);
        if let Err(failure) = &outcome {
            warn!(from, to, status = response.status, %failure, "Exchange lookup failed");
        }
        outcome
    }
}

/// Non-200 is an upstream failure; a 200 without `info.rate` means the
/// currency pair was not recognized.
pub fn parse_exchange(response: &RawResponse) -> Result<ExchangeQuote, ExchangeFailure> {
    if !response.is_ok() {
        return Err(ExchangeFailure::UpstreamError);
    }
    let body = response.body.as_ref().ok_or(ExchangeFailure::UpstreamError)?;
    body.pointer("/info/rate")
        .and_then(|rate| rate.as_f64())
        .map(|rate| ExchangeQuote { rate })
        .ok_or(ExchangeFailure::CurrencyNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rate() {
        let body = json!({
            "success": true,
            "query": {"from": "USD", "to": "EUR", "amount": 100},
            "info": {"timestamp": 1700000000, "rate": 0.92},
            "result": 92.0
        });
        assert_eq!(
            parse_exchange(&RawResponse::new(200, body)),
            Ok(ExchangeQuote { rate: 0.92 })
        );
    }

    #[test]
    fn test_missing_rate_is_currency_not_found() {
        let body = json!({
            "success": false,
            "error": {"code": 402, "type": "invalid_to_currency"}
        });
        assert_eq!(
            parse_exchange(&RawResponse::new(200, body)),
            Err(ExchangeFailure::CurrencyNotFound)
        );
    }

    #[test]
    fn test_non_200_is_upstream() {
        let body = json!({"message": "Invalid authentication credentials"});
        assert_eq!(
            parse_exchange(&RawResponse::new(401, body)),
            Err(ExchangeFailure::UpstreamError)
        );
        assert_eq!(
            parse_exchange(&RawResponse { status: 200, body: None }),
            Err(ExchangeFailure::UpstreamError)
        );
    }
}
