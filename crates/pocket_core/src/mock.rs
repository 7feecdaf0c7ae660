//! Canned service adapters and a recording transport.
//!
//! Used by the integration tests and by the console's offline mode, where the
//! dialogues can be exercised without any API keys.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::TransportError;
use crate::services::{
    ExchangeFailure, ExchangeQuote, ExchangeService, ImageFailure, ImageRef, ImageService,
    PollFailure, PollRequest, PollService, Services, WeatherFailure, WeatherReport,
    WeatherService,
};
use crate::transport::Transport;
use crate::types::{ChatId, Outbound};

/// Captured adapter call for verification.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedCall {
    Weather { city: String },
    Exchange { amount: f64, from: String, to: String },
    Image { query: String },
    Poll(PollRequest),
}

impl CapturedCall {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Weather { .. } => "weather",
            Self::Exchange { .. } => "exchange",
            Self::Image { .. } => "image",
            Self::Poll(_) => "poll",
        }
    }
}

/// Service adapters answering with preset outcomes.
///
/// Every call is recorded; the outcome returned is whatever was last set for
/// that adapter.
#[derive(Clone)]
pub struct MockServices {
    weather: Arc<RwLock<Result<WeatherReport, WeatherFailure>>>,
    exchange: Arc<RwLock<Result<ExchangeQuote, ExchangeFailure>>>,
    image: Arc<RwLock<Result<ImageRef, ImageFailure>>>,
    poll: Arc<RwLock<Result<(), PollFailure>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
}

impl Default for MockServices {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServices {
    /// Every adapter succeeds: mild weather, a 0.92 rate, a fixed picture.
    pub fn new() -> Self {
        Self {
            weather: Arc::new(RwLock::new(Ok(WeatherReport {
                description: "clear sky".to_string(),
                temperature: 21.0,
                feels_like: 20.5,
                humidity: 40.0,
                wind_speed: 3.0,
            }))),
            exchange: Arc::new(RwLock::new(Ok(ExchangeQuote { rate: 0.92 }))),
            image: Arc::new(RwLock::new(Ok(ImageRef {
                url: "https://images.example.com/animal.jpg".to_string(),
            }))),
            poll: Arc::new(RwLock::new(Ok(()))),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn set_weather(self, outcome: Result<WeatherReport, WeatherFailure>) -> Self {
        *self.weather.write() = outcome;
        self
    }

    pub fn set_exchange(self, outcome: Result<ExchangeQuote, ExchangeFailure>) -> Self {
        *self.exchange.write() = outcome;
        self
    }

    pub fn set_image(self, outcome: Result<ImageRef, ImageFailure>) -> Self {
        *self.image.write() = outcome;
        self
    }

    pub fn set_poll(self, outcome: Result<(), PollFailure>) -> Self {
        *self.poll.write() = outcome;
        self
    }

    /// All calls made so far.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    /// Bundle these adapters as the assistant's [`Services`].
    pub fn services(&self) -> Services {
        let shared = Arc::new(self.clone());
        Services::new(shared.clone(), shared.clone(), shared.clone(), shared)
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }
}

#[async_trait]
impl WeatherService for MockServices {
    async fn current(&self, city: &str) -> Result<WeatherReport, WeatherFailure> {
        self.record_call(CapturedCall::Weather {
            city: city.to_string(),
        });
        self.weather.read().clone()
    }
}

#[async_trait]
impl ExchangeService for MockServices {
    async fn rate(&self, amount: f64, from: &str, to: &str) -> Result<ExchangeQuote, ExchangeFailure> {
        self.record_call(CapturedCall::Exchange {
            amount,
            from: from.to_string(),
            to: to.to_string(),
        });
        *self.exchange.read()
    }
}

#[async_trait]
impl ImageService for MockServices {
    async fn random(&self, query: &str) -> Result<ImageRef, ImageFailure> {
        self.record_call(CapturedCall::Image {
            query: query.to_string(),
        });
        self.image.read().clone()
    }
}

#[async_trait]
impl PollService for MockServices {
    async fn send_poll(&self, request: &PollRequest) -> Result<(), PollFailure> {
        self.record_call(CapturedCall::Poll(request.clone()));
        *self.poll.read()
    }
}

/// Transport that keeps every delivered message.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<RwLock<Vec<(ChatId, Outbound)>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(ChatId, Outbound)> {
        self.sent.read().clone()
    }

    /// Text bodies delivered to `chat`, in order.
    pub fn texts_for(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .read()
            .iter()
            .filter(|(to, _)| *to == chat)
            .filter_map(|(_, message)| message.as_text().map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.sent.write().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, chat: ChatId, message: &Outbound) -> Result<(), TransportError> {
        self.sent.write().push((chat, message.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockServices::new().set_exchange(Err(ExchangeFailure::CurrencyNotFound));
        let services = mock.services();

        let outcome = services.exchange.rate(5.0, "usd", "zzz").await;

        assert_eq!(outcome, Err(ExchangeFailure::CurrencyNotFound));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.get_calls()[0].method(), "exchange");
    }

    #[tokio::test]
    async fn test_recording_transport() {
        let transport = RecordingTransport::new();
        tokio_test::assert_ok!(transport.send(ChatId(1), &Outbound::text("a")).await);
        tokio_test::assert_ok!(transport.send(ChatId(2), &Outbound::text("b")).await);
        tokio_test::assert_ok!(transport.send(ChatId(1), &Outbound::image("u")).await);

        assert_eq!(transport.texts_for(ChatId(1)), vec!["a".to_string()]);
        assert_eq!(transport.sent().len(), 3);
    }
}
