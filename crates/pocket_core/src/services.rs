//! Service adapter contracts.
//!
//! Every remote capability sits behind a small async trait returning a tagged
//! outcome: `Ok(payload)` or `Err(kind)` where `kind` enumerates the failures
//! the caller has to tell apart. Adapters never retry and never let transport
//! or decoding errors escape in any other form.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Current conditions for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub description: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Degrees Celsius.
    pub feels_like: f64,
    /// Percent.
    pub humidity: f64,
    /// Metres per second.
    pub wind_speed: f64,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherFailure {
    #[error("location not found")]
    LocationNotFound,
    #[error("weather service unavailable")]
    UpstreamError,
}

/// Exchange rate between two currencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeQuote {
    /// Units of the target currency per unit of the source currency.
    pub rate: f64,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeFailure {
    #[error("exchange service unavailable")]
    UpstreamError,
    #[error("currency not found")]
    CurrencyNotFound,
}

/// Reference to a remotely hosted image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFailure {
    #[error("image service unavailable")]
    UpstreamError,
}

/// A poll to post into a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRequest {
    /// Target chat as typed by the user (numeric id or `@channel` name).
    pub chat: String,
    pub question: String,
    /// Answer options in the order given.
    pub options: Vec<String>,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFailure {
    #[error("chat not found")]
    ChatNotFound,
    #[error("too few options")]
    TooFewOptions,
    #[error("too many options")]
    TooManyOptions,
    #[error("empty option text")]
    EmptyOptionText,
    #[error("poll service unavailable")]
    UpstreamError,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Current weather for a city name.
    async fn current(&self, city: &str) -> Result<WeatherReport, WeatherFailure>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeService: Send + Sync {
    /// Rate for converting `amount` of `from` into `to`.
    async fn rate(&self, amount: f64, from: &str, to: &str)
        -> Result<ExchangeQuote, ExchangeFailure>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageService: Send + Sync {
    /// A random image matching a query tag.
    async fn random(&self, query: &str) -> Result<ImageRef, ImageFailure>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PollService: Send + Sync {
    /// Post a poll. Limits on the option count are enforced by the platform.
    async fn send_poll(&self, request: &PollRequest) -> Result<(), PollFailure>;
}

/// A side-effect requested by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Weather { city: String },
    Convert { amount: f64, from: String, to: String },
    RandomImage { query: String },
    Poll(PollRequest),
}

impl Effect {
    /// Short capability name used in logs.
    pub fn capability(&self) -> &'static str {
        match self {
            Self::Weather { .. } => "weather",
            Self::Convert { .. } => "exchange",
            Self::RandomImage { .. } => "image",
            Self::Poll(_) => "poll",
        }
    }
}

/// Result of performing an [`Effect`].
#[derive(Debug, Clone, PartialEq)]
pub enum EffectOutcome {
    Weather(Result<WeatherReport, WeatherFailure>),
    Convert(Result<ExchangeQuote, ExchangeFailure>),
    RandomImage(Result<ImageRef, ImageFailure>),
    Poll(Result<(), PollFailure>),
}

impl EffectOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Weather(r) => r.is_ok(),
            Self::Convert(r) => r.is_ok(),
            Self::RandomImage(r) => r.is_ok(),
            Self::Poll(r) => r.is_ok(),
        }
    }
}

/// The set of adapters the assistant calls out to.
#[derive(Clone)]
pub struct Services {
    pub weather: Arc<dyn WeatherService>,
    pub exchange: Arc<dyn ExchangeService>,
    pub image: Arc<dyn ImageService>,
    pub poll: Arc<dyn PollService>,
}

impl Services {
    pub fn new(
        weather: Arc<dyn WeatherService>,
        exchange: Arc<dyn ExchangeService>,
        image: Arc<dyn ImageService>,
        poll: Arc<dyn PollService>,
    ) -> Self {
        Self {
            weather,
            exchange,
            image,
            poll,
        }
    }

    /// Perform one effect through the matching adapter.
    pub async fn perform(&self, effect: &Effect) -> EffectOutcome {
        debug!(capability = effect.capability(), "Calling service adapter");
        let outcome = match effect {
            Effect::Weather { city } => EffectOutcome::Weather(self.weather.current(city).await),
            Effect::Convert { amount, from, to } => {
                EffectOutcome::Convert(self.exchange.rate(*amount, from, to).await)
            }
            Effect::RandomImage { query } => {
                EffectOutcome::RandomImage(self.image.random(query).await)
            }
            Effect::Poll(request) => EffectOutcome::Poll(self.poll.send_poll(request).await),
        };
        if !outcome.is_success() {
            warn!(capability = effect.capability(), ?outcome, "Service adapter reported failure");
        }
        outcome
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn services(
        weather: MockWeatherService,
        exchange: MockExchangeService,
        image: MockImageService,
        poll: MockPollService,
    ) -> Services {
        Services::new(
            Arc::new(weather),
            Arc::new(exchange),
            Arc::new(image),
            Arc::new(poll),
        )
    }

    #[tokio::test]
    async fn test_perform_dispatches_to_exchange() {
        let mut exchange = MockExchangeService::new();
        exchange
            .expect_rate()
            .with(eq(100.0), eq("usd"), eq("eur"))
            .times(1)
            .returning(|_, _, _| Ok(ExchangeQuote { rate: 0.92 }));

        let services = services(
            MockWeatherService::new(),
            exchange,
            MockImageService::new(),
            MockPollService::new(),
        );
        let outcome = services
            .perform(&Effect::Convert {
                amount: 100.0,
                from: "usd".into(),
                to: "eur".into(),
            })
            .await;

        assert_eq!(outcome, EffectOutcome::Convert(Ok(ExchangeQuote { rate: 0.92 })));
    }

    #[tokio::test]
    async fn test_perform_passes_failure_through() {
        let mut poll = MockPollService::new();
        poll.expect_send_poll()
            .times(1)
            .returning(|_| Err(PollFailure::TooManyOptions));

        let services = services(
            MockWeatherService::new(),
            MockExchangeService::new(),
            MockImageService::new(),
            poll,
        );
        let outcome = services
            .perform(&Effect::Poll(PollRequest {
                chat: "1".into(),
                question: "q".into(),
                options: vec!["a".into()],
            }))
            .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome, EffectOutcome::Poll(Err(PollFailure::TooManyOptions)));
    }

    #[test]
    fn test_effect_capability_names() {
        assert_eq!(
            Effect::RandomImage {
                query: "animal".into()
            }
            .capability(),
            "image"
        );
    }
}
