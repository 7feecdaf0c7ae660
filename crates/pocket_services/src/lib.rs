//! # pocket_services - HTTP adapters for the Pocket assistant
//!
//! Implements the weather, exchange-rate and image traits of `pocket_core`
//! against OpenWeatherMap, apilayer and Unsplash. Each adapter makes a single
//! request, never retries and folds every failure into its tagged failure
//! kind. Poll delivery belongs to the messaging transport and lives with it.

pub mod config;
pub mod error;
pub mod exchange;
pub mod http;
pub mod image;
pub mod weather;

use std::sync::Arc;

use pocket_core::{PollService, Services};
use tracing::info;

pub use config::ServicesConfig;
pub use error::{ServiceError, ServiceResult};
pub use exchange::{parse_exchange, ExchangeRatesClient};
pub use http::RawResponse;
pub use image::{parse_image, UnsplashClient};
pub use weather::{parse_weather, OpenWeatherClient};

/// The three HTTP adapters sharing one connection pool.
#[derive(Clone)]
pub struct HttpServices {
    pub weather: Arc<OpenWeatherClient>,
    pub exchange: Arc<ExchangeRatesClient>,
    pub image: Arc<UnsplashClient>,
}

impl HttpServices {
    pub fn from_config(config: &ServicesConfig) -> ServiceResult<Self> {
        config.validate()?;
        let client = http::build_client(config)?;
        info!(
            weather = %config.weather_url,
            exchange = %config.exchange_url,
            image = %config.image_url,
            timeout_secs = config.timeout_secs,
            "HTTP adapters configured"
        );

        Ok(Self {
            weather: Arc::new(OpenWeatherClient::new(
                client.clone(),
                &config.weather_url,
                &config.weather_api_key,
            )),
            exchange: Arc::new(ExchangeRatesClient::new(
                client.clone(),
                &config.exchange_url,
                &config.exchange_api_key,
            )),
            image: Arc::new(UnsplashClient::new(
                client,
                &config.image_url,
                &config.image_api_key,
            )),
        })
    }

    /// Bundle with the transport's poll adapter.
    pub fn with_poll(self, poll: Arc<dyn PollService>) -> Services {
        Services::new(self.weather, self.exchange, self.image, poll)
    }
}
