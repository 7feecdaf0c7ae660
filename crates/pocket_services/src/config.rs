//! Configuration for the HTTP adapters.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_EXCHANGE_URL: &str = "https://api.apilayer.com/exchangerates_data/convert";
pub const DEFAULT_IMAGE_URL: &str = "https://api.unsplash.com/photos/random";

/// API keys and endpoints of the remote services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub weather_api_key: String,
    pub exchange_api_key: String,
    pub image_api_key: String,
    pub weather_url: String,
    pub exchange_url: String,
    pub image_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ServicesConfig {
    /// Configuration for the public endpoints.
    pub fn new(
        weather_api_key: impl Into<String>,
        exchange_api_key: impl Into<String>,
        image_api_key: impl Into<String>,
    ) -> Self {
        Self {
            weather_api_key: weather_api_key.into(),
            exchange_api_key: exchange_api_key.into(),
            image_api_key: image_api_key.into(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            exchange_url: DEFAULT_EXCHANGE_URL.to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            timeout_secs: 30,
        }
    }

    pub fn weather_url(mut self, url: impl Into<String>) -> Self {
        self.weather_url = url.into();
        self
    }

    pub fn exchange_url(mut self, url: impl Into<String>) -> Self {
        self.exchange_url = url.into();
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Every key present and every URL absolute.
    pub fn validate(&self) -> ServiceResult<()> {
        let keys = [
            ("WEATHER_API_KEY", &self.weather_api_key),
            ("EXCHANGE_API_KEY", &self.exchange_api_key),
            ("ANIMALS_API_KEY", &self.image_api_key),
        ];
        for (name, value) in keys {
            if value.trim().is_empty() {
                return Err(ServiceError::NotConfigured(name));
            }
        }

        let urls = [
            ("weather", &self.weather_url),
            ("exchange", &self.exchange_url),
            ("image", &self.image_url),
        ];
        for (service, url) in urls {
            if reqwest::Url::parse(url).is_err() {
                return Err(ServiceError::InvalidUrl {
                    service,
                    url: url.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_public_apis() {
        let config = ServicesConfig::new("w", "e", "i");
        assert_eq!(config.weather_url, DEFAULT_WEATHER_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_key_is_reported() {
        let err = ServicesConfig::new("w", " ", "i").validate().unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured("EXCHANGE_API_KEY")));
    }

    #[test]
    fn test_relative_url_is_rejected() {
        let err = ServicesConfig::new("w", "e", "i")
            .image_url("photos/random")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidUrl { service: "image", .. }));
    }
}
