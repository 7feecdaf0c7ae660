//! OpenWeatherMap adapter.

use async_trait::async_trait;
use pocket_core::{WeatherFailure, WeatherReport, WeatherService};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::http::{fetch, RawResponse};

pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn current(&self, city: &str) -> Result<WeatherReport, WeatherFailure> {
        let request = self.client.get(&self.base_url).query(&[
            ("q", city),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ]);
        let Some(response) = fetch("weather", request).await else {
            return Err(WeatherFailure::UpstreamError);
        };
        let outcome = parse_weather(&response);
        if let Err(failure) = &outcome {
            warn!(city, status = response.status, %failure, "Weather lookup failed");
        }
        outcome
    }
}

#[derive(Deserialize)]
struct Payload {
    weather: Vec<Condition>,
    main: Main,
    wind: Wind,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

#[derive(Deserialize)]
struct Main {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct Wind {
    speed: f64,
}

/// Map an OpenWeatherMap response to an outcome.
///
/// The API repeats the status in a `cod` field, as a number on success and as
/// a string on errors; a 404 in either place means the city is unknown.
pub fn parse_weather(response: &RawResponse) -> Result<WeatherReport, WeatherFailure> {
    let cod = response.body.as_ref().and_then(|body| body.get("cod")).and_then(cod_value);
    if response.status == 404 || cod == Some(404) {
        return Err(WeatherFailure::LocationNotFound);
    }
    if !response.is_ok() {
        return Err(WeatherFailure::UpstreamError);
    }

    let body = response.body.clone().ok_or(WeatherFailure::UpstreamError)?;
    let payload: Payload = serde_json::from_value(body).map_err(|_| WeatherFailure::UpstreamError)?;
    let description = payload
        .weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .ok_or(WeatherFailure::UpstreamError)?;

    Ok(WeatherReport {
        description,
        temperature: payload.main.temp,
        feels_like: payload.main.feels_like,
        humidity: payload.main.humidity,
        wind_speed: payload.wind.speed,
    })
}

fn cod_value(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_body() -> Value {
        json!({
            "cod": 200,
            "name": "Berlin",
            "weather": [{"main": "Rain", "description": "light rain"}],
            "main": {"temp": 12.5, "feels_like": 11.0, "humidity": 80},
            "wind": {"speed": 3.6}
        })
    }

    #[test]
    fn test_parse_success() {
        let report = parse_weather(&RawResponse::new(200, ok_body())).unwrap();
        assert_eq!(report.description, "light rain");
        assert_eq!(report.temperature, 12.5);
        assert_eq!(report.humidity, 80.0);
        assert_eq!(report.wind_speed, 3.6);
    }

    #[test]
    fn test_city_not_found() {
        let body = json!({"cod": "404", "message": "city not found"});
        assert_eq!(
            parse_weather(&RawResponse::new(404, body.clone())),
            Err(WeatherFailure::LocationNotFound)
        );
        // Some proxies rewrite the status; the body still tells.
        assert_eq!(
            parse_weather(&RawResponse::new(200, body)),
            Err(WeatherFailure::LocationNotFound)
        );
    }

    #[test]
    fn test_other_errors_are_upstream() {
        let body = json!({"cod": 401, "message": "Invalid API key"});
        assert_eq!(
            parse_weather(&RawResponse::new(401, body)),
            Err(WeatherFailure::UpstreamError)
        );
        assert_eq!(
            parse_weather(&RawResponse { status: 200, body: None }),
            Err(WeatherFailure::UpstreamError)
        );
    }

    #[test]
    fn test_missing_field_is_upstream() {
        let mut body = ok_body();
        body["main"].as_object_mut().unwrap().remove("feels_like");
        assert_eq!(
            parse_weather(&RawResponse::new(200, body)),
            Err(WeatherFailure::UpstreamError)
        );
    }
}
