//! Adapters against a local HTTP responder.

use pocket_core::{
    ExchangeFailure, ExchangeService, ImageService, WeatherFailure, WeatherService,
};
use pocket_services::{HttpServices, ServicesConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve one canned response and hand back the raw request.
async fn respond_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/endpoint", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let mut request = Vec::new();
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
    });

    (url, rx)
}

fn config_for(url: &str) -> ServicesConfig {
    ServicesConfig::new("wkey", "ekey", "ikey")
        .weather_url(url)
        .exchange_url(url)
        .image_url(url)
        .timeout_secs(5)
}

#[tokio::test]
async fn test_weather_request_and_report() {
    let (url, request) = respond_once(
        "200 OK",
        r#"{"cod":200,"weather":[{"description":"overcast clouds"}],"main":{"temp":3.2,"feels_like":-1.0,"humidity":90},"wind":{"speed":5.1}}"#,
    )
    .await;
    let services = HttpServices::from_config(&config_for(&url)).unwrap();

    let report = services.weather.current("Oslo").await.unwrap();

    assert_eq!(report.description, "overcast clouds");
    assert_eq!(report.feels_like, -1.0);
    let request = request.await.unwrap();
    assert!(request.contains("q=Oslo"));
    assert!(request.contains("appid=wkey"));
    assert!(request.contains("units=metric"));
}

#[tokio::test]
async fn test_weather_unknown_city() {
    let (url, _request) =
        respond_once("404 Not Found", r#"{"cod":"404","message":"city not found"}"#).await;
    let services = HttpServices::from_config(&config_for(&url)).unwrap();

    assert_eq!(
        services.weather.current("Atlantis").await,
        Err(WeatherFailure::LocationNotFound)
    );
}

#[tokio::test]
async fn test_exchange_sends_apikey_header() {
    let (url, request) = respond_once("200 OK", r#"{"success":true,"info":{"rate":0.92},"result":92.0}"#).await;
    let services = HttpServices::from_config(&config_for(&url)).unwrap();

    let quote = services.exchange.rate(100.0, "USD", "EUR").await.unwrap();

    assert_eq!(quote.rate, 0.92);
    let request = request.await.unwrap().to_lowercase();
    assert!(request.contains("apikey: ekey"));
    assert!(request.contains("from=usd"));
    assert!(request.contains("to=eur"));
}

#[tokio::test]
async fn test_exchange_server_error_is_upstream() {
    let (url, _request) = respond_once("500 Internal Server Error", r#"{"message":"boom"}"#).await;
    let services = HttpServices::from_config(&config_for(&url)).unwrap();

    assert_eq!(
        services.exchange.rate(1.0, "USD", "EUR").await,
        Err(ExchangeFailure::UpstreamError)
    );
}

#[tokio::test]
async fn test_image_uses_client_id_authorization() {
    let (url, request) = respond_once(
        "200 OK",
        r#"{"urls":{"regular":"https://images.unsplash.com/photo-42"}}"#,
    )
    .await;
    let services = HttpServices::from_config(&config_for(&url)).unwrap();

    let image = services.image.random("animal").await.unwrap();

    assert_eq!(image.url, "https://images.unsplash.com/photo-42");
    let request = request.await.unwrap();
    assert!(request.to_lowercase().contains("authorization: client-id ikey"));
    assert!(request.contains("query=animal"));
    assert!(request.contains("orientation=portrait"));
}

#[tokio::test]
async fn test_unreachable_host_is_upstream() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/endpoint", listener.local_addr().unwrap());
    drop(listener);
    let services = HttpServices::from_config(&config_for(&url)).unwrap();

    assert_eq!(
        services.weather.current("Oslo").await,
        Err(WeatherFailure::UpstreamError)
    );
}
