//! End-to-end tests of the reqwest transport against a mock OpenWeather server.

use std::{io::Cursor, sync::Arc, time::Duration};

use citywx_core::{
    EngineSettings, FetchError, IconCache, IconLoader, ReqwestTransport, WeatherEngine,
    error::ERROR_PREFIX,
};
use image::{DynamicImage, ImageFormat, RgbaImage};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> Arc<ReqwestTransport> {
    Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap())
}

fn engine(base_url: &str) -> WeatherEngine {
    let settings = EngineSettings { api_key: "test_key".into(), base_url: base_url.into() };
    WeatherEngine::new(settings, transport())
}

fn png_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::new(100, 100))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn test_fetch_weather_by_city() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "São Paulo"))
        .and(query_param("appid", "test_key"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "main": { "temp": 75, "humidity": 40 },
            "weather": [ { "description": "light rain", "icon": "10d" } ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = engine(&mock_server.uri());
    let reading = engine.load_weather("São Paulo").await.unwrap();

    assert_eq!(reading.temperature, 75.0);
    assert_eq!(reading.humidity_percent, 40);
    assert_eq!(reading.conditions[0].description, "light rain");
}

#[tokio::test]
async fn test_reverse_geocode_then_weather() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/reverse"))
        .and(query_param("lat", "48.8566"))
        .and(query_param("lon", "2.3522"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "Paris", "country": "FR", "state": "" }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "main": { "temp": 61.3, "humidity": 72 },
            "weather": [ { "description": "broken clouds", "icon": "04d" } ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = engine(&mock_server.uri());
    engine.resolve_city_from_coordinates(48.8566, 2.3522).await.unwrap();

    let reading = engine.weather().get().unwrap();
    assert_eq!(reading.city, "Paris");
    assert_eq!(reading.temperature, 61.3);
    assert_eq!(engine.error().get(), None);
}

#[tokio::test]
async fn test_city_not_found_is_published_as_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
        )
        .mount(&mock_server)
        .await;

    let engine = engine(&mock_server.uri());
    engine.fetch_weather_by_city("Atlantis").await.unwrap();

    let msg = engine.error().get().unwrap();
    assert!(msg.starts_with(ERROR_PREFIX));
    assert!(msg.contains("city not found"));
    assert!(engine.weather().get().is_none());
}

#[tokio::test]
async fn test_empty_body_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let engine = engine(&mock_server.uri());
    let err = engine.load_weather("Oslo").await.unwrap_err();

    assert_eq!(err, FetchError::EmptyBody);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Reserve a port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let engine = engine(&format!("http://{addr}"));
    let err = engine.load_weather("Oslo").await.unwrap_err();

    assert!(matches!(err, FetchError::Network(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_icon_is_fetched_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/img/wn/10d@2x.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png_bytes(), "image/png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let loader = IconLoader::new(mock_server.uri(), transport(), IconCache::new());

    let first = loader.load("10d").await.unwrap();
    let second = loader.load("10d").await.unwrap();

    assert_eq!((first.width(), first.height()), (100, 100));
    assert!(Arc::ptr_eq(&first, &second));
}
