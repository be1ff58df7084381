//! Integration tests for the weather service
#![cfg(feature = "weather")]

use shalebot::bot::weather::{
    first_coordinates, format_current, format_onecall, CurrentResponse, GeocodeHit, OneCallResponse, WeatherService,
};
use shalebot::config::{WeatherBackend, WeatherConfig};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn local_service(addr: std::net::SocketAddr) -> WeatherService {
    WeatherService::new(WeatherConfig {
        api_key: "k".to_string(),
        backend: WeatherBackend::Current,
        timeout_seconds: 1,
        cache_ttl_minutes: 0,
        current_url: format!("http://{}/weather", addr),
        ..WeatherConfig::default()
    })
}

#[tokio::test]
async fn test_weather_service_no_api_key() {
    for backend in [WeatherBackend::Current, WeatherBackend::OneCall] {
        let config = WeatherConfig {
            api_key: String::new(),
            backend,
            ..WeatherConfig::default()
        };
        let service = WeatherService::new(config);
        assert!(!service.is_configured());
        let err = service.lookup("Los Angeles").await.unwrap_err();
        assert_eq!(err.to_string(), "no OWM_API_KEY configured");
    }
}

#[test]
fn current_conditions_payload() {
    let body = r#"{
        "coord": {"lon": -118.24, "lat": 34.05},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "main": {"temp": 68.04, "feels_like": 66.9, "humidity": 40},
        "sys": {"country": "US"},
        "name": "Los Angeles"
    }"#;
    let response: CurrentResponse = serde_json::from_str(body).unwrap();
    assert_eq!(
        format_current(&response, "los angeles").unwrap(),
        "It's 68.0°F with clear sky in Los Angeles, US."
    );
}

#[test]
fn current_conditions_without_country() {
    let body = r#"{"weather":[{"description":"mist"}],"main":{"temp":50},"name":"Atlantis"}"#;
    let response: CurrentResponse = serde_json::from_str(body).unwrap();
    assert_eq!(
        format_current(&response, "atlantis").unwrap(),
        "It's 50.0°F with mist in Atlantis."
    );
}

#[test]
fn onecall_payload_and_geocode() {
    let hits: Vec<GeocodeHit> = serde_json::from_str(
        r#"[{"place_id": 1, "lat": "47.6038321", "lon": "-122.330062", "display_name": "Seattle"}]"#,
    )
    .unwrap();
    let (lat, lon) = first_coordinates(&hits).unwrap();
    assert!((lat - 47.6038321).abs() < 1e-9);

    let body = format!(
        r#"{{"lat": {lat}, "lon": {lon}, "timezone": "America/Los_Angeles",
            "current": {{"temp": 55.4, "weather": [{{"description": "overcast clouds"}}]}}}}"#
    );
    let response: OneCallResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(
        format_onecall(&response, "Seattle").unwrap(),
        "It's 55.4°F with overcast clouds in Seattle (47.6038, -122.3301)."
    );
}

#[test]
fn unparseable_geocode_hit_is_no_result() {
    let hits: Vec<GeocodeHit> = serde_json::from_str(r#"[{"lat": "north", "lon": "1"}]"#).unwrap();
    assert_eq!(first_coordinates(&hits), None);
    let service = WeatherService::new(WeatherConfig::default());
    assert!(service.geocode_url("São Paulo").contains("q=S%C3%A3o%20Paulo"));
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(socket);
    });

    let err = local_service(addr).lookup("Denver").await.unwrap_err();
    assert_eq!(err.to_string(), "Request timeout after 1s");
    server.abort();
}

#[tokio::test]
async fn error_status_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let body = "city not found";
        let response = format!(
            "HTTP/1.1 404 Not Found\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    let err = local_service(addr).lookup("Nowhere").await.unwrap_err();
    assert!(err.to_string().contains("API returned status 404"), "{err}");
    assert!(err.to_string().contains("city not found"));

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /weather?q=Nowhere&units=imperial&appid=k "));
}
