//! Weather lookups for the `weather <location>` command.
//!
//! Two OpenWeatherMap flows are supported, chosen by [`WeatherBackend`]:
//!
//! - `Current`: one request to the 2.5 current-conditions endpoint by place name.
//! - `OneCall`: geocode the free text through Nominatim, then query One Call 3.0
//!   by coordinates.
//!
//! Both return a single sentence with temperature, description and a place label.
//! Failures are returned as errors for the caller to report; nothing is retried.
//! Requests are bounded by the configured timeout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::timeout;

use crate::config::{WeatherBackend, WeatherConfig};
use crate::logutil::escape_log;

/// Distinct locations kept in the cache at once.
const MAX_CACHE_ENTRIES: usize = 256;

/// OpenWeatherMap 2.5 response (fields we use)
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sys: Option<CurrentSys>,
    pub main: Option<CurrentMain>,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentSys {
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentMain {
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
}

/// One Call 3.0 response (fields we use)
#[derive(Debug, Deserialize)]
pub struct OneCallResponse {
    pub lat: f64,
    pub lon: f64,
    pub current: OneCallCurrent,
}

#[derive(Debug, Deserialize)]
pub struct OneCallCurrent {
    pub temp: f64,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

/// Nominatim search hit. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
pub struct GeocodeHit {
    pub lat: String,
    pub lon: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fetched_at: Instant,
    summary: String,
}

/// Weather client. Clones share the HTTP connection pool and the cache, so one
/// can be moved into each per-request task.
#[derive(Clone)]
pub struct WeatherService {
    config: WeatherConfig,
    client: reqwest::Client,
    cache: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl WeatherService {
    pub fn new(config: WeatherConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            config,
            client,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if the service has an API key
    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn cache_key(location: &str) -> String {
        location.trim().to_lowercase()
    }

    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache_ttl_minutes as u64 * 60)
    }

    fn cached(&self, location: &str) -> Option<String> {
        let ttl = self.cache_ttl();
        if ttl.is_zero() {
            return None;
        }
        let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache
            .get(&Self::cache_key(location))
            .filter(|entry| entry.fetched_at.elapsed() < ttl)
            .map(|entry| entry.summary.clone())
    }

    fn remember(&self, location: &str, summary: &str) {
        let ttl = self.cache_ttl();
        if ttl.is_zero() {
            return;
        }
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        let key = Self::cache_key(location);
        if cache.len() >= MAX_CACHE_ENTRIES && !cache.contains_key(&key) {
            let oldest = cache
                .iter()
                .min_by_key(|(_, entry)| entry.fetched_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                cache.remove(&oldest);
            }
        }
        cache.insert(
            key,
            CacheEntry {
                fetched_at: Instant::now(),
                summary: summary.to_string(),
            },
        );
    }

    /// Look up current conditions for free-text `location`.
    pub async fn lookup(&self, location: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(anyhow!("no OWM_API_KEY configured"));
        }
        if let Some(summary) = self.cached(location) {
            debug!("Returning cached weather for {}", escape_log(location));
            return Ok(summary);
        }
        debug!("Fetching weather for {} via {:?}", escape_log(location), self.config.backend);
        let summary = match self.config.backend {
            WeatherBackend::Current => {
                let response: CurrentResponse = self.get_json(&self.current_url(location)).await?;
                format_current(&response, location)?
            }
            WeatherBackend::OneCall => {
                let (lat, lon) = self
                    .geocode(location)
                    .await
                    .map_err(|e| anyhow!("failed to geocode '{}': {}", location, e))?;
                let response: OneCallResponse = self.get_json(&self.onecall_url(lat, lon)).await?;
                format_onecall(&response, location)?
            }
        };
        self.remember(location, &summary);
        debug!("Weather fetched successfully for {}", escape_log(location));
        Ok(summary)
    }

    async fn geocode(&self, location: &str) -> Result<(f64, f64)> {
        let hits: Vec<GeocodeHit> = self.get_json(&self.geocode_url(location)).await?;
        first_coordinates(&hits).ok_or_else(|| anyhow!("no geocoding results for '{}'", location))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let limit = Duration::from_secs(self.config.timeout_seconds as u64);
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| anyhow!("HTTP request failed: {}", e))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("API returned status {}: {}", status, body.trim()));
            }
            response
                .json::<T>()
                .await
                .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))
        };
        timeout(limit, request)
            .await
            .map_err(|_| anyhow!("Request timeout after {}s", self.config.timeout_seconds))?
    }

    /// 2.5 current-conditions URL for a place name.
    pub fn current_url(&self, location: &str) -> String {
        format!(
            "{}?q={}&units=imperial&appid={}",
            self.config.current_url,
            urlencoding::encode(location),
            self.config.api_key
        )
    }

    /// One Call 3.0 URL restricted to current conditions.
    pub fn onecall_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}?lat={:.6}&lon={:.6}&exclude=minutely,hourly,daily,alerts&units=imperial&appid={}",
            self.config.onecall_url, lat, lon, self.config.api_key
        )
    }

    /// Nominatim search URL for free text.
    pub fn geocode_url(&self, location: &str) -> String {
        format!("{}?q={}&format=json", self.config.geocode_url, urlencoding::encode(location))
    }
}

/// Coordinates of the first parseable geocoding hit.
pub fn first_coordinates(hits: &[GeocodeHit]) -> Option<(f64, f64)> {
    let hit = hits.first()?;
    let lat = hit.lat.trim().parse::<f64>().ok()?;
    let lon = hit.lon.trim().parse::<f64>().ok()?;
    Some((lat, lon))
}

pub fn format_current(response: &CurrentResponse, location: &str) -> Result<String> {
    if response.name.is_empty() && response.weather.is_empty() {
        return Err(anyhow!("no weather info found for '{}'", location));
    }
    let temp = response
        .main
        .as_ref()
        .map(|m| m.temp)
        .ok_or_else(|| anyhow!("no temperature in response for '{}'", location))?;
    let description = response
        .weather
        .first()
        .map(|w| w.description.as_str())
        .unwrap_or("unknown");
    let country = response.sys.as_ref().map(|s| s.country.as_str()).unwrap_or("");
    let place = if country.is_empty() {
        response.name.clone()
    } else {
        format!("{}, {}", response.name, country)
    };
    Ok(format!("It's {:.1}°F with {} in {}.", temp, description, place))
}

pub fn format_onecall(response: &OneCallResponse, location: &str) -> Result<String> {
    let description = response
        .current
        .weather
        .first()
        .map(|w| w.description.as_str())
        .ok_or_else(|| anyhow!("no weather data in response for '{}'", location))?;
    Ok(format!(
        "It's {:.1}°F with {} in {} ({:.4}, {:.4}).",
        response.current.temp, description, location, response.lat, response.lon
    ))
}
