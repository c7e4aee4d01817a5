//! Weather lookup client with TTL-cached results.
//!
//! Uses the Open-Meteo geocoding and forecast APIs. Geocoding results
//! never go stale (a place does not move), so that cache has no TTL;
//! forecasts are cached for a configured duration to rate-limit
//! upstream calls. Both caches are owned by the client instance — no
//! process-global maps — and a miss always falls through to a live
//! request, so the cache can never be the source of a failure.

pub mod cache;

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use common::Error;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::TtlCache;

const GEOCODING_BASE: &str = "https://geocoding-api.open-meteo.com";
const FORECAST_BASE: &str = "https://api.open-meteo.com";

// ── Geocoding types ───────────────────────────────────────────────────

/// A resolved location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<GeoLocation>>,
}

// ── Forecast types ────────────────────────────────────────────────────

/// Raw hourly forecast response: parallel arrays per variable.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
pub struct HourlyBlock {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
}

/// One forecast hour with aligned variables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastHour {
    pub time: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub precipitation_mm: Option<f64>,
}

/// An hourly forecast for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyForecast {
    pub latitude: f64,
    pub longitude: f64,
    pub hours: Vec<ForecastHour>,
}

impl HourlyForecast {
    /// Align the response's parallel arrays into per-hour records.
    /// Hours with an unparseable timestamp are skipped.
    pub fn from_response(resp: ForecastResponse) -> Self {
        let hourly = resp.hourly;
        let mut hours = Vec::with_capacity(hourly.time.len());

        for (i, raw_time) in hourly.time.iter().enumerate() {
            let Some(time) = parse_hour(raw_time) else {
                debug!("skipping forecast hour with bad timestamp: {}", raw_time);
                continue;
            };
            hours.push(ForecastHour {
                time,
                temperature_c: hourly.temperature_2m.get(i).copied().flatten(),
                cloud_cover_pct: hourly.cloud_cover.get(i).copied().flatten(),
                wind_speed_kmh: hourly.wind_speed_10m.get(i).copied().flatten(),
                precipitation_mm: hourly.precipitation.get(i).copied().flatten(),
            });
        }

        Self {
            latitude: resp.latitude,
            longitude: resp.longitude,
            hours,
        }
    }
}

/// Open-Meteo emits minute-resolution ISO times without a zone suffix;
/// all values are UTC when requested with `timezone=UTC`.
fn parse_hour(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .ok()
        .map(|dt| dt.and_utc())
}

// ── Client ────────────────────────────────────────────────────────────

/// Weather lookup client with per-instance caches.
pub struct WeatherClient {
    client: reqwest::Client,
    geocoding_base: String,
    forecast_base: String,
    geocode_cache: TtlCache<String, GeoLocation>,
    forecast_cache: TtlCache<String, HourlyForecast>,
}

impl WeatherClient {
    /// * `forecast_ttl` — how long a fetched forecast stays fresh.
    pub fn new(forecast_ttl: Duration) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .timeout(Duration::from_secs(15))
            .build()
            .expect("failed to build weather HTTP client");

        Self {
            client,
            geocoding_base: GEOCODING_BASE.to_string(),
            forecast_base: FORECAST_BASE.to_string(),
            geocode_cache: TtlCache::new(None),
            forecast_cache: TtlCache::new(Some(forecast_ttl)),
        }
    }

    /// Resolve a free-text location query, keyed by the raw query.
    pub async fn geocode(&self, query: &str) -> Result<GeoLocation, Error> {
        let key = query.to_string();
        if let Some(hit) = self.geocode_cache.get(&key) {
            debug!("geocode cache hit for {:?}", query);
            return Ok(hit);
        }

        let url = format!("{}/v1/search", self.geocoding_base);
        let resp = self
            .client
            .get(&url)
            .query(&[("name", query), ("count", "1")])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let body: GeocodingResponse = resp
            .json()
            .await
            .map_err(|e| Error::Geocoding(e.to_string()))?;

        let location = body
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| Error::Geocoding(format!("no results for {:?}", query)))?;

        self.geocode_cache.insert(key, location.clone());
        Ok(location)
    }

    /// Fetch the hourly forecast, keyed by `"{lat},{lng},{hours}"`.
    pub async fn hourly_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        hours: u32,
    ) -> Result<HourlyForecast, Error> {
        let key = format!("{},{},{}", latitude, longitude, hours);
        if let Some(hit) = self.forecast_cache.get(&key) {
            debug!("forecast cache hit for {}", key);
            return Ok(hit);
        }

        let url = format!("{}/v1/forecast", self.forecast_base);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                (
                    "hourly",
                    "temperature_2m,cloud_cover,wind_speed_10m,precipitation".to_string(),
                ),
                ("forecast_hours", hours.to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let body: ForecastResponse = resp
            .json()
            .await
            .map_err(|e| Error::Forecast(e.to_string()))?;

        let forecast = HourlyForecast::from_response(body);
        self.forecast_cache.insert(key, forecast.clone());
        Ok(forecast)
    }

    /// Geocode a query, then fetch its forecast.
    pub async fn forecast_for(
        &self,
        query: &str,
        hours: u32,
    ) -> Result<(GeoLocation, HourlyForecast), Error> {
        let location = self.geocode(query).await?;
        let forecast = self
            .hourly_forecast(location.latitude, location.longitude, hours)
            .await?;
        Ok((location, forecast))
    }

    pub fn cached_forecasts(&self) -> usize {
        self.forecast_cache.len()
    }

    pub fn cached_locations(&self) -> usize {
        self.geocode_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_forecast() -> &'static str {
        r#"{
            "latitude": 52.52,
            "longitude": 13.41,
            "hourly": {
                "time": ["2026-02-13T10:00", "2026-02-13T11:00", "garbage"],
                "temperature_2m": [3.1, 3.8, 4.0],
                "cloud_cover": [90, null, 75],
                "wind_speed_10m": [12.2, 14.0, 13.5],
                "precipitation": [0.0, 0.2, 0.0]
            }
        }"#
    }

    #[test]
    fn test_deserialize_geocoding_response() {
        let raw = r#"{"results": [{"name": "Berlin", "latitude": 52.52, "longitude": 13.41, "country": "Germany", "timezone": "Europe/Berlin"}]}"#;
        let parsed: GeocodingResponse = serde_json::from_str(raw).expect("should deserialize");
        let results = parsed.results.expect("results present");
        assert_eq!(results[0].name, "Berlin");
        assert_eq!(results[0].latitude, 52.52);
    }

    #[test]
    fn test_deserialize_empty_geocoding_response() {
        let parsed: GeocodingResponse = serde_json::from_str("{}").expect("should deserialize");
        assert!(parsed.results.is_none());
    }

    #[test]
    fn test_forecast_alignment() {
        let parsed: ForecastResponse =
            serde_json::from_str(sample_forecast()).expect("should deserialize");
        let forecast = HourlyForecast::from_response(parsed);

        // The "garbage" hour is skipped, the rest stay aligned.
        assert_eq!(forecast.hours.len(), 2);
        let first = &forecast.hours[0];
        assert_eq!(
            first.time,
            Utc.with_ymd_and_hms(2026, 2, 13, 10, 0, 0).unwrap()
        );
        assert_eq!(first.temperature_c, Some(3.1));
        assert_eq!(first.cloud_cover_pct, Some(90.0));
        assert_eq!(forecast.hours[1].cloud_cover_pct, None);
        assert_eq!(forecast.hours[1].precipitation_mm, Some(0.2));
    }

    #[test]
    fn test_parse_hour() {
        assert!(parse_hour("2026-02-13T10:00").is_some());
        assert!(parse_hour("2026-02-13").is_none());
    }
}
