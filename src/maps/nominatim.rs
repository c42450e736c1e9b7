//! OpenStreetMap Nominatim geocoding.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utilities::errors::MapsError;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Nominatim's usage policy requires an identifying agent.
pub const USER_AGENT: &str = "E-RickshawAssistant/1.0";

/// Best match for a free-text location query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lon: f64,
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub importance: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    endpoint: String,
}

impl NominatimClient {
    pub fn new() -> Result<Self, MapsError> {
        Self::with_endpoint(NOMINATIM_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, MapsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Geocode `query`. `Ok(None)` when nothing matches.
    pub async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>, MapsError> {
        log::info!("Geocoding '{}' via OpenStreetMap", query);
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("OpenStreetMap API error: {} {}", status, body);
            return Err(MapsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response.json().await?;
        let result = parse_geocode(&data);
        if result.is_none() {
            log::warn!("No geocoding results for '{}'", query);
        }
        Ok(result)
    }
}

/// First usable hit of a Nominatim `format=json` response.
///
/// Nominatim encodes coordinates as strings; entries whose coordinates do
/// not parse are skipped.
pub fn parse_geocode(data: &Value) -> Option<GeocodeResult> {
    let first = data.as_array()?.first()?;
    let coord = |key: &str| -> Option<f64> {
        match first.get(key)? {
            Value::String(s) => s.parse().ok(),
            v => v.as_f64(),
        }
    };
    Some(GeocodeResult {
        lat: coord("lat")?,
        lon: coord("lon")?,
        display_name: first
            .get("display_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        kind: first.get("type").and_then(Value::as_str).map(str::to_string),
        importance: first.get("importance").and_then(Value::as_f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_geocode_string_coordinates() {
        let data = json!([{
            "lat": "26.8467",
            "lon": "80.9462",
            "display_name": "Lucknow, Uttar Pradesh, India",
            "type": "city",
            "importance": 0.71
        }]);
        let r = parse_geocode(&data).unwrap();
        assert!((r.lat - 26.8467).abs() < 1e-9);
        assert!((r.lon - 80.9462).abs() < 1e-9);
        assert_eq!(r.kind.as_deref(), Some("city"));
        assert_eq!(r.importance, Some(0.71));
    }

    #[test]
    fn test_parse_geocode_empty_or_broken() {
        assert!(parse_geocode(&json!([])).is_none());
        assert!(parse_geocode(&json!({"error": "x"})).is_none());
        assert!(parse_geocode(&json!([{"lat": "north", "lon": "1"}])).is_none());
    }

    #[test]
    fn test_result_serializes_type_field() {
        let r = GeocodeResult {
            lat: 1.0,
            lon: 2.0,
            display_name: None,
            kind: Some("city".into()),
            importance: None,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["type"], "city");
    }
}
