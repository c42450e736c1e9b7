//! TomTom place search and routing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::utilities::errors::MapsError;

const TOMTOM_BASE_URL: &str = "https://api.tomtom.com";
const SEARCH_LIMIT: u32 = 10;
const LANGUAGE: &str = "en-US";

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    pub name: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Metres from the search position, when one was given.
    pub distance: Option<f64>,
}

/// One turn instruction along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInstruction {
    pub instruction: Option<String>,
    pub distance_meters: Option<f64>,
    pub travel_time_seconds: Option<f64>,
}

/// Summary of the best route between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_meters: Option<f64>,
    pub travel_time_seconds: Option<f64>,
    pub traffic_delay_seconds: f64,
    pub instructions: Vec<RouteInstruction>,
}

/// Travel mode accepted by the routing API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Car,
    Pedestrian,
    Bicycle,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Car => "car",
            TravelMode::Pedestrian => "pedestrian",
            TravelMode::Bicycle => "bicycle",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TomTomClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl TomTomClient {
    pub fn new(api_key: Option<String>) -> Result<Self, MapsError> {
        Self::with_base_url(api_key, TOMTOM_BASE_URL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, MapsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Whether a key is configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> Result<&str, MapsError> {
        self.api_key.as_deref().ok_or(MapsError::MissingApiKey)
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, MapsError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| MapsError::InvalidBaseUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| MapsError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn search_url(&self, query: &str) -> Result<Url, MapsError> {
        self.endpoint(&["search", "2", "search", &format!("{}.json", query)])
    }

    fn route_url(&self, start: (f64, f64), end: (f64, f64)) -> Result<Url, MapsError> {
        let points = format!("{},{}:{},{}", start.0, start.1, end.0, end.1);
        self.endpoint(&["routing", "1", "calculateRoute", &points, "json"])
    }

    async fn get_json(&self, url: Url, params: &[(&str, String)]) -> Result<Value, MapsError> {
        let response = self.http.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("TomTom API error: {} {}", status, body);
            return Err(MapsError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Search places by free text, optionally biased towards a position.
    pub async fn search(
        &self,
        query: &str,
        position: Option<(f64, f64)>,
    ) -> Result<Vec<PlaceResult>, MapsError> {
        let mut params = vec![
            ("key", self.key()?.to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
            ("language", LANGUAGE.to_string()),
        ];
        if let Some((lat, lon)) = position {
            params.push(("lat", lat.to_string()));
            params.push(("lon", lon.to_string()));
        }

        log::info!("Searching TomTom for '{}'", query);
        let data = self.get_json(self.search_url(query)?, &params).await?;
        let places = parse_search(&data);
        log::debug!("TomTom search returned {} result(s)", places.len());
        Ok(places)
    }

    /// Best route between two points. `Ok(None)` when no route exists.
    pub async fn route(
        &self,
        start: (f64, f64),
        end: (f64, f64),
        mode: TravelMode,
    ) -> Result<Option<RouteSummary>, MapsError> {
        let params = [
            ("key", self.key()?.to_string()),
            ("travelMode", mode.as_str().to_string()),
            ("traffic", "true".to_string()),
            ("instructionsType", "text".to_string()),
            ("language", LANGUAGE.to_string()),
        ];
        let url = self.route_url(start, end)?;

        log::info!("Routing {:?} -> {:?} ({})", start, end, mode.as_str());
        let data = self.get_json(url, &params).await?;
        Ok(parse_route(&data))
    }
}

fn str_at(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

fn f64_at(v: &Value, key: &str) -> Option<f64> {
    v.get(key).and_then(Value::as_f64)
}

/// Flatten a search response into [`PlaceResult`]s.
pub fn parse_search(data: &Value) -> Vec<PlaceResult> {
    let Some(results) = data.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };
    results
        .iter()
        .map(|r| {
            let poi = r.get("poi").unwrap_or(&Value::Null);
            let position = r.get("position").unwrap_or(&Value::Null);
            PlaceResult {
                name: str_at(poi, "name"),
                category: poi
                    .get("categorySet")
                    .and_then(Value::as_array)
                    .and_then(|c| c.first())
                    .and_then(|c| str_at(c, "name"))
                    .or_else(|| {
                        poi.get("categories")
                            .and_then(Value::as_array)
                            .and_then(|c| c.first())
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    }),
                address: r
                    .get("address")
                    .and_then(|a| str_at(a, "freeformAddress")),
                lat: f64_at(position, "lat"),
                lon: f64_at(position, "lon"),
                distance: f64_at(r, "dist"),
            }
        })
        .collect()
}

/// Summarize the first route of a `calculateRoute` response.
///
/// Turn instructions are read from `guidance.instructions`, falling back to
/// per-leg instruction lists.
pub fn parse_route(data: &Value) -> Option<RouteSummary> {
    let route = data.get("routes")?.as_array()?.first()?;
    let summary = route.get("summary").unwrap_or(&Value::Null);

    let guidance = route
        .get("guidance")
        .and_then(|g| g.get("instructions"))
        .and_then(Value::as_array)
        .cloned();
    let raw = guidance.unwrap_or_else(|| {
        route
            .get("legs")
            .and_then(Value::as_array)
            .map(|legs| {
                legs.iter()
                    .filter_map(|l| l.get("instructions").and_then(Value::as_array))
                    .flatten()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    });

    Some(RouteSummary {
        distance_meters: f64_at(summary, "lengthInMeters"),
        travel_time_seconds: f64_at(summary, "travelTimeInSeconds"),
        traffic_delay_seconds: f64_at(summary, "trafficDelayInSeconds").unwrap_or(0.0),
        instructions: raw
            .iter()
            .map(|i| RouteInstruction {
                instruction: str_at(i, "message"),
                distance_meters: f64_at(i, "routeOffsetInMeters"),
                travel_time_seconds: f64_at(i, "travelTimeInSeconds"),
            })
            .collect(),
    })
}
