//! Map handlers - POST /api/geocode, /api/places and /api/route.

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{GeocodeResult, PlaceResult, RouteSummary, TravelMode};
use crate::server::{ApiError, AppState};

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesRequest {
    #[serde(default)]
    pub query: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteRequest {
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    #[serde(default)]
    pub mode: TravelMode,
}

/// POST /api/geocode
pub async fn geocode_handler(
    State(state): State<AppState>,
    Json(request): Json<GeocodeRequest>,
) -> Result<Json<GeocodeResult>, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("No query provided"));
    }
    state
        .maps
        .geocoder
        .geocode(query)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No results found for '{}'", query)))
}

/// POST /api/places
pub async fn places_handler(
    State(state): State<AppState>,
    Json(request): Json<PlacesRequest>,
) -> Result<Json<Vec<PlaceResult>>, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("No query provided"));
    }
    let position = request.lat.zip(request.lon);
    let places = state.maps.tomtom.search(query, position).await?;
    if places.is_empty() {
        return Err(ApiError::not_found(format!("No places found for '{}'", query)));
    }
    Ok(Json(places))
}

/// POST /api/route
pub async fn route_handler(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RouteSummary>, ApiError> {
    state
        .maps
        .tomtom
        .route(
            (request.start_lat, request.start_lon),
            (request.end_lat, request.end_lon),
            request.mode,
        )
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No route found"))
}
