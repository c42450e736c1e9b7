//! Map lookups for location questions.
//!
//! - [`nominatim`] - free-text geocoding (no key required)
//! - [`tomtom`] - place search and routing (`TOMTOM_API_KEY`)
//! - [`handler`] - HTTP adapters

pub mod handler;
pub mod nominatim;
pub mod tomtom;

pub use nominatim::{GeocodeResult, NominatimClient};
pub use tomtom::{PlaceResult, RouteInstruction, RouteSummary, TomTomClient, TravelMode};

use crate::config::AssistantConfig;
use crate::utilities::errors::MapsError;

/// Both map backends behind one handle.
#[derive(Debug, Clone)]
pub struct MapsService {
    pub geocoder: NominatimClient,
    pub tomtom: TomTomClient,
}

impl MapsService {
    pub fn from_config(config: &AssistantConfig) -> Result<Self, MapsError> {
        Ok(Self {
            geocoder: NominatimClient::new()?,
            tomtom: TomTomClient::new(config.tomtom_api_key.clone())?,
        })
    }
}
