//! Vehicle/driver telemetry injected into every prompt.
//!
//! The snapshot is read-only input to the core. Until a telematics feed is
//! wired in, [`DashboardSnapshot::demo`] supplies the demo vehicle.

use serde::{Deserialize, Serialize};

/// A point of interest near the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub distance: String,
}

impl Place {
    pub fn new(name: impl Into<String>, distance: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            distance: distance.into(),
        }
    }
}

/// Nearby places, used only for location questions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlaces {
    #[serde(default)]
    pub schools: Vec<Place>,
    #[serde(default)]
    pub bus_stations: Vec<Place>,
    #[serde(default)]
    pub malls: Vec<Place>,
}

/// Dashboard fields. Any field may be missing; the prompt builder renders
/// absent values as a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    #[serde(default)]
    pub battery_percentage: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub last_service: Option<String>,
    #[serde(default)]
    pub next_service: Option<String>,
    #[serde(default)]
    pub driver_rating: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub nearby: NearbyPlaces,
}

impl DashboardSnapshot {
    /// The demo vehicle shown on the driver dashboard.
    pub fn demo() -> Self {
        Self {
            battery_percentage: Some("93".into()),
            vehicle_number: Some("UP32 BZ 5678".into()),
            last_service: Some("10 June 2024".into()),
            next_service: Some("10 December 2024".into()),
            driver_rating: Some("4.5".into()),
            location: Some("Lucknow, Uttar Pradesh".into()),
            nearby: NearbyPlaces {
                schools: vec![
                    Place::new("APS Academy", "1.1 km"),
                    Place::new("City Montessori School", "2.3 km"),
                ],
                bus_stations: vec![
                    Place::new("Central Bus Terminal", "0.7 km"),
                    Place::new("Charbagh Bus Station", "3.5 km"),
                ],
                malls: vec![
                    Place::new("City Center Mall", "1.5 km"),
                    Place::new("Phoenix Palassio", "4.2 km"),
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_deserializes() {
        let snap: DashboardSnapshot =
            serde_json::from_str(r#"{"battery_percentage": "40"}"#).unwrap();
        assert_eq!(snap.battery_percentage.as_deref(), Some("40"));
        assert!(snap.vehicle_number.is_none());
        assert!(snap.nearby.schools.is_empty());
    }

    #[test]
    fn test_demo_is_complete() {
        let demo = DashboardSnapshot::demo();
        assert_eq!(demo.vehicle_number.as_deref(), Some("UP32 BZ 5678"));
        assert_eq!(demo.nearby.bus_stations.len(), 2);
    }
}
