// route/mod.rs - Driver route data model
// A route is the ordered stop list the optimizer last committed for one driver.

pub mod progress;
pub mod sequencer;

use serde::{Deserialize, Serialize};

pub use progress::RouteProgressTracker;
pub use sequencer::{MoveDirection, RouteSequencer};

pub type DriverId = i64;
pub type ParcelId = i64;

// ============================================================================
// TYPES
// ============================================================================

/// One parcel's planned visit within a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub parcel_id: ParcelId,
    pub tracking_no: String,
    #[serde(default)]
    pub address: String,
    /// 1-based position at the last server commit
    pub sequence: u32,
    /// Leg distance from the previous stop
    #[serde(default)]
    pub distance_km: Option<f64>,
    /// Leg duration from the previous stop
    #[serde(default)]
    pub duration_min: Option<f64>,
    #[serde(default)]
    pub google_maps_url: String,
    #[serde(default)]
    pub waze_url: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub driver_id: DriverId,
    #[serde(default)]
    pub total_distance_km: f64,
    #[serde(default)]
    pub total_duration_min: Option<f64>,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

impl Route {
    pub fn empty(driver_id: DriverId) -> Self {
        Self {
            driver_id,
            total_distance_km: 0.0,
            total_duration_min: None,
            stops: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Parcel ids in current local order, as sent on a reorder commit.
    pub fn parcel_ids(&self) -> Vec<ParcelId> {
        self.stops.iter().map(|s| s.parcel_id).collect()
    }

    /// True when sequence numbers are exactly 1..=len in list order.
    pub fn is_contiguous(&self) -> bool {
        self.stops
            .iter()
            .enumerate()
            .all(|(i, s)| s.sequence as usize == i + 1)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn stop(parcel_id: ParcelId, tracking_no: &str, sequence: u32) -> Stop {
        Stop {
            parcel_id,
            tracking_no: tracking_no.to_string(),
            address: format!("{} Rue de la Gare", parcel_id),
            sequence,
            distance_km: Some(1.5),
            duration_min: Some(2.6),
            google_maps_url: String::new(),
            waze_url: String::new(),
            latitude: None,
            longitude: None,
        }
    }

    /// Route with stops A, B, C at sequences 1..=3.
    pub fn abc_route(driver_id: DriverId) -> Route {
        Route {
            driver_id,
            total_distance_km: 4.5,
            total_duration_min: Some(7.8),
            stops: vec![stop(1, "A", 1), stop(2, "B", 2), stop(3, "C", 3)],
        }
    }
}
