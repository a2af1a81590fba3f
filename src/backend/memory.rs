//! In-process dispatch backend
//!
//! Keeps drivers and parcels in memory and answers every backend call the
//! way the dispatch API does: routes follow the stored sequence with
//! great-circle leg distances from the depot, reorders must be an exact
//! permutation, scans flip a parcel to sorted. Failures and latency can be
//! injected per driver or per call.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{DispatchBackend, RejectionKind, ScanOutcome, SorterStats, UndoOutcome};
use crate::error::BackendError;
use crate::route::{DriverId, ParcelId, Route, Stop};

/// Average speed used for leg ETAs
pub const AVERAGE_SPEED_KMH: f64 = 35.0;

/// Casablanca city centre
pub const DEFAULT_DEPOT: (f64, f64) = (33.5731, -7.5898);

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone)]
struct ParcelRecord {
    id: ParcelId,
    tracking_no: String,
    address: String,
    coords: Option<(f64, f64)>,
    driver_id: Option<DriverId>,
    sequence: Option<u32>,
    sorted: bool,
}

impl ParcelRecord {
    /// Assigned to `driver_id` and geocoded, so it can appear on a route
    fn is_routable_for(&self, driver_id: DriverId) -> bool {
        self.driver_id == Some(driver_id) && self.coords.is_some()
    }
}

#[derive(Default)]
struct MemoryState {
    drivers: BTreeMap<DriverId, String>,
    parcels: Vec<ParcelRecord>,
    route_failures: HashMap<DriverId, String>,
    latency: HashMap<DriverId, Duration>,
    next_commit_failure: Option<String>,
    next_scan_failure: Option<BackendError>,
    next_undo_failure: Option<BackendError>,
    scanned_today: u32,
    last_scan_time: Option<DateTime<Utc>>,
}

pub struct InMemoryBackend {
    depot: (f64, f64),
    state: RwLock<MemoryState>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_depot(DEFAULT_DEPOT)
    }

    pub fn with_depot(depot: (f64, f64)) -> Self {
        Self {
            depot,
            state: RwLock::new(MemoryState::default()),
        }
    }

    pub async fn add_driver(&self, driver_id: DriverId, name: &str) {
        let mut state = self.state.write().await;
        state.drivers.insert(driver_id, name.to_string());
    }

    /// Assign a parcel to a driver, appended after the driver's existing stops.
    pub async fn add_parcel(
        &self,
        driver_id: DriverId,
        parcel_id: ParcelId,
        tracking_no: &str,
        address: &str,
        coords: Option<(f64, f64)>,
    ) {
        let mut state = self.state.write().await;
        state.parcels.push(ParcelRecord {
            id: parcel_id,
            tracking_no: tracking_no.to_string(),
            address: address.to_string(),
            coords,
            driver_id: Some(driver_id),
            sequence: None,
            sorted: false,
        });
    }

    pub async fn add_unassigned_parcel(&self, parcel_id: ParcelId, tracking_no: &str) {
        let mut state = self.state.write().await;
        state.parcels.push(ParcelRecord {
            id: parcel_id,
            tracking_no: tracking_no.to_string(),
            address: String::new(),
            coords: None,
            driver_id: None,
            sequence: None,
            sorted: false,
        });
    }

    /// Make every route fetch for `driver_id` fail with a transport error.
    pub async fn fail_route_for(&self, driver_id: DriverId, message: &str) {
        let mut state = self.state.write().await;
        state.route_failures.insert(driver_id, message.to_string());
    }

    /// Delay every route fetch for `driver_id`.
    pub async fn set_latency(&self, driver_id: DriverId, latency: Duration) {
        let mut state = self.state.write().await;
        state.latency.insert(driver_id, latency);
    }

    pub async fn fail_next_commit(&self, message: &str) {
        self.state.write().await.next_commit_failure = Some(message.to_string());
    }

    pub async fn fail_next_scan(&self, message: &str) {
        self.state.write().await.next_scan_failure = Some(BackendError::transport(message));
    }

    /// Answer the next scan with an HTTP-level rejection instead of an outcome.
    pub async fn reject_next_scan(&self, message: &str) {
        self.state.write().await.next_scan_failure = Some(BackendError::rejected(message));
    }

    pub async fn fail_next_undo(&self, message: &str) {
        self.state.write().await.next_undo_failure = Some(BackendError::transport(message));
    }

    pub async fn reject_next_undo(&self, message: &str) {
        self.state.write().await.next_undo_failure = Some(BackendError::rejected(message));
    }

    pub async fn set_scanned_today(&self, count: u32) {
        self.state.write().await.scanned_today = count;
    }

    pub async fn is_sorted(&self, tracking_no: &str) -> bool {
        let state = self.state.read().await;
        state
            .parcels
            .iter()
            .any(|p| p.tracking_no == tracking_no && p.sorted)
    }

    /// Route in stored sequence order; unsequenced parcels follow by id.
    /// Sequence numbers are rewritten to 1..=n.
    fn build_route(&self, state: &mut MemoryState, driver_id: DriverId) -> Route {
        let mut legs: Vec<(usize, (f64, f64))> = state
            .parcels
            .iter()
            .enumerate()
            .filter(|(_, p)| p.driver_id == Some(driver_id))
            .filter_map(|(i, p)| p.coords.map(|coords| (i, coords)))
            .collect();
        legs.sort_by_key(|&(i, _)| {
            let p = &state.parcels[i];
            (p.sequence.unwrap_or(u32::MAX), p.id)
        });

        let mut total_distance = 0.0;
        let mut total_duration = 0.0;
        let mut previous = self.depot;
        let mut stops = Vec::with_capacity(legs.len());

        for (position, &(i, coords)) in legs.iter().enumerate() {
            let parcel = &mut state.parcels[i];
            let sequence = position as u32 + 1;
            parcel.sequence = Some(sequence);

            let distance = haversine_km(previous, coords);
            let duration = distance / AVERAGE_SPEED_KMH * 60.0;
            total_distance += distance;
            total_duration += duration;
            previous = coords;

            stops.push(Stop {
                parcel_id: parcel.id,
                tracking_no: parcel.tracking_no.clone(),
                address: parcel.address.clone(),
                sequence,
                distance_km: Some(round_to(distance, 2)),
                duration_min: Some(round_to(duration, 1)),
                google_maps_url: format!(
                    "https://www.google.com/maps/dir/?api=1&destination={},{}",
                    coords.0, coords.1
                ),
                waze_url: format!("https://waze.com/ul?ll={},{}&navigate=yes", coords.0, coords.1),
                latitude: Some(coords.0),
                longitude: Some(coords.1),
            });
        }

        Route {
            driver_id,
            total_distance_km: round_to(total_distance, 2),
            total_duration_min: if total_duration > 0.0 {
                Some(round_to(total_duration, 1))
            } else {
                None
            },
            stops,
        }
    }
}

#[async_trait]
impl DispatchBackend for InMemoryBackend {
    async fn fetch_route(&self, driver_id: DriverId) -> Result<Route, BackendError> {
        let latency = self.state.read().await.latency.get(&driver_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().await;
        if let Some(message) = state.route_failures.get(&driver_id) {
            return Err(BackendError::transport(message.clone()));
        }
        if !state.drivers.contains_key(&driver_id) {
            return Err(BackendError::rejected("Driver not found"));
        }
        Ok(self.build_route(&mut state, driver_id))
    }

    async fn commit_reorder(
        &self,
        driver_id: DriverId,
        ordered_parcel_ids: &[ParcelId],
    ) -> Result<Route, BackendError> {
        let mut state = self.state.write().await;
        if let Some(message) = state.next_commit_failure.take() {
            return Err(BackendError::transport(message));
        }
        if !state.drivers.contains_key(&driver_id) {
            return Err(BackendError::rejected("Driver not found"));
        }

        let assigned: HashSet<ParcelId> = state
            .parcels
            .iter()
            .filter(|p| p.is_routable_for(driver_id))
            .map(|p| p.id)
            .collect();
        let requested: HashSet<ParcelId> = ordered_parcel_ids.iter().copied().collect();
        if requested != assigned || requested.len() != ordered_parcel_ids.len() {
            return Err(BackendError::rejected(
                "Parcel list does not match the driver's assigned parcels",
            ));
        }

        for (position, parcel_id) in ordered_parcel_ids.iter().enumerate() {
            if let Some(parcel) = state
                .parcels
                .iter_mut()
                .find(|p| p.id == *parcel_id && p.driver_id == Some(driver_id))
            {
                parcel.sequence = Some(position as u32 + 1);
            }
        }

        Ok(self.build_route(&mut state, driver_id))
    }

    async fn scan_tracking_number(&self, tracking_no: &str) -> Result<ScanOutcome, BackendError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.next_scan_failure.take() {
            return Err(err);
        }

        let tracking_no = tracking_no.trim();
        let index = match state.parcels.iter().position(|p| p.tracking_no == tracking_no) {
            Some(i) => i,
            None => {
                return Ok(ScanOutcome::Rejected {
                    kind: RejectionKind::NotFound,
                    message: "Parcel not found".to_string(),
                })
            }
        };

        let parcel = &state.parcels[index];
        if parcel.sorted {
            return Ok(ScanOutcome::Rejected {
                kind: RejectionKind::AlreadySorted,
                message: "Parcel already sorted".to_string(),
            });
        }
        let driver_id = match parcel.driver_id {
            Some(id) => id,
            None => {
                return Ok(ScanOutcome::Rejected {
                    kind: RejectionKind::NotFound,
                    message: "Parcel not assigned to a driver".to_string(),
                })
            }
        };

        let driver_name = state.drivers.get(&driver_id).cloned();
        let bag_position = parcel.sequence;
        state.parcels[index].sorted = true;
        state.scanned_today += 1;
        state.last_scan_time = Some(Utc::now());

        let message = format!(
            "OK -> {} | Position {}",
            driver_name.as_deref().unwrap_or("unknown driver"),
            bag_position.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string())
        );
        Ok(ScanOutcome::Accepted {
            tracking_no: tracking_no.to_string(),
            driver_name,
            bag_position,
            message,
        })
    }

    async fn undo_scan(&self, tracking_no: &str) -> Result<UndoOutcome, BackendError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.next_undo_failure.take() {
            return Err(err);
        }

        let tracking_no = tracking_no.trim();
        let parcel = match state.parcels.iter_mut().find(|p| p.tracking_no == tracking_no) {
            Some(p) => p,
            None => {
                return Ok(UndoOutcome::Rejected {
                    message: "Parcel not found".to_string(),
                })
            }
        };
        if !parcel.sorted {
            return Ok(UndoOutcome::Rejected {
                message: "Parcel is not sorted".to_string(),
            });
        }

        parcel.sorted = false;
        state.scanned_today = state.scanned_today.saturating_sub(1);
        Ok(UndoOutcome::Accepted {
            message: format!("Scan of {} undone", tracking_no),
        })
    }

    async fn sorter_stats(&self) -> Result<SorterStats, BackendError> {
        let state = self.state.read().await;
        Ok(SorterStats {
            total_scanned_today: state.scanned_today,
            last_scan_time: state.last_scan_time,
        })
    }

    async fn list_drivers(&self) -> Result<Vec<DriverId>, BackendError> {
        let state = self.state.read().await;
        Ok(state.drivers.keys().copied().collect())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
