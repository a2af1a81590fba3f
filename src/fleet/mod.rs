//! Fleet-wide route KPIs
//!
//! One route fetch per driver, all in flight at once. A failed or timed-out
//! fetch marks that driver absent and never affects the others.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::backend::DispatchBackend;
use crate::error::{BackendError, FleetError};
use crate::route::{DriverId, Route};

/// Reduction over every driver's route for one aggregation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct FleetSnapshot {
    pub total_distance_km: f64,
    /// `None` when no present route reports a duration
    pub total_duration_min: Option<f64>,
    /// `None` marks a driver whose fetch failed
    pub per_driver_routes: BTreeMap<DriverId, Option<Route>>,
    pub failures: BTreeMap<DriverId, String>,
    pub taken_at: DateTime<Utc>,
}

impl FleetSnapshot {
    /// Build a snapshot from per-driver fetch results.
    ///
    /// Drivers with no duration add nothing to the total rather than making it
    /// unknown, so `total_duration_min` is a lower bound when some routes lack
    /// an ETA.
    pub fn from_results(results: BTreeMap<DriverId, Result<Route, BackendError>>) -> Self {
        let mut per_driver_routes = BTreeMap::new();
        let mut failures = BTreeMap::new();

        for (driver_id, result) in results {
            match result {
                Ok(route) => {
                    per_driver_routes.insert(driver_id, Some(route));
                }
                Err(e) => {
                    per_driver_routes.insert(driver_id, None);
                    failures.insert(driver_id, e.to_string());
                }
            }
        }

        // BTreeMap iteration keeps float summation independent of completion order
        // fold from +0.0: an empty f64 sum is -0.0
        let total_distance_km = per_driver_routes
            .values()
            .flatten()
            .fold(0.0, |acc: f64, r| acc + r.total_distance_km);
        let total_duration_min = per_driver_routes
            .values()
            .flatten()
            .filter_map(|r| r.total_duration_min)
            .fold(None, |acc: Option<f64>, d| Some(acc.unwrap_or(0.0) + d));

        Self {
            total_distance_km,
            total_duration_min,
            per_driver_routes,
            failures,
            taken_at: Utc::now(),
        }
    }

    pub fn route(&self, driver_id: DriverId) -> Option<&Route> {
        self.per_driver_routes.get(&driver_id).and_then(|r| r.as_ref())
    }

    pub fn present_count(&self) -> usize {
        self.per_driver_routes.values().filter(|r| r.is_some()).count()
    }

    pub fn absent_count(&self) -> usize {
        self.per_driver_routes.values().filter(|r| r.is_none()).count()
    }

    pub fn absent_drivers(&self) -> Vec<DriverId> {
        self.per_driver_routes
            .iter()
            .filter(|(_, r)| r.is_none())
            .map(|(id, _)| *id)
            .collect()
    }
}

pub struct FleetAggregator {
    backend: Arc<dyn DispatchBackend>,
    fetch_timeout: Option<Duration>,
}

impl FleetAggregator {
    pub fn new(backend: Arc<dyn DispatchBackend>) -> Self {
        Self {
            backend,
            fetch_timeout: None,
        }
    }

    /// Treat any single fetch slower than `timeout` as failed.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Fetch every driver's route concurrently and reduce the results.
    /// Always returns a snapshot, possibly with every driver absent.
    #[instrument(skip(self, drivers), fields(drivers = drivers.len()))]
    pub async fn aggregate(&self, drivers: &[DriverId]) -> FleetSnapshot {
        let started = tokio::time::Instant::now();
        let mut results: BTreeMap<DriverId, Result<Route, BackendError>> = BTreeMap::new();
        let mut fetches = JoinSet::new();

        for &driver_id in drivers {
            if results.contains_key(&driver_id) {
                continue;
            }
            // placeholder until the fetch reports back; a panicked task leaves it in place
            results.insert(driver_id, Err(BackendError::transport("route fetch did not complete")));

            let backend = Arc::clone(&self.backend);
            let timeout = self.fetch_timeout;
            fetches.spawn(async move {
                let fetch = backend.fetch_route(driver_id);
                let result = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, fetch).await {
                        Ok(result) => result,
                        Err(_) => Err(BackendError::transport(format!(
                            "route fetch timed out after {:?}",
                            limit
                        ))),
                    },
                    None => fetch.await,
                };
                (driver_id, result)
            });
        }

        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((driver_id, result)) => {
                    if let Err(e) = &result {
                        warn!(driver_id, error = %e, "Route fetch failed");
                    }
                    results.insert(driver_id, result);
                }
                Err(e) => warn!(error = %e, "Route fetch task aborted"),
            }
        }

        let snapshot = FleetSnapshot::from_results(results);
        info!(
            present = snapshot.present_count(),
            absent = snapshot.absent_count(),
            total_distance_km = snapshot.total_distance_km,
            elapsed = ?started.elapsed(),
            "Fleet aggregated"
        );
        snapshot
    }

    /// Aggregate over every driver the backend lists as active.
    pub async fn aggregate_active(&self) -> Result<FleetSnapshot, FleetError> {
        let drivers = self
            .backend
            .list_drivers()
            .await
            .map_err(FleetError::ListDrivers)?;
        Ok(self.aggregate(&drivers).await)
    }
}
