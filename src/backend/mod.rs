//! Remote operations consumed by the coordination core
//!
//! Responses are modelled as tagged outcomes: a backend-declared rejection
//! is an `Ok(..::Rejected)`, a failed round trip is `Err(BackendError)`.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::route::{DriverId, ParcelId, Route};

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

/// Why the sorting backend refused to classify a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    AlreadySorted,
    NotFound,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::AlreadySorted => "already_sorted",
            RejectionKind::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Accepted {
        tracking_no: String,
        driver_name: Option<String>,
        bag_position: Option<u32>,
        message: String,
    },
    Rejected {
        kind: RejectionKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Accepted { message: String },
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SorterStats {
    pub total_scanned_today: u32,
    #[serde(default)]
    pub last_scan_time: Option<DateTime<Utc>>,
}

/// The dispatch backend as seen by the coordination core.
///
/// None of these calls are retried by the core: a lost response to a scan
/// that actually succeeded must not lead to the parcel being classified twice.
#[async_trait]
pub trait DispatchBackend: Send + Sync {
    /// Authoritative ordered stop list and aggregates for one driver.
    async fn fetch_route(&self, driver_id: DriverId) -> Result<Route, BackendError>;

    /// Re-sequence the driver's parcels in the given order and return the
    /// recomputed route. Rejects anything that is not a permutation of the
    /// driver's assigned parcels.
    async fn commit_reorder(
        &self,
        driver_id: DriverId,
        ordered_parcel_ids: &[ParcelId],
    ) -> Result<Route, BackendError>;

    async fn scan_tracking_number(&self, tracking_no: &str) -> Result<ScanOutcome, BackendError>;

    async fn undo_scan(&self, tracking_no: &str) -> Result<UndoOutcome, BackendError>;

    /// Today's sorting statistics for the authenticated sorter.
    async fn sorter_stats(&self) -> Result<SorterStats, BackendError>;

    /// Ids of every account with the driver role.
    async fn list_drivers(&self) -> Result<Vec<DriverId>, BackendError>;
}
