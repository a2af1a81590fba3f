//! Lastmile - coordination core for last-mile delivery
//!
//! Tracks a driver's progress along an ordered stop list, lets the driver
//! reorder upcoming stops and commit the order to the route optimizer,
//! drives the sorting-station scan state machine, and aggregates route KPIs
//! across the fleet from an unreliable backend.

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod fleet;
pub mod route;
pub mod session;
pub mod sorting;

// Re-export commonly used types
pub use backend::{DispatchBackend, HttpBackend, InMemoryBackend, RejectionKind};
pub use config::{Config, RuntimeConfig};
pub use error::{BackendError, FleetError, RouteError};
pub use fleet::{FleetAggregator, FleetSnapshot};
pub use route::{Route, RouteProgressTracker, RouteSequencer, Stop};
pub use session::Session;
pub use sorting::{ScanClassifier, ScanState};
