// sorting/mod.rs - Sorting station scan classification
// Ready -> {Success, Error} -> Ready, one tracking number at a time.

use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::backend::{DispatchBackend, RejectionKind, ScanOutcome, UndoOutcome};
use crate::session::Session;

/// Default number of scans a sorter aims for per shift
pub const DEFAULT_SHIFT_GOAL: u32 = 500;

const UNASSIGNED_DRIVER: &str = "Unassigned";

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub driver_name: String,
    pub bag_position: Option<u32>,
    pub tracking_no: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanError {
    pub kind: RejectionKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ScanState {
    #[default]
    Ready,
    Success(ScanResult),
    Error(ScanError),
}

impl ScanState {
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Ready => "ready",
            ScanState::Success(_) => "success",
            ScanState::Error(_) => "error",
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct ScanClassifier {
    session: Session,
    backend: Arc<dyn DispatchBackend>,
    state: ScanState,
    input: String,
    last_scanned: Option<String>,
    today_count: u32,
    shift_goal: u32,
    tracking_pattern: Option<Regex>,
}

impl ScanClassifier {
    pub fn new(session: Session, backend: Arc<dyn DispatchBackend>) -> Self {
        Self {
            session,
            backend,
            state: ScanState::Ready,
            input: String::new(),
            last_scanned: None,
            today_count: 0,
            shift_goal: DEFAULT_SHIFT_GOAL,
            tracking_pattern: None,
        }
    }

    pub fn with_shift_goal(mut self, goal: u32) -> Self {
        self.shift_goal = goal;
        self
    }

    /// Only scan tracking numbers matching `pattern`; anything else is ignored.
    pub fn with_tracking_pattern(mut self, pattern: Option<Regex>) -> Self {
        self.tracking_pattern = pattern;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn current_result(&self) -> Option<&ScanResult> {
        match &self.state {
            ScanState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn current_error(&self) -> Option<&ScanError> {
        match &self.state {
            ScanState::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn last_scanned(&self) -> Option<&str> {
        self.last_scanned.as_deref()
    }

    pub fn today_count(&self) -> u32 {
        self.today_count
    }

    pub fn shift_goal(&self) -> u32 {
        self.shift_goal
    }

    pub fn shift_progress_percent(&self) -> u8 {
        if self.shift_goal == 0 {
            return 100;
        }
        (self.today_count.saturating_mul(100) / self.shift_goal).min(100) as u8
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
    }

    /// Seed the counter from the backend's statistics. Failures are logged
    /// and leave the counter as it was.
    pub async fn sync_today_count(&mut self) {
        match self.backend.sorter_stats().await {
            Ok(stats) => {
                debug!(count = stats.total_scanned_today, "Sorter stats loaded");
                self.today_count = stats.total_scanned_today;
            }
            Err(e) => warn!(sorter = self.session.user_id(), error = %e, "Could not load sorter stats"),
        }
    }

    /// Scan whatever is in the input buffer.
    pub async fn scan_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        self.scan(&text).await;
    }

    /// Classify one tracking number. Only acts from `Ready`.
    #[instrument(skip(self), fields(sorter = self.session.user_id()))]
    pub async fn scan(&mut self, tracking_no: &str) {
        if self.state != ScanState::Ready {
            debug!(state = self.state.name(), "Scan ignored outside ready state");
            return;
        }
        let tracking_no = match self.normalize(tracking_no) {
            Some(t) => t,
            None => return,
        };

        let outcome = self.backend.scan_tracking_number(&tracking_no).await;
        self.input.clear();
        self.last_scanned = Some(tracking_no.clone());

        self.state = match outcome {
            Ok(ScanOutcome::Accepted {
                tracking_no: confirmed,
                driver_name,
                bag_position,
                ..
            }) => {
                self.today_count += 1;
                info!(
                    tracking_no = %confirmed,
                    driver = ?driver_name,
                    position = ?bag_position,
                    today = self.today_count,
                    "Parcel sorted"
                );
                ScanState::Success(ScanResult {
                    driver_name: driver_name.unwrap_or_else(|| UNASSIGNED_DRIVER.to_string()),
                    bag_position,
                    tracking_no: confirmed,
                })
            }
            Ok(ScanOutcome::Rejected { kind, message }) => {
                info!(tracking_no = %tracking_no, %kind, %message, "Scan rejected");
                ScanState::Error(ScanError { kind, message })
            }
            Err(e) => {
                warn!(tracking_no = %tracking_no, error = %e, "Scan request failed");
                ScanState::Error(ScanError {
                    kind: RejectionKind::NotFound,
                    message: e.operator_message(),
                })
            }
        };
    }

    /// Return to `Ready` from `Success` or `Error`.
    pub fn acknowledge(&mut self) {
        if self.state == ScanState::Ready {
            return;
        }
        self.state = ScanState::Ready;
        self.input.clear();
    }

    /// Undo the scan currently shown as successful.
    ///
    /// The classifier leaves `Success` whatever the outcome, so a given
    /// successful scan can be undone at most once.
    #[instrument(skip(self), fields(sorter = self.session.user_id()))]
    pub async fn undo(&mut self) {
        let tracking_no = match &self.state {
            ScanState::Success(result) => result.tracking_no.clone(),
            _ => {
                debug!(state = self.state.name(), "Nothing to undo");
                return;
            }
        };

        let message = match self.backend.undo_scan(&tracking_no).await {
            Ok(UndoOutcome::Accepted { .. }) => {
                self.today_count = self.today_count.saturating_sub(1);
                info!(tracking_no = %tracking_no, today = self.today_count, "Scan undone");
                self.state = ScanState::Ready;
                self.input.clear();
                return;
            }
            Ok(UndoOutcome::Rejected { message }) => message,
            Err(e) => e.operator_message(),
        };

        warn!(tracking_no = %tracking_no, %message, "Undo failed");
        self.state = ScanState::Error(ScanError {
            kind: RejectionKind::NotFound,
            message,
        });
    }

    /// Trimmed tracking number, or `None` when the input is empty or malformed.
    fn normalize(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(pattern) = &self.tracking_pattern {
            if !pattern.is_match(trimmed) {
                debug!(input = trimmed, "Input does not look like a tracking number");
                return None;
            }
        }
        Some(trimmed.to_string())
    }
}
