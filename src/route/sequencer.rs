//! Manual reordering of upcoming stops
//!
//! Moves edit the live stop list. The order captured when reorder mode was
//! entered is kept so that leaving the mode without committing puts it back.
//! A commit sends the whole local order to the optimizer and adopts the
//! route it returns wholesale: leg distances and ETAs are only ever computed
//! server-side.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{Route, RouteProgressTracker, Stop};
use crate::backend::DispatchBackend;
use crate::error::{BackendError, RouteError};
use crate::session::{RouteFetch, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Towards the front of the route (index - 1)
    Up,
    /// Towards the end of the route (index + 1)
    Down,
}

impl MoveDirection {
    fn apply(self, index: usize) -> Option<usize> {
        match self {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => index.checked_add(1),
        }
    }
}

pub struct RouteSequencer {
    session: Session,
    backend: Arc<dyn DispatchBackend>,
    tracker: RouteProgressTracker,
    /// Order at `begin_reorder`; `Some` exactly while in reorder mode
    reorder_origin: Option<Vec<Stop>>,
}

impl RouteSequencer {
    pub fn new(session: Session, backend: Arc<dyn DispatchBackend>) -> Self {
        Self {
            session,
            backend,
            tracker: RouteProgressTracker::new(),
            reorder_origin: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tracker(&self) -> &RouteProgressTracker {
        &self.tracker
    }

    pub fn route(&self) -> Option<&Route> {
        self.tracker.route()
    }

    /// Replace the route, reset the cursor and drop any pending reorder.
    pub fn load(&mut self, route: Route) {
        self.reorder_origin = None;
        self.tracker.load(route);
    }

    /// Load a route fetched elsewhere, provided it was fetched for this session.
    pub fn apply_fetched(&mut self, fetch: RouteFetch) -> Result<(), RouteError> {
        if fetch.session_id != self.session.id() {
            warn!(
                expected = %self.session.id(),
                actual = %fetch.session_id,
                "Discarding route fetched for another session"
            );
            return Err(RouteError::StaleSession {
                expected: self.session.id(),
                actual: fetch.session_id,
            });
        }
        self.load(fetch.route);
        Ok(())
    }

    /// Fetch the authoritative route for this session's driver and load it.
    /// On failure the current state is left as it was.
    #[instrument(skip(self), fields(driver_id = self.session.driver_id()))]
    pub async fn reload(&mut self) -> Result<(), RouteError> {
        let fetch = self.session.fetch_route(self.backend.as_ref()).await?;
        info!(stops = fetch.route.len(), "Route fetched");
        self.apply_fetched(fetch)
    }

    /// Confirm delivery of the current stop. Ignored while reordering.
    pub fn advance(&mut self) {
        if self.is_reordering() {
            return;
        }
        self.tracker.advance();
    }

    pub fn is_reordering(&self) -> bool {
        self.reorder_origin.is_some()
    }

    pub fn begin_reorder(&mut self) {
        if self.reorder_origin.is_none() {
            self.reorder_origin = Some(self.tracker.stops().to_vec());
        }
    }

    /// Leave reorder mode without committing, restoring the order it started with.
    pub fn cancel_reorder(&mut self) {
        if let Some(origin) = self.reorder_origin.take() {
            self.tracker.restore_stops(origin);
        }
    }

    /// Swap the stop at `from` with its neighbour in `direction`.
    ///
    /// Both positions must lie strictly after the cursor and inside the list;
    /// otherwise nothing happens. Returns whether the swap took place.
    pub fn move_stop(&mut self, from: usize, direction: MoveDirection) -> bool {
        if !self.is_reordering() {
            return false;
        }
        let cursor = self.tracker.cursor();
        let len = self.tracker.total();
        let to = match direction.apply(from) {
            Some(to) => to,
            None => return false,
        };
        if from <= cursor || to <= cursor || from >= len || to >= len {
            return false;
        }
        self.tracker.stops_mut().swap(from, to);
        true
    }

    /// Send the local order to the optimizer and adopt its response.
    ///
    /// On failure the local order and reorder mode are kept so the caller can
    /// retry or cancel.
    #[instrument(skip(self), fields(driver_id = self.session.driver_id()))]
    pub async fn commit(&mut self) -> Result<Route, RouteError> {
        if !self.is_reordering() {
            return Err(RouteError::NotReordering);
        }
        let parcel_ids: Vec<_> = self.tracker.stops().iter().map(|s| s.parcel_id).collect();
        let session_id = self.session.id();

        let result: Result<Route, BackendError> = self
            .backend
            .commit_reorder(self.session.driver_id(), &parcel_ids)
            .await;

        match result {
            Ok(route) => {
                info!(
                    session = %session_id,
                    stops = route.len(),
                    total_distance_km = route.total_distance_km,
                    "Reorder committed"
                );
                self.load(route.clone());
                Ok(route)
            }
            Err(e) => {
                warn!(error = %e, "Reorder commit failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::route::fixtures::abc_route;
    use tokio_test::{assert_err, assert_ok};

    fn order(seq: &RouteSequencer) -> Vec<&str> {
        seq.tracker().stops().iter().map(|s| s.tracking_no.as_str()).collect()
    }

    fn offline_sequencer() -> RouteSequencer {
        let backend = Arc::new(InMemoryBackend::new());
        let mut seq = RouteSequencer::new(Session::new(1), backend);
        seq.load(abc_route(1));
        seq
    }

    async fn seeded() -> (Arc<InMemoryBackend>, RouteSequencer) {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_driver(5, "marcus").await;
        backend.add_parcel(5, 11, "PKG-A", "1 Bd Anfa", Some((33.59, -7.63))).await;
        backend.add_parcel(5, 12, "PKG-B", "2 Bd Anfa", Some((33.60, -7.62))).await;
        backend.add_parcel(5, 13, "PKG-C", "3 Bd Anfa", Some((33.61, -7.61))).await;
        backend.add_parcel(5, 14, "PKG-D", "4 Bd Anfa", Some((33.62, -7.60))).await;

        let mut seq = RouteSequencer::new(Session::new(5), backend.clone());
        seq.reload().await.unwrap();
        (backend, seq)
    }

    #[test]
    fn test_move_requires_reorder_mode() {
        let mut seq = offline_sequencer();
        assert!(!seq.move_stop(1, MoveDirection::Down));
        assert_eq!(order(&seq), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_move_cannot_touch_current_or_delivered() {
        let mut seq = offline_sequencer();
        seq.advance();
        seq.begin_reorder();

        // current stop is B at index 1
        assert!(!seq.move_stop(1, MoveDirection::Down));
        assert!(!seq.move_stop(2, MoveDirection::Up));
        assert!(!seq.move_stop(0, MoveDirection::Down));
        assert!(!seq.move_stop(2, MoveDirection::Down));
        assert_eq!(order(&seq), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_move_upcoming_stops() {
        let mut seq = offline_sequencer();
        seq.begin_reorder();
        assert!(seq.move_stop(2, MoveDirection::Up));
        assert_eq!(order(&seq), vec!["A", "C", "B"]);
        assert!(seq.move_stop(1, MoveDirection::Down));
        assert_eq!(order(&seq), vec!["A", "B", "C"]);
        assert!(!seq.move_stop(0, MoveDirection::Up));
    }

    #[test]
    fn test_positions_up_to_cursor_never_change() {
        let mut seq = offline_sequencer();
        seq.advance();
        seq.begin_reorder();
        let fixed: Vec<_> = seq.tracker().stops()[..=seq.tracker().cursor()].to_vec();

        for from in 0..4 {
            for dir in [MoveDirection::Up, MoveDirection::Down] {
                seq.move_stop(from, dir);
                assert_eq!(&seq.tracker().stops()[..fixed.len()], fixed.as_slice());
            }
        }
    }

    #[test]
    fn test_cancel_restores_order() {
        let mut seq = offline_sequencer();
        seq.begin_reorder();
        seq.move_stop(2, MoveDirection::Up);
        seq.cancel_reorder();

        assert!(!seq.is_reordering());
        assert_eq!(order(&seq), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_advance_ignored_while_reordering() {
        let mut seq = offline_sequencer();
        seq.begin_reorder();
        seq.advance();
        assert_eq!(seq.tracker().cursor(), 0);
    }

    #[tokio::test]
    async fn test_commit_outside_reorder_mode() {
        let mut seq = offline_sequencer();
        let err = assert_err!(seq.commit().await);
        assert!(matches!(err, RouteError::NotReordering));
    }

    #[tokio::test]
    async fn test_commit_adopts_server_route_and_resets_cursor() {
        let (_backend, mut seq) = seeded().await;
        seq.advance();
        seq.begin_reorder();
        assert!(seq.move_stop(3, MoveDirection::Up));
        assert_eq!(order(&seq), vec!["PKG-A", "PKG-B", "PKG-D", "PKG-C"]);

        let committed = assert_ok!(seq.commit().await);

        assert_eq!(seq.route(), Some(&committed));
        assert_eq!(seq.tracker().cursor(), 0);
        assert!(!seq.is_reordering());
        assert_eq!(committed.parcel_ids(), vec![11, 12, 14, 13]);
        assert!(committed.is_contiguous());
    }

    #[tokio::test]
    async fn test_commit_failure_keeps_local_order() {
        let (backend, mut seq) = seeded().await;
        seq.begin_reorder();
        seq.move_stop(2, MoveDirection::Down);
        backend.fail_next_commit("connection reset").await;

        let err = assert_err!(seq.commit().await);
        assert!(matches!(err, RouteError::Backend(BackendError::Transport { .. })));
        assert!(seq.is_reordering());
        assert_eq!(order(&seq), vec!["PKG-A", "PKG-B", "PKG-D", "PKG-C"]);

        // retry succeeds
        let committed = assert_ok!(seq.commit().await);
        assert_eq!(committed.parcel_ids(), vec![11, 12, 14, 13]);
    }

    #[tokio::test]
    async fn test_commit_rejected_when_assignment_changed() {
        let (backend, mut seq) = seeded().await;
        backend.add_parcel(5, 15, "PKG-E", "5 Bd Anfa", Some((33.63, -7.59))).await;
        seq.begin_reorder();

        let err = assert_err!(seq.commit().await);
        assert!(matches!(err, RouteError::Backend(BackendError::Rejected { .. })));
        assert_eq!(seq.tracker().total(), 4);
    }

    #[tokio::test]
    async fn test_stale_fetch_is_discarded() {
        let (backend, mut seq) = seeded().await;
        let old_session = Session::new(5);
        let fetch = old_session.fetch_route(backend.as_ref()).await.unwrap();
        seq.advance();

        let err = assert_err!(seq.apply_fetched(fetch));
        assert!(matches!(err, RouteError::StaleSession { .. }));
        assert_eq!(seq.tracker().cursor(), 1);
    }

    #[tokio::test]
    async fn test_reload_resets_cursor() {
        let (_backend, mut seq) = seeded().await;
        seq.advance();
        seq.advance();
        assert_ok!(seq.reload().await);
        assert_eq!(seq.tracker().cursor(), 0);
    }
}
