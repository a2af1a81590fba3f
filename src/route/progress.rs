//! Delivery progress along a loaded route
//!
//! `stops[..cursor]` are delivered, `stops[cursor]` is current and the rest
//! are upcoming. The cursor only moves forward through [`advance`] and goes
//! back to zero whenever the route is replaced.
//!
//! [`advance`]: RouteProgressTracker::advance

use super::{Route, Stop};

#[derive(Debug, Clone, Default)]
pub struct RouteProgressTracker {
    route: Option<Route>,
    cursor: usize,
}

impl RouteProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked route and reset the cursor.
    pub fn load(&mut self, route: Route) {
        tracing::debug!(driver_id = route.driver_id, stops = route.len(), "Route loaded");
        self.route = Some(route);
        self.cursor = 0;
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn stops(&self) -> &[Stop] {
        self.route.as_ref().map(|r| r.stops.as_slice()).unwrap_or(&[])
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Stop> {
        self.stops().get(self.cursor)
    }

    pub fn upcoming(&self) -> &[Stop] {
        self.stops().get(self.cursor + 1..).unwrap_or(&[])
    }

    /// Confirm delivery of the current stop. No-op once everything is delivered.
    pub fn advance(&mut self) {
        if self.cursor < self.total() {
            self.cursor += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.stops().len()
    }

    pub fn delivered_count(&self) -> usize {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.total()
    }

    /// Rounded share of delivered stops, 0 for an empty route.
    pub fn progress_percent(&self) -> u8 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        // round-half-up of 100 * cursor / total in integers
        ((200 * self.cursor + total) / (2 * total)) as u8
    }

    pub(crate) fn stops_mut(&mut self) -> &mut [Stop] {
        match self.route.as_mut() {
            Some(route) => route.stops.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Put back a previously captured stop order without touching the cursor.
    pub(crate) fn restore_stops(&mut self, stops: Vec<Stop>) {
        if let Some(route) = self.route.as_mut() {
            route.stops = stops;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::fixtures::abc_route;
    use crate::route::Route;

    #[test]
    fn test_load_resets_cursor() {
        let mut tracker = RouteProgressTracker::new();
        tracker.load(abc_route(1));
        tracker.advance();
        tracker.advance();
        assert_eq!(tracker.cursor(), 2);

        tracker.load(abc_route(1));
        assert_eq!(tracker.cursor(), 0);
        assert_eq!(tracker.current().map(|s| s.tracking_no.as_str()), Some("A"));
    }

    #[test]
    fn test_empty_route() {
        let mut tracker = RouteProgressTracker::new();
        assert_eq!(tracker.progress_percent(), 0);
        assert!(tracker.current().is_none());

        tracker.load(Route::empty(4));
        assert_eq!(tracker.progress_percent(), 0);
        assert!(tracker.current().is_none());
        assert!(tracker.upcoming().is_empty());
        assert!(tracker.is_complete());

        tracker.advance();
        assert_eq!(tracker.cursor(), 0);
    }

    #[test]
    fn test_advance_twice_on_three_stops() {
        let mut tracker = RouteProgressTracker::new();
        tracker.load(abc_route(1));
        tracker.advance();
        tracker.advance();

        assert_eq!(tracker.cursor(), 2);
        assert_eq!(tracker.current().map(|s| s.tracking_no.as_str()), Some("C"));
        assert!(tracker.upcoming().is_empty());
        assert_eq!(tracker.progress_percent(), 67);
    }

    #[test]
    fn test_upcoming_excludes_current() {
        let mut tracker = RouteProgressTracker::new();
        tracker.load(abc_route(1));
        let upcoming: Vec<_> = tracker.upcoming().iter().map(|s| s.tracking_no.as_str()).collect();
        assert_eq!(upcoming, vec!["B", "C"]);
        assert_eq!(tracker.progress_percent(), 0);
    }

    #[test]
    fn test_cursor_never_passes_end() {
        let mut tracker = RouteProgressTracker::new();
        tracker.load(abc_route(1));

        let mut last = tracker.cursor();
        for _ in 0..10 {
            tracker.advance();
            assert!(tracker.cursor() >= last);
            assert!(tracker.cursor() <= tracker.total());
            last = tracker.cursor();
        }

        assert!(tracker.is_complete());
        assert!(tracker.current().is_none());
        assert_eq!(tracker.delivered_count(), 3);
        assert_eq!(tracker.progress_percent(), 100);
    }

    #[test]
    fn test_progress_rounding() {
        let mut tracker = RouteProgressTracker::new();
        tracker.load(abc_route(1));
        tracker.advance();
        // 33.3 rounds down
        assert_eq!(tracker.progress_percent(), 33);
    }
}
