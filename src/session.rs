//! Explicit session context
//!
//! Every component is constructed with the session it serves instead of
//! reading a "current user" from global state. The session id also tags
//! results fetched on its behalf so that a late result cannot be applied to
//! a component that has since been handed a different session.

use uuid::Uuid;

use crate::backend::DispatchBackend;
use crate::error::BackendError;
use crate::route::{DriverId, Route};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    user_id: i64,
}

impl Session {
    /// Open a new session for a driver or sorter account.
    pub fn new(user_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// The driver whose route this session tracks.
    pub fn driver_id(&self) -> DriverId {
        self.user_id
    }

    /// Fetch this session's route, tagged with the session id.
    pub async fn fetch_route<B>(&self, backend: &B) -> Result<RouteFetch, BackendError>
    where
        B: DispatchBackend + ?Sized,
    {
        let route = backend.fetch_route(self.driver_id()).await?;
        Ok(RouteFetch {
            session_id: self.id,
            route,
        })
    }
}

/// A route fetched on behalf of a particular session.
#[derive(Debug, Clone)]
pub struct RouteFetch {
    pub session_id: Uuid,
    pub route: Route,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_distinct() {
        let a = Session::new(3);
        let b = Session::new(3);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.driver_id(), 3);
    }
}
