//! Error types shared by the coordination components
//!
//! Validation problems (empty or malformed input, moves outside the
//! reorderable window) are not errors: components treat them as no-ops.
//! What remains are backend rejections and transport failures.

use thiserror::Error;
use uuid::Uuid;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend understood the request and declined it.
    #[error("rejected by backend: {message}")]
    Rejected { message: String },

    /// Network, timeout, unexpected status or undecodable body.
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl BackendError {
    pub fn rejected(message: impl Into<String>) -> Self {
        BackendError::Rejected { message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        BackendError::Transport { message: message.into() }
    }

    /// Human-readable message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            BackendError::Rejected { message } | BackendError::Transport { message } => message,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Transport { .. })
    }

    /// Text shown to an operator: a rejection's own message verbatim, a
    /// transport failure with its category.
    pub fn operator_message(&self) -> String {
        match self {
            BackendError::Rejected { message } => message.clone(),
            BackendError::Transport { .. } => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::transport(format!("request timed out: {}", err))
        } else {
            BackendError::transport(err.to_string())
        }
    }
}

/// Errors surfaced by [`crate::route::RouteSequencer`].
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route is not in reorder mode")]
    NotReordering,

    #[error("result belongs to session {actual}, current session is {expected}")]
    StaleSession { expected: Uuid, actual: Uuid },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors surfaced by [`crate::fleet::FleetAggregator`] outside of `aggregate`.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("failed to list active drivers: {0}")]
    ListDrivers(#[source] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_category() {
        let err = BackendError::rejected("parcel list mismatch");
        assert_eq!(err.message(), "parcel list mismatch");
        assert_eq!(err.to_string(), "rejected by backend: parcel list mismatch");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_operator_message() {
        let err = BackendError::rejected("Colis introuvable");
        assert_eq!(err.operator_message(), "Colis introuvable");

        let err = BackendError::transport("gateway timeout");
        assert_eq!(err.operator_message(), "transport error: gateway timeout");
    }

    #[test]
    fn test_route_error_wraps_backend() {
        let err: RouteError = BackendError::transport("connection reset").into();
        assert_eq!(err.to_string(), "transport error: connection reset");
    }
}
