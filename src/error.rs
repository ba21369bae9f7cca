//! Error types for marga-nav.

use thiserror::Error;

use crate::graph::NodeId;

/// Terminal failure kinds reported by the anchor cloud service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorFailure {
    /// API key rejected or anchor not visible to this account.
    NotAuthorized,
    /// Cloud service unreachable or degraded.
    ServiceUnavailable,
    /// Resolve/host quota exhausted.
    ResourceExhausted,
    /// Unspecified service-side error.
    Internal,
}

impl std::fmt::Display for AnchorFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnchorFailure::NotAuthorized => write!(f, "not authorized"),
            AnchorFailure::ServiceUnavailable => write!(f, "service unavailable"),
            AnchorFailure::ResourceExhausted => write!(f, "resource exhausted"),
            AnchorFailure::Internal => write!(f, "internal service error"),
        }
    }
}

/// marga-nav error type.
///
/// `TrackingLost` and `NoReferenceFrame` are expected steady states while
/// localization is warming up; callers surface them as a "localizing…"
/// status, never as a hard error. Per-node anchor failures are absorbed
/// internally. `SessionUnavailable` is fatal to the navigation feature.
#[derive(Error, Debug)]
pub enum NavError {
    #[error("AR tracking lost")]
    TrackingLost,

    #[error("no reference frame yet (not enough resolved anchors)")]
    NoReferenceFrame,

    #[error("anchor resolution failed for node {node_id}: {kind}")]
    AnchorResolutionFailed { node_id: NodeId, kind: AnchorFailure },

    #[error("anchor hosting failed: {kind}")]
    AnchorHostingFailed { kind: AnchorFailure },

    #[error("no route to destination")]
    NoRouteFound,

    #[error("AR session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
