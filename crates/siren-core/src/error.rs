use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by the routing core.
///
/// "No path" and "constraint violated" are normal outcomes and are reported
/// through return values, never through this type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("malformed segment {id}: {reason}")]
    MalformedSegment { id: String, reason: String },

    #[error("missing coordinate: {0}")]
    MissingCoordinate(String),

    #[error("unknown segment: {0}")]
    UnknownSegment(String),
}

impl RoutingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) | Self::MissingCoordinate(_) => ErrorKind::InvalidInput,
            Self::MalformedSegment { .. } | Self::UnknownSegment(_) => ErrorKind::Internal,
        }
    }
}

/// Coarse failure class reported on unsuccessful results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Internal,
}

pub type Result<T> = std::result::Result<T, RoutingError>;
