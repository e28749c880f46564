// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the vision portal

use crate::portal::CameraState;
use std::fmt;

/// Result type alias using PortalError
pub type PortalResult<T> = Result<T, PortalError>;

/// Main portal error type
#[derive(Debug, Clone, PartialEq)]
pub enum PortalError {
    /// Bad construction parameters, unknown camera name or unregistered processor
    InvalidArgument(String),
    /// Operation not valid in the current state, or an internal invariant broke
    IllegalState(String),
    /// `stop_streaming`/`resume_streaming` called from a state that forbids it
    IllegalTransition {
        /// Name of the rejected operation
        operation: &'static str,
        /// State the portal was in when the call was rejected
        state: CameraState,
    },
    /// The camera device reported an error while opening
    DeviceOpenFailure(String),
    /// Operation is not supported by this portal
    Unsupported(String),
    /// Waiting for a state did not finish in time
    Timeout {
        /// State that was awaited
        expected: CameraState,
        /// State observed when the wait gave up
        actual: CameraState,
    },
    /// Storage/filesystem errors
    Storage(String),
    /// Configuration errors
    Config(String),
}

impl PortalError {
    /// Shorthand for an [`PortalError::InvalidArgument`]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        PortalError::InvalidArgument(msg.into())
    }

    /// Shorthand for an [`PortalError::IllegalState`]
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        PortalError::IllegalState(msg.into())
    }

    /// Shorthand for an [`PortalError::Unsupported`]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        PortalError::Unsupported(msg.into())
    }
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortalError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            PortalError::IllegalState(msg) => write!(f, "Illegal state: {}", msg),
            PortalError::IllegalTransition { operation, state } => {
                write!(f, "Illegal camera state {} when calling {}()", state, operation)
            }
            PortalError::DeviceOpenFailure(msg) => write!(f, "Camera opening failed: {}", msg),
            PortalError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            PortalError::Timeout { expected, actual } => write!(
                f,
                "Timed out waiting for camera state {} (currently {})",
                expected, actual
            ),
            PortalError::Storage(msg) => write!(f, "Storage error: {}", msg),
            PortalError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for PortalError {}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for PortalError {
    fn from(err: image::ImageError) -> Self {
        PortalError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Config(err.to_string())
    }
}
