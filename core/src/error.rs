//! Error types for the request pipeline.
//!
//! # Design
//! Synchronous errors (`SendError`, `CapabilityError`) come back from
//! `send()` as a typed result. Asynchronous outcomes travel the failure
//! completion path as a `Failure`: network-level problems and timeouts carry
//! status 0, completed exchanges with a non-success status carry the real
//! status plus the normalized response. Parse problems during normalization
//! are never errors; they degrade to the raw representation and log.

use std::fmt;

use crate::response::Response;

/// The environment cannot satisfy the requested transport capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    /// Cross-origin was requested but no registered transport supports it.
    CrossOriginUnsupported,
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CrossOriginUnsupported => {
                write!(f, "cross-origin not supported by this environment")
            }
        }
    }
}

impl std::error::Error for CapabilityError {}

/// An invalid send invocation, reported before any I/O is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Callback completion is in effect but no success handler was registered.
    MissingCompletion,
    /// The transport factory could not satisfy the cross-origin options.
    Capability(CapabilityError),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCompletion => write!(f, "a success handler is required to send this request"),
            Self::Capability(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for SendError {}

impl From<CapabilityError> for SendError {
    fn from(error: CapabilityError) -> Self {
        Self::Capability(error)
    }
}

/// The value delivered on the failure completion path.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The exchange never completed: a transport-level error or a timeout.
    Network { reason: String },
    /// The exchange completed with a status outside the success range.
    Http(Response),
}

impl Failure {
    /// The HTTP status associated with this failure; network-level failures
    /// and timeouts report 0.
    pub fn status(&self) -> u16 {
        match self {
            Self::Network { .. } => 0,
            Self::Http(response) => response.status,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { reason } => write!(f, "network failure: {reason}"),
            Self::Http(response) => write!(f, "HTTP {}", response.status),
        }
    }
}

impl std::error::Error for Failure {}
