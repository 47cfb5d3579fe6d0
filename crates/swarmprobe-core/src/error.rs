//! Error types for engine operations.

use std::error::Error;

use thiserror::Error;

/// Failure raised by an [`EngineClient`](crate::EngineClient) call.
///
/// Clients never retry; callers decide whether a failure ends their step.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No authenticated engine session is available.
    #[error("engine connection unavailable")]
    NotConnected {
        /// Operation that required the connection.
        operation: &'static str,
        /// Why the login attempt made for this call failed.
        source: Box<EngineError>,
    },
    /// The engine refused the supplied credentials.
    #[error("engine rejected credentials")]
    LoginRejected,
    /// The engine session lapsed or was never granted for this request.
    #[error("engine session is not authorized")]
    Unauthorized {
        /// Operation identifier.
        operation: &'static str,
    },
    /// The request never produced a response.
    #[error("engine request failed")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The engine answered with a non-success status.
    #[error("engine returned status {status}")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// The engine accepted the request but reported that it did not apply it.
    #[error("engine rejected the request")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// Response body returned by the engine.
        detail: String,
    },
    /// The response payload could not be decoded.
    #[error("engine response could not be decoded")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying decode failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The addressed task does not exist at the engine.
    #[error("task not found")]
    NotFound {
        /// Identifier that was not found.
        info_hash: String,
    },
}

impl EngineError {
    /// Operation identifier attached to the failure, if any.
    #[must_use]
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::NotConnected { operation, .. }
            | Self::Unauthorized { operation }
            | Self::Transport { operation, .. }
            | Self::Status { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::Decode { operation, .. } => Some(operation),
            Self::LoginRejected | Self::NotFound { .. } => None,
        }
    }

    /// Single-line description including the source chain, suitable for replies.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut text = match self.operation() {
            Some(operation) => format!("{operation}: {self}"),
            None => self.to_string(),
        };
        if let Self::Rejected { detail, .. } = self
            && !detail.trim().is_empty()
        {
            text.push_str(&format!(" ({})", detail.trim()));
        }
        let mut source = self.source();
        while let Some(cause) = source {
            text.push_str(&format!(": {cause}"));
            source = cause.source();
        }
        text
    }
}

/// Convenience alias for engine operation results.
pub type EngineResult<T> = Result<T, EngineError>;
