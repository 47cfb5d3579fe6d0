//! Mapping of HTTP-level failures onto [`EngineError`].
//!
//! # Design
//!
//! - Every request carries a constant operation name so failures stay attributable.
//! - A 403 outside login means the session cookie lapsed; 404 on a hash-scoped
//!   endpoint means the engine does not know the task.

use reqwest::{Response, StatusCode};
use swarmprobe_core::{EngineError, InfoHash};

/// Body qBittorrent returns when it declines a form request.
pub(crate) const FAILS_BODY: &str = "Fails.";

pub(crate) fn transport(operation: &'static str, source: reqwest::Error) -> EngineError {
    EngineError::Transport {
        operation,
        source: Box::new(source),
    }
}

pub(crate) fn decode(operation: &'static str, source: reqwest::Error) -> EngineError {
    EngineError::Decode {
        operation,
        source: Box::new(source),
    }
}

/// Turn a non-success response into an error; pass successes through.
pub(crate) fn check_status(
    operation: &'static str,
    response: Response,
    id: Option<&InfoHash>,
) -> Result<Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(match (status, id) {
        (StatusCode::FORBIDDEN, _) => EngineError::Unauthorized { operation },
        (StatusCode::NOT_FOUND, Some(id)) => EngineError::NotFound {
            info_hash: id.to_string(),
        },
        _ => EngineError::Status {
            operation,
            status: status.as_u16(),
        },
    })
}

/// Reject form responses whose body is the engine's refusal marker.
pub(crate) fn check_body(operation: &'static str, body: &str) -> Result<(), EngineError> {
    if body.trim() == FAILS_BODY {
        return Err(EngineError::Rejected {
            operation,
            detail: body.trim().to_string(),
        });
    }
    Ok(())
}
