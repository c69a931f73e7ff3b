//! Route handlers.

pub mod internal;
pub mod notifications;

use axum::http::StatusCode;
use washline_core::WashlineError;

/// Map a core error onto an HTTP error response body.
pub(crate) fn error_response(err: WashlineError) -> (StatusCode, String) {
    let status = match &err {
        WashlineError::NotificationNotFound(_) => StatusCode::NOT_FOUND,
        WashlineError::ValidationError(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
