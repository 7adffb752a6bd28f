use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use paperstock_core::{DomainError, ErrorKind};

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    json_error(status_for(err.kind()), err.code(), err.messages())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    messages: Vec<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "messages": messages,
        })),
    )
        .into_response()
}

/// Malformed bodies, paths, and queries are reported as `bad_request` in the
/// same envelope as domain errors.
pub fn rejection(message: impl std::fmt::Display) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "bad_request", vec![message.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);

        let res = domain_error_to_response(DomainError::forbidden("no"));
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
