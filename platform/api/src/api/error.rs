use hyper::{Body, Response, StatusCode};
use routerify::RequestInfo;
use serde_json::json;

use crate::api::macros::make_response;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// Malformed or incomplete inbound payload, rejected before any side
    /// effect. Always reported with the fixed indicator.
    #[error("invalid query")]
    InvalidQuery,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("access denied")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to parse http body: {0}")]
    ParseHttpBody(#[from] hyper::Error),
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidQuery => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::ParseHttpBody(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn response(&self) -> Response<Body> {
        let status = self.status();
        // Server-side failures are not spelled out to the caller.
        let result = if status.is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        make_response!(status, json!({ "status": false, "result": result }))
    }
}

pub async fn error_handler(err: routerify::RouteError, info: RequestInfo) -> Response<Body> {
    match err.downcast::<ApiError>() {
        Ok(err) => {
            if err.status().is_server_error() {
                tracing::error!(path = %info.uri(), method = %info.method(), error = %err, "http error");
            } else {
                tracing::debug!(path = %info.uri(), method = %info.method(), error = %err, "http error");
            }

            err.response()
        }
        Err(err) => {
            tracing::error!(path = %info.uri(), method = %info.method(), error = ?err, "unhandled http error");
            make_response!(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "status": false, "result": "internal server error" })
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_distinct_statuses() {
        assert_eq!(ApiError::InvalidQuery.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("project").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden("manager is not assigned to this project").status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn validation_uses_the_fixed_indicator() {
        assert_eq!(ApiError::InvalidQuery.to_string(), "invalid query");
    }

    #[test]
    fn server_errors_are_not_spelled_out() {
        let response = ApiError::Internal("push client misconfigured").response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
