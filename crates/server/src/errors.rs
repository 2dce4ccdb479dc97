use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::OperationResult;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// Error response rendered as a failed `OperationResult`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub title: String,
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: Option<String>) -> Self {
        Self { status, title: title.into(), detail }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Validation Error", Some(detail.into()))
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some("authentication required".into()))
    }

    fn message(&self) -> String {
        match &self.detail {
            Some(d) => format!("{}: {}", self.title, d),
            None => self.title.clone(),
        }
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(m) => Self::new(StatusCode::BAD_REQUEST, "Validation Error", Some(m)),
            ServiceError::NotFound(m) => Self::new(StatusCode::NOT_FOUND, "Not Found", Some(m)),
            ServiceError::Conflict(m) => Self::new(StatusCode::CONFLICT, "Conflict", Some(m)),
            ServiceError::Unauthorized(m) => Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some(m)),
            ServiceError::Forbidden(m) => Self::new(StatusCode::FORBIDDEN, "Forbidden", Some(m)),
            ServiceError::Upstream(m) => Self::new(StatusCode::BAD_GATEWAY, "Upstream Error", Some(m)),
            ServiceError::Db(m) => {
                error!(error = %m, "database error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error", None)
            }
            ServiceError::Internal(m) => {
                error!(error = %m, "internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error", None)
            }
        }
    }
}

impl From<JsonRejection> for JsonApiError {
    fn from(r: JsonRejection) -> Self { Self::new(r.status(), "Invalid Body", Some(r.body_text())) }
}

impl From<PathRejection> for JsonApiError {
    fn from(r: PathRejection) -> Self { Self::new(r.status(), "Invalid Path", Some(r.body_text())) }
}

impl From<QueryRejection> for JsonApiError {
    fn from(r: QueryRejection) -> Self { Self::new(r.status(), "Invalid Query", Some(r.body_text())) }
}

impl From<MultipartRejection> for JsonApiError {
    fn from(r: MultipartRejection) -> Self { Self::new(r.status(), "Invalid Upload", Some(r.body_text())) }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, title = %self.title, "request failed");
        } else {
            warn!(status = %self.status, message = %self.message(), "request rejected");
        }
        let body = OperationResult::<()>::failure(self.message());
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

impl From<ServiceError> for StartupError {
    fn from(e: ServiceError) -> Self { StartupError::InvalidConfig(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::Validation("v".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("n".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("c".into()), StatusCode::CONFLICT),
            (ServiceError::Unauthorized("u".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("f".into()), StatusCode::FORBIDDEN),
            (ServiceError::Upstream("s".into()), StatusCode::BAD_GATEWAY),
            (ServiceError::Db("secret".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(JsonApiError::from(err).status, status);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let e = JsonApiError::from(ServiceError::Db("password=hunter2".into()));
        assert!(!e.message().contains("hunter2"));
    }
}
