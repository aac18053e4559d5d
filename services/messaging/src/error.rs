use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::response::reply;

/// Messaging service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl MessagingError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Validation(_) => "bad_request",
            Self::Internal(_) => "internal",
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl IntoResponse for MessagingError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Log 500s only — tower-http TraceLayer already records method/uri/status
        // for all requests, and 4xx are expected client errors. Internal errors
        // need the anyhow chain logged so the root cause is traceable; the
        // caller only ever sees the generic message.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "internal", "internal error");
        }
        let body = match &self {
            Self::Validation(fields) => reply::fail_with_detail(
                self.to_string(),
                serde_json::to_value(fields).unwrap_or_default(),
            ),
            _ => reply::fail(self.to_string()),
        };
        (status, axum::Json(body)).into_response()
    }
}
