//! Access-token request extractor.

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::request::Parts;
use uuid::Uuid;

use crate::token::validate_access_token;

/// Header carrying the raw access token on authenticated requests.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Source of the JWT secret for the extractor — implemented by each
/// service's `AppState`.
pub trait JwtSecretProvider {
    fn jwt_secret(&self) -> &str;
}

/// Authenticated user identity, validated from the `x-access-token` header.
///
/// Rejects with a 401 envelope when the header is absent, malformed, or the
/// token is invalid/expired. Public endpoints simply do not use this
/// extractor; there is no half-authenticated state threaded through request
/// extensions.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
}

/// 401 rejection rendered in the shared response envelope.
#[derive(Debug)]
pub struct Unauthorized(pub &'static str);

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "status": false,
            "message": self.0,
            "data": null,
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: JwtSecretProvider + Send + Sync,
{
    type Rejection = Unauthorized;

    // axum-core 0.5 defines this as `fn -> impl Future + Send` (not `async fn`).
    // In Rust 1.82+ precise capturing, `async fn` captures lifetimes differently,
    // causing E0195. Fix: extract values synchronously, return a 'static async move block.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let token = parts
            .headers
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let result = match token {
            None => Err(Unauthorized("Unauthorized")),
            Some(token) => validate_access_token(&token, state.jwt_secret())
                .map(|info| Identity {
                    user_id: info.user_id,
                })
                .map_err(|_| Unauthorized("Invalid or expired token")),
        };
        async move { result }
    }
}
