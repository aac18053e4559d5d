use std::collections::BTreeMap;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::MessagingError;
use crate::response::{Reply, reply};
use crate::state::AppState;
use crate::usecase::auth::{SignInInput, SignInUseCase, VerifySignInInput, VerifySignInUseCase};

fn check_email(email: &str, errors: &mut BTreeMap<String, String>) {
    let trimmed = email.trim();
    let well_formed = trimmed.len() <= 100
        && trimmed.split('@').count() == 2
        && trimmed.split('@').all(|part| !part.is_empty());
    if !well_formed {
        errors.insert("email".to_owned(), "must be a valid email address".to_owned());
    }
}

// ── POST /auth/sign-in ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> Result<Json<Reply<serde_json::Value>>, MessagingError> {
    let mut errors = BTreeMap::new();
    check_email(&body.email, &mut errors);
    if !errors.is_empty() {
        return Err(MessagingError::Validation(errors));
    }

    let usecase = SignInUseCase {
        users: state.user_repo(),
        codes: state.verification_code_repo(),
        mailer: state.mailer.clone(),
    };
    usecase.execute(SignInInput { email: body.email }).await?;

    Ok(Json(reply::success(
        "Check your email for the sign-in code",
        serde_json::Value::Null,
    )))
}

// ── POST /auth/verify-sign-in ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifySignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignInResponse {
    pub access_token: String,
}

pub async fn verify_sign_in(
    State(state): State<AppState>,
    Json(body): Json<VerifySignInRequest>,
) -> Result<Json<Reply<VerifySignInResponse>>, MessagingError> {
    let mut errors = BTreeMap::new();
    check_email(&body.email, &mut errors);
    if body.code.trim().is_empty() {
        errors.insert("code".to_owned(), "is required".to_owned());
    }
    if !errors.is_empty() {
        return Err(MessagingError::Validation(errors));
    }

    let usecase = VerifySignInUseCase {
        users: state.user_repo(),
        codes: state.verification_code_repo(),
        jwt_secret: state.jwt_secret.clone(),
        token_ttl_secs: state.jwt_access_token_ttl_secs,
    };
    let access_token = usecase
        .execute(VerifySignInInput {
            email: body.email,
            code: body.code,
        })
        .await?;

    Ok(Json(reply::success(
        "Sign in successfully",
        VerifySignInResponse { access_token },
    )))
}
