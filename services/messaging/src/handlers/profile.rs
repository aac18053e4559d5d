use std::collections::BTreeMap;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use courier_auth_types::bearer::Identity;

use crate::domain::types::User;
use crate::error::MessagingError;
use crate::response::{Reply, reply};
use crate::state::AppState;
use crate::usecase::profile::{GetProfileUseCase, UpdateProfileInput, UpdateProfileUseCase};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub last_active_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            fullname: user.fullname,
            email: user.email,
            phone: user.phone,
            avatar: user.avatar,
            is_active: user.is_active,
            last_active_at: user.last_active_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// ── GET /user/profile ────────────────────────────────────────────────────────

pub async fn get_profile(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<Reply<ProfileResponse>>, MessagingError> {
    let usecase = GetProfileUseCase {
        users: state.user_repo(),
    };
    let user = usecase.execute(identity.user_id).await?;
    Ok(Json(reply::success("", ProfileResponse::from(user))))
}

// ── PATCH /user/profile ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub fullname: Option<String>,
    pub phone: Option<String>,
    /// Temporary-file reference from `POST /file/upload`.
    pub avatar: Option<String>,
}

pub async fn update_profile(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Reply<ProfileResponse>>, MessagingError> {
    let mut errors = BTreeMap::new();
    if body.fullname.as_deref().is_some_and(|s| s.len() > 50) {
        errors.insert(
            "fullname".to_owned(),
            "must be at most 50 characters".to_owned(),
        );
    }
    if body.phone.as_deref().is_some_and(|s| s.len() > 50) {
        errors.insert(
            "phone".to_owned(),
            "must be at most 50 characters".to_owned(),
        );
    }
    if !errors.is_empty() {
        return Err(MessagingError::Validation(errors));
    }

    let usecase = UpdateProfileUseCase {
        users: state.user_repo(),
        files: state.files.clone(),
    };
    let user = usecase
        .execute(
            identity.user_id,
            UpdateProfileInput {
                fullname: body.fullname,
                phone: body.phone,
                avatar: body.avatar,
            },
        )
        .await?;

    Ok(Json(reply::success(
        "Update success",
        ProfileResponse::from(user),
    )))
}
