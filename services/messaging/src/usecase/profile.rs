use uuid::Uuid;

use crate::domain::repository::{FileStore, UserRepository};
use crate::domain::types::{Folder, User};
use crate::error::MessagingError;

// ── GetProfile ───────────────────────────────────────────────────────────────

pub struct GetProfileUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> GetProfileUseCase<U> {
    pub async fn execute(&self, user_id: Uuid) -> Result<User, MessagingError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("User not found"))
    }
}

// ── UpdateProfile ────────────────────────────────────────────────────────────

pub struct UpdateProfileInput {
    pub fullname: Option<String>,
    pub phone: Option<String>,
    /// Temporary-file reference from a prior upload, not a final path.
    pub avatar: Option<String>,
}

pub struct UpdateProfileUseCase<U, F>
where
    U: UserRepository,
    F: FileStore,
{
    pub users: U,
    pub files: F,
}

impl<U, F> UpdateProfileUseCase<U, F>
where
    U: UserRepository,
    F: FileStore,
{
    /// Partial update; empty strings count as absent. A new avatar is moved
    /// out of temporary storage and the previous file is deleted best-effort.
    pub async fn execute(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<User, MessagingError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("User not found"))?;

        let fullname = input.fullname.filter(|s| !s.is_empty());
        let phone = input.phone.filter(|s| !s.is_empty());
        let avatar = match input.avatar.filter(|s| !s.is_empty()) {
            Some(reference) => Some(
                self.files
                    .move_from_temporary_replacing(&reference, Folder::User, user.avatar.as_deref())
                    .await?,
            ),
            None => None,
        };

        self.users
            .update_profile(
                user_id,
                fullname.as_deref(),
                phone.as_deref(),
                avatar.as_deref(),
            )
            .await
    }
}
