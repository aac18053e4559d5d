#![allow(async_fn_in_trait)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{
    Conversation, ConversationDetail, ConversationRow, Folder, Message, MessageMedia,
    MessageWithMedia, User, VerificationCode,
};
use crate::error::MessagingError;

/// Repository for user accounts and presence state.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, MessagingError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, MessagingError>;

    async fn create(&self, user: &User) -> Result<(), MessagingError>;

    /// Partial profile update; `None` fields are left untouched. Returns the
    /// updated row.
    async fn update_profile(
        &self,
        id: Uuid,
        fullname: Option<&str>,
        phone: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, MessagingError>;

    /// Flip the active flag and stamp last_active_at. Returns the updated
    /// row, or `None` if the user vanished.
    async fn set_presence(
        &self,
        id: Uuid,
        is_active: bool,
        last_active_at: DateTime<Utc>,
    ) -> Result<Option<User>, MessagingError>;

    /// All active users except `user_id`, ordered by last_active_at ascending.
    async fn list_active_except(&self, user_id: Uuid) -> Result<Vec<User>, MessagingError>;
}

/// Repository for one-time sign-in codes (one row per user, upserted).
pub trait VerificationCodeRepository: Send + Sync {
    async fn upsert(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), MessagingError>;

    /// The user's code if one exists and has not expired.
    async fn find_current(&self, user_id: Uuid)
    -> Result<Option<VerificationCode>, MessagingError>;
}

/// Repository for conversations and their membership.
pub trait ConversationRepository: Send + Sync {
    /// A conversation already containing both users, if any (members grouped
    /// by conversation, at least two rows matching the pair).
    async fn find_shared(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Conversation>, MessagingError>;

    /// Create a conversation plus both member rows in one transaction.
    async fn create_with_members(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Conversation, MessagingError>;

    async fn is_member(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, MessagingError>;

    /// The conversation scoped to a member, with the other member's profile.
    async fn find_for_member(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationDetail>, MessagingError>;

    /// User ids of every member except `user_id` — the fan-out targets.
    async fn other_member_ids(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, MessagingError>;

    /// One page of the member's conversations with the other member's profile
    /// and the latest message, ordered by most recent message descending
    /// (empty conversations last), then id descending. `search` filters on
    /// the other members' fullname (diacritic-insensitive) or email.
    /// Returns the total row count alongside the page.
    async fn list_page(
        &self,
        user_id: Uuid,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<(u64, Vec<ConversationRow>), MessagingError>;

    /// Unseen-message counts per conversation, excluding the reader's own
    /// messages.
    async fn unread_counts(
        &self,
        conversation_ids: &[Uuid],
        excluding_user: Uuid,
    ) -> Result<HashMap<Uuid, u64>, MessagingError>;

    /// Unseen messages addressed to the user across all their conversations.
    async fn total_unread(&self, user_id: Uuid) -> Result<u64, MessagingError>;
}

/// Repository for messages and their media attachments.
pub trait MessageRepository: Send + Sync {
    /// Insert the message row, run `relocate` to move the attached files out
    /// of temporary storage, then insert a media row per returned path — all
    /// inside one transaction. A relocation error rolls the whole thing back,
    /// so the message row never outlives a failed move.
    async fn create_with_media<F, Fut>(
        &self,
        message: &Message,
        relocate: F,
    ) -> Result<Vec<MessageMedia>, MessagingError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<String>, MessagingError>> + Send;

    /// Flag every unseen message from other members as seen. Returns the
    /// number of rows flipped.
    async fn mark_seen_from_others(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, MessagingError>;

    /// One page of the conversation's messages with media, newest first.
    /// Returns the total message count alongside the page.
    async fn list_page(
        &self,
        conversation_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(u64, Vec<MessageWithMedia>), MessagingError>;
}

/// Port for moving validated files between storage folders.
///
/// Declared with explicit `impl Future + Send` (not `async fn`) — the
/// relocation step runs inside the message-creation transaction closure,
/// which must stay `Send` for generic callers.
pub trait FileStore: Send + Sync {
    /// Move a previously uploaded temporary file into `destination`,
    /// returning the new path relative to the client root.
    fn move_from_temporary(
        &self,
        file_name: &str,
        destination: Folder,
    ) -> impl Future<Output = Result<String, MessagingError>> + Send;

    /// As [`move_from_temporary`](Self::move_from_temporary), then delete the
    /// replaced file best-effort (failures are logged, not returned).
    fn move_from_temporary_replacing(
        &self,
        file_name: &str,
        destination: Folder,
        old_path: Option<&str>,
    ) -> impl Future<Output = Result<String, MessagingError>> + Send;
}

/// Port for outbound mail. Callers dispatch through `spawn_logged`; errors
/// here never fail the triggering request. Declared with explicit
/// `impl Future + Send` so the send can run on a detached task.
pub trait Mailer: Send + Sync {
    fn send_sign_in_code(
        &self,
        to: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Port for pushing real-time events to connection groups. Sends are
/// fire-and-forget; a missing or dead group is not an error.
pub trait Notifier: Send + Sync {
    fn send_to_user(&self, user_id: Uuid, event: &str, payload: serde_json::Value);

    fn broadcast(&self, event: &str, payload: serde_json::Value);
}
