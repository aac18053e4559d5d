use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use courier_domain::pagination::{Paginated, Pagination};

use crate::domain::repository::{
    ConversationRepository, FileStore, MessageRepository, Notifier,
};
use crate::domain::types::{Folder, Message, MessageWithMedia};
use crate::error::MessagingError;
use crate::hub::{EVENT_MESSAGE_RECEIVED, EVENT_MESSAGE_SEEN};
use crate::response::reply;

async fn ensure_member<C: ConversationRepository>(
    conversations: &C,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<(), MessagingError> {
    if conversations.is_member(conversation_id, user_id).await? {
        Ok(())
    } else {
        Err(MessagingError::bad_request("You are not in the conversation"))
    }
}

/// Wire shape of a message, shared by HTTP responses and hub payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub content: Option<String>,
    pub is_seen: bool,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    pub media: Vec<MessageMediaResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMediaResponse {
    pub id: String,
    pub src: String,
}

impl From<MessageWithMedia> for MessageResponse {
    fn from(row: MessageWithMedia) -> Self {
        Self {
            id: row.message.id.to_string(),
            conversation_id: row.message.conversation_id.to_string(),
            user_id: row.message.user_id.to_string(),
            content: row.message.content,
            is_seen: row.message.is_seen,
            created_at: row.message.created_at,
            media: row
                .media
                .into_iter()
                .map(|media| MessageMediaResponse {
                    id: media.id.to_string(),
                    src: media.src,
                })
                .collect(),
        }
    }
}

// ── GetMessages ──────────────────────────────────────────────────────────────

pub struct GetMessagesUseCase<C, M, N>
where
    C: ConversationRepository,
    M: MessageRepository,
    N: Notifier,
{
    pub conversations: C,
    pub messages: M,
    pub notifier: N,
}

impl<C, M, N> GetMessagesUseCase<C, M, N>
where
    C: ConversationRepository,
    M: MessageRepository,
    N: Notifier,
{
    /// Read a page of messages, newest first. Reading acknowledges: every
    /// unseen message from the other members flips to seen and their groups
    /// get a `messageSeen` event, on every call.
    pub async fn execute(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        pagination: Pagination,
    ) -> Result<Paginated<MessageWithMedia>, MessagingError> {
        ensure_member(&self.conversations, conversation_id, user_id).await?;

        self.messages
            .mark_seen_from_others(conversation_id, user_id)
            .await?;

        let payload = serde_json::to_value(reply::success("", ""))
            .context("serialize messageSeen payload")?;
        for member_id in self
            .conversations
            .other_member_ids(conversation_id, user_id)
            .await?
        {
            self.notifier
                .send_to_user(member_id, EVENT_MESSAGE_SEEN, payload.clone());
        }

        let pagination = pagination.clamped();
        let (count, rows) = self
            .messages
            .list_page(conversation_id, pagination.limit, pagination.offset())
            .await?;
        Ok(Paginated::new(count, rows, pagination))
    }
}

// ── CreateMessage ────────────────────────────────────────────────────────────

/// Relocate every referenced upload out of temporary storage, returning the
/// new client-relative paths in order. Written as a free `async fn` (rather
/// than an inline async block) so the borrow of `files` is expressed through a
/// named signature — the inline-closure form trips higher-ranked lifetime
/// inference under the `FnOnce() -> Fut + Send` bound.
async fn relocate_media<F: FileStore>(
    files: F,
    references: Vec<MediaReference>,
) -> Result<Vec<String>, MessagingError> {
    let mut srcs = Vec::with_capacity(references.len());
    for reference in &references {
        srcs.push(
            files
                .move_from_temporary(&reference.src, Folder::MessageMedia)
                .await?,
        );
    }
    Ok(srcs)
}

pub struct MediaReference {
    /// Temporary-file name returned by the upload endpoint.
    pub src: String,
}

pub struct CreateMessageInput {
    pub content: Option<String>,
    pub media: Vec<MediaReference>,
}

pub struct CreateMessageUseCase<C, M, F, N>
where
    C: ConversationRepository,
    M: MessageRepository,
    F: FileStore,
    N: Notifier,
{
    pub conversations: C,
    pub messages: M,
    pub files: F,
    pub notifier: N,
}

impl<C, M, F, N> CreateMessageUseCase<C, M, F, N>
where
    C: ConversationRepository,
    M: MessageRepository,
    F: FileStore + Clone,
    N: Notifier,
{
    /// Persist a message with its media. The message row goes in first, then
    /// each referenced file is relocated out of temporary storage, then the
    /// media rows — one transaction, so a failed relocation leaves no
    /// message behind. Every other member's group gets the full message as
    /// a `messageReceived` event.
    pub async fn execute(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        input: CreateMessageInput,
    ) -> Result<MessageWithMedia, MessagingError> {
        ensure_member(&self.conversations, conversation_id, user_id).await?;

        let message = Message {
            id: Uuid::now_v7(),
            conversation_id,
            user_id,
            content: input.content.filter(|s| !s.is_empty()),
            is_seen: false,
            created_at: Utc::now(),
        };

        // Own the file-store handle inside the relocation future (rather than
        // borrowing `self.files`): a future borrowing the environment cannot
        // satisfy the `FnOnce() -> Fut + Send` bound once the enclosing handler
        // future must be `Send`. `LocalFileStore` is a cheap clonable handle.
        let files = self.files.clone();
        let references = input.media;
        let media = self
            .messages
            .create_with_media(&message, move || relocate_media(files, references))
            .await?;

        let created = MessageWithMedia { message, media };

        let payload = serde_json::to_value(reply::success(
            "",
            MessageResponse::from(created.clone()),
        ))
        .context("serialize messageReceived payload")?;
        for member_id in self
            .conversations
            .other_member_ids(conversation_id, user_id)
            .await?
        {
            self.notifier
                .send_to_user(member_id, EVENT_MESSAGE_RECEIVED, payload.clone());
        }

        Ok(created)
    }
}
