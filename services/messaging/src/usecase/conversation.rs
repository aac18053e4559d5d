use uuid::Uuid;

use courier_domain::pagination::{Paginated, Pagination};

use crate::domain::repository::{ConversationRepository, UserRepository};
use crate::domain::types::{Conversation, ConversationDetail, ConversationOverview, User};
use crate::error::MessagingError;

// ── LoadConversation ─────────────────────────────────────────────────────────

pub struct LoadConversationUseCase<C: ConversationRepository> {
    pub conversations: C,
}

impl<C: ConversationRepository> LoadConversationUseCase<C> {
    /// Return the conversation shared by the two users, creating it (plus
    /// both member rows, atomically) on first contact.
    pub async fn execute(
        &self,
        from_user_id: Uuid,
        to_user_id: Uuid,
    ) -> Result<Conversation, MessagingError> {
        if from_user_id == to_user_id {
            return Err(MessagingError::bad_request(
                "Unable to create a conversation with yourself",
            ));
        }

        if let Some(existing) = self
            .conversations
            .find_shared(from_user_id, to_user_id)
            .await?
        {
            return Ok(existing);
        }

        self.conversations
            .create_with_members(from_user_id, to_user_id)
            .await
    }
}

// ── ListConversations ────────────────────────────────────────────────────────

pub struct ListConversationsInput {
    pub pagination: Pagination,
    pub search: Option<String>,
}

pub struct ListConversationsOutput {
    pub conversations: Paginated<ConversationOverview>,
    pub total_unread_count: u64,
}

pub struct ListConversationsUseCase<C: ConversationRepository> {
    pub conversations: C,
}

impl<C: ConversationRepository> ListConversationsUseCase<C> {
    /// One page of the requester's conversations, each annotated with the
    /// other member, the latest message, and an unread count; plus the
    /// unread total across all of them.
    pub async fn execute(
        &self,
        user_id: Uuid,
        input: ListConversationsInput,
    ) -> Result<ListConversationsOutput, MessagingError> {
        let pagination = input.pagination.clamped();
        let (count, rows) = self
            .conversations
            .list_page(
                user_id,
                input.search.as_deref(),
                pagination.limit,
                pagination.offset(),
            )
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.conversation.id).collect();
        let unread = self.conversations.unread_counts(&ids, user_id).await?;

        let overviews = rows
            .into_iter()
            .map(|row| {
                let unread_count = unread.get(&row.conversation.id).copied().unwrap_or(0);
                ConversationOverview::from_row(row, unread_count)
            })
            .collect();

        let total_unread_count = self.conversations.total_unread(user_id).await?;

        Ok(ListConversationsOutput {
            conversations: Paginated::new(count, overviews, pagination),
            total_unread_count,
        })
    }
}

// ── GetConversation ──────────────────────────────────────────────────────────

pub struct GetConversationUseCase<C: ConversationRepository> {
    pub conversations: C,
}

impl<C: ConversationRepository> GetConversationUseCase<C> {
    /// Member-scoped fetch: a conversation the requester does not belong to
    /// is indistinguishable from a missing one.
    pub async fn execute(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<ConversationDetail, MessagingError> {
        self.conversations
            .find_for_member(conversation_id, user_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("Data not found"))
    }
}

// ── GetOnlineUsers ───────────────────────────────────────────────────────────

pub struct GetOnlineUsersUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> GetOnlineUsersUseCase<U> {
    /// The online roster: every active user except the requester, longest
    /// idle first.
    pub async fn execute(&self, user_id: Uuid) -> Result<Vec<User>, MessagingError> {
        self.users.list_active_except(user_id).await
    }
}
