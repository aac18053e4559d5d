use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use courier_auth_types::bearer::Identity;
use courier_domain::pagination::{Paginated, Pagination};

use crate::domain::types::{Conversation, ConversationOverview, MemberProfile, User};
use crate::error::MessagingError;
use crate::response::{Reply, reply};
use crate::state::AppState;
use crate::usecase::conversation::{
    GetConversationUseCase, GetOnlineUsersUseCase, ListConversationsInput,
    ListConversationsUseCase, LoadConversationUseCase,
};
use crate::usecase::message::{
    CreateMessageInput, CreateMessageUseCase, GetMessagesUseCase, MediaReference, MessageResponse,
};

fn parse_user_id(raw: &str) -> Result<Uuid, MessagingError> {
    raw.parse().map_err(|_| {
        let mut errors = BTreeMap::new();
        errors.insert("userId".to_owned(), "must be a valid user id".to_owned());
        MessagingError::Validation(errors)
    })
}

fn parse_conversation_id(raw: &str) -> Result<Uuid, MessagingError> {
    raw.parse().map_err(|_| {
        let mut errors = BTreeMap::new();
        errors.insert(
            "conversationId".to_owned(),
            "must be a valid conversation id".to_owned(),
        );
        MessagingError::Validation(errors)
    })
}

fn pagination_from(limit: Option<u64>, page: Option<u64>) -> Pagination {
    // Zero and absent both fall back to the defaults via clamping.
    Pagination {
        limit: limit.unwrap_or(0),
        page: page.unwrap_or(0),
    }
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfileResponse {
    pub user_id: String,
    pub fullname: String,
    pub email: String,
    pub avatar: Option<String>,
    pub is_active: bool,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub last_active_at: chrono::DateTime<chrono::Utc>,
}

impl From<MemberProfile> for MemberProfileResponse {
    fn from(member: MemberProfile) -> Self {
        Self {
            user_id: member.user_id.to_string(),
            fullname: member.fullname,
            email: member.email,
            avatar: member.avatar,
            is_active: member.is_active,
            last_active_at: member.last_active_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: String,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberProfileResponse>,
}

impl ConversationResponse {
    fn bare(conversation: Conversation) -> Self {
        Self {
            id: conversation.id.to_string(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            member: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationOverviewResponse {
    pub id: String,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub member: Option<MemberProfileResponse>,
    pub last_message: Option<MessageResponse>,
    pub unread_count: u64,
}

impl From<ConversationOverview> for ConversationOverviewResponse {
    fn from(overview: ConversationOverview) -> Self {
        Self {
            id: overview.conversation.id.to_string(),
            created_at: overview.conversation.created_at,
            member: overview.member.map(MemberProfileResponse::from),
            last_message: overview.last_message.map(MessageResponse::from),
            unread_count: overview.unread_count,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationListResponse {
    pub count: u64,
    pub rows: Vec<ConversationOverviewResponse>,
    pub limit: u64,
    pub page: u64,
    pub total_unread_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUserResponse {
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub avatar: Option<String>,
    pub is_active: bool,
    #[serde(serialize_with = "courier_core::serde::to_rfc3339_ms")]
    pub last_active_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for OnlineUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            fullname: user.fullname,
            email: user.email,
            avatar: user.avatar,
            is_active: user.is_active,
            last_active_at: user.last_active_at,
        }
    }
}

// ── GET /conversation/online-users ───────────────────────────────────────────

pub async fn get_online_users(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<Reply<Vec<OnlineUserResponse>>>, MessagingError> {
    let usecase = GetOnlineUsersUseCase {
        users: state.user_repo(),
    };
    let users = usecase.execute(identity.user_id).await?;
    Ok(Json(reply::success(
        "",
        users.into_iter().map(OnlineUserResponse::from).collect(),
    )))
}

// ── POST /conversation/load ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadConversationRequest {
    #[serde(default)]
    pub user_id: String,
}

pub async fn load_conversation(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<LoadConversationRequest>,
) -> Result<Json<Reply<ConversationResponse>>, MessagingError> {
    let to_user_id = parse_user_id(&body.user_id)?;
    let usecase = LoadConversationUseCase {
        conversations: state.conversation_repo(),
    };
    let conversation = usecase.execute(identity.user_id, to_user_id).await?;
    Ok(Json(reply::success(
        "",
        ConversationResponse::bare(conversation),
    )))
}

// ── GET /conversation ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GetConversationsQuery {
    pub limit: Option<u64>,
    pub page: Option<u64>,
    pub search: Option<String>,
}

pub async fn get_conversations(
    identity: Identity,
    State(state): State<AppState>,
    Query(query): Query<GetConversationsQuery>,
) -> Result<Json<Reply<ConversationListResponse>>, MessagingError> {
    let usecase = ListConversationsUseCase {
        conversations: state.conversation_repo(),
    };
    let output = usecase
        .execute(
            identity.user_id,
            ListConversationsInput {
                pagination: pagination_from(query.limit, query.page),
                search: query.search,
            },
        )
        .await?;

    let page = output.conversations;
    Ok(Json(reply::success(
        "",
        ConversationListResponse {
            count: page.count,
            rows: page
                .rows
                .into_iter()
                .map(ConversationOverviewResponse::from)
                .collect(),
            limit: page.limit,
            page: page.page,
            total_unread_count: output.total_unread_count,
        },
    )))
}

// ── GET /conversation/{conversation_id} ──────────────────────────────────────

pub async fn get_conversation(
    identity: Identity,
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Reply<ConversationResponse>>, MessagingError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;
    let usecase = GetConversationUseCase {
        conversations: state.conversation_repo(),
    };
    let detail = usecase.execute(identity.user_id, conversation_id).await?;
    Ok(Json(reply::success(
        "",
        ConversationResponse {
            id: detail.conversation.id.to_string(),
            created_at: detail.conversation.created_at,
            updated_at: detail.conversation.updated_at,
            member: detail.member.map(MemberProfileResponse::from),
        },
    )))
}

// ── GET /conversation/{conversation_id}/message ──────────────────────────────

#[derive(Deserialize)]
pub struct GetMessagesQuery {
    pub limit: Option<u64>,
    pub page: Option<u64>,
}

pub async fn get_messages(
    identity: Identity,
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<GetMessagesQuery>,
) -> Result<Json<Reply<Paginated<MessageResponse>>>, MessagingError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;
    let usecase = GetMessagesUseCase {
        conversations: state.conversation_repo(),
        messages: state.message_repo(),
        notifier: state.hub.clone(),
    };
    let page = usecase
        .execute(
            identity.user_id,
            conversation_id,
            pagination_from(query.limit, query.page),
        )
        .await?;
    Ok(Json(reply::success("", page.map(MessageResponse::from))))
}

// ── POST /conversation/{conversation_id}/message ─────────────────────────────

#[derive(Deserialize)]
pub struct CreateMessageRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaRefRequest>,
}

#[derive(Deserialize)]
pub struct MediaRefRequest {
    pub src: String,
}

#[axum::debug_handler]
pub async fn create_message(
    identity: Identity,
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<CreateMessageRequest>,
) -> Result<Json<Reply<MessageResponse>>, MessagingError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;
    let usecase = CreateMessageUseCase {
        conversations: state.conversation_repo(),
        messages: state.message_repo(),
        files: state.files.clone(),
        notifier: state.hub.clone(),
    };
    let created = usecase
        .execute(
            identity.user_id,
            conversation_id,
            CreateMessageInput {
                content: body.content,
                media: body
                    .media
                    .into_iter()
                    .map(|media| MediaReference { src: media.src })
                    .collect(),
            },
        )
        .await?;
    Ok(Json(reply::success(
        "Create message success",
        MessageResponse::from(created),
    )))
}

#[allow(dead_code)]
fn _assert_create_message_send(s: AppState) {
    use axum::extract::{Path, State};
    use axum::Json;
    fn is_send<T: Send>(_: &T) {}
    let fut = create_message(
        Identity { user_id: Uuid::nil() },
        State(s),
        Path(String::new()),
        Json(CreateMessageRequest { content: None, media: Vec::new() }),
    );
    is_send(&fut);
}
