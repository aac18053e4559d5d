use std::collections::HashMap;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Statement, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use courier_messaging_schema::{
    conversation_members, conversations, message_media, messages, users, verification_codes,
};

use crate::domain::repository::{
    ConversationRepository, MessageRepository, UserRepository, VerificationCodeRepository,
};
use crate::domain::types::{
    Conversation, ConversationDetail, ConversationRow, MemberProfile, Message, MessageMedia,
    MessageWithMedia, User, VerificationCode,
};
use crate::error::MessagingError;

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, MessagingError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, MessagingError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find user by email")?;
        Ok(model.map(user_from_model))
    }

    async fn create(&self, user: &User) -> Result<(), MessagingError> {
        users::ActiveModel {
            id: Set(user.id),
            fullname: Set(user.fullname.clone()),
            email: Set(user.email.clone()),
            phone: Set(user.phone.clone()),
            avatar: Set(user.avatar.clone()),
            is_active: Set(user.is_active),
            last_active_at: Set(user.last_active_at),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
        .insert(&self.db)
        .await
        .context("create user")?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        fullname: Option<&str>,
        phone: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, MessagingError> {
        let mut am = users::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(fullname) = fullname {
            am.fullname = Set(fullname.to_owned());
        }
        if let Some(phone) = phone {
            am.phone = Set(Some(phone.to_owned()));
        }
        if let Some(avatar) = avatar {
            am.avatar = Set(Some(avatar.to_owned()));
        }
        am.updated_at = Set(Utc::now());
        let model = am.update(&self.db).await.context("update user profile")?;
        Ok(user_from_model(model))
    }

    async fn set_presence(
        &self,
        id: Uuid,
        is_active: bool,
        last_active_at: DateTime<Utc>,
    ) -> Result<Option<User>, MessagingError> {
        if users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user for presence update")?
            .is_none()
        {
            return Ok(None);
        }
        let model = users::ActiveModel {
            id: Set(id),
            is_active: Set(is_active),
            last_active_at: Set(last_active_at),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("update user presence")?;
        Ok(Some(user_from_model(model)))
    }

    async fn list_active_except(&self, user_id: Uuid) -> Result<Vec<User>, MessagingError> {
        let models = users::Entity::find()
            .filter(users::Column::IsActive.eq(true))
            .filter(users::Column::Id.ne(user_id))
            .order_by_asc(users::Column::LastActiveAt)
            .all(&self.db)
            .await
            .context("list active users")?;
        Ok(models.into_iter().map(user_from_model).collect())
    }
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        fullname: model.fullname,
        email: model.email,
        phone: model.phone,
        avatar: model.avatar,
        is_active: model.is_active,
        last_active_at: model.last_active_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── Verification code repository ─────────────────────────────────────────────

#[derive(Clone)]
pub struct DbVerificationCodeRepository {
    pub db: DatabaseConnection,
}

impl VerificationCodeRepository for DbVerificationCodeRepository {
    async fn upsert(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), MessagingError> {
        let now = Utc::now();
        let am = verification_codes::ActiveModel {
            user_id: Set(user_id),
            code: Set(code.to_owned()),
            expires_at: Set(expires_at),
            created_at: Set(now),
            updated_at: Set(now),
        };
        verification_codes::Entity::insert(am)
            .on_conflict(
                OnConflict::column(verification_codes::Column::UserId)
                    .update_columns([
                        verification_codes::Column::Code,
                        verification_codes::Column::ExpiresAt,
                        verification_codes::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .context("upsert verification code")?;
        Ok(())
    }

    async fn find_current(
        &self,
        user_id: Uuid,
    ) -> Result<Option<VerificationCode>, MessagingError> {
        let now = Utc::now();
        let model = verification_codes::Entity::find_by_id(user_id)
            .filter(verification_codes::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await
            .context("find current verification code")?;
        Ok(model.map(|m| VerificationCode {
            user_id: m.user_id,
            code: m.code,
            expires_at: m.expires_at,
        }))
    }
}

// ── Conversation repository ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbConversationRepository {
    pub db: DatabaseConnection,
}

/// Escape LIKE metacharacters and wrap the term for substring matching.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Format ids for an `IN (…)` list. The values are server-generated UUIDs,
/// never raw user input.
fn uuid_list(ids: &[Uuid]) -> String {
    ids.iter()
        .map(|id| format!("'{id}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Joins appended to the listing queries when a search term is present:
/// match the *other* members by diacritic-insensitive fullname or email.
const SEARCH_JOIN: &str = r#"
    JOIN conversation_members AS om
        ON om.conversation_id = c.id AND om.user_id <> $1
    JOIN users AS ou
        ON ou.id = om.user_id
        AND (unaccent(lower(ou.fullname)) LIKE unaccent($2) OR lower(ou.email) LIKE $2)
"#;

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct MemberProfileRow {
    conversation_id: Uuid,
    user_id: Uuid,
    fullname: String,
    email: String,
    avatar: Option<String>,
    is_active: bool,
    last_active_at: DateTime<Utc>,
}

#[derive(Debug, FromQueryResult)]
struct UnreadRow {
    conversation_id: Uuid,
    count: i64,
}

impl DbConversationRepository {
    /// Other-member profiles for a set of conversations, keyed by
    /// conversation id.
    async fn member_profiles(
        &self,
        conversation_ids: &[Uuid],
        excluding_user: Uuid,
    ) -> Result<HashMap<Uuid, MemberProfile>, MessagingError> {
        let sql = format!(
            r#"
            SELECT cm.conversation_id, u.id AS user_id, u.fullname, u.email,
                   u.avatar, u.is_active, u.last_active_at
            FROM conversation_members AS cm
            JOIN users AS u ON u.id = cm.user_id
            WHERE cm.user_id <> $1 AND cm.conversation_id IN ({ids})
            "#,
            ids = uuid_list(conversation_ids),
        );
        let rows = MemberProfileRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [excluding_user.into()],
        ))
        .all(&self.db)
        .await
        .context("load conversation member profiles")?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.conversation_id,
                    MemberProfile {
                        user_id: row.user_id,
                        fullname: row.fullname,
                        email: row.email,
                        avatar: row.avatar,
                        is_active: row.is_active,
                        last_active_at: row.last_active_at,
                    },
                )
            })
            .collect())
    }

    /// Most recent message per conversation (with media), keyed by
    /// conversation id.
    async fn latest_messages(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, MessageWithMedia>, MessagingError> {
        let sql = format!(
            r#"
            SELECT DISTINCT ON (conversation_id) *
            FROM messages
            WHERE conversation_id IN ({ids})
            ORDER BY conversation_id, created_at DESC
            "#,
            ids = uuid_list(conversation_ids),
        );
        let models =
            messages::Model::find_by_statement(Statement::from_string(DbBackend::Postgres, sql))
                .all(&self.db)
                .await
                .context("load latest messages")?;

        let message_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut media_by_message = load_media(&self.db, &message_ids).await?;

        Ok(models
            .into_iter()
            .map(|model| {
                let media = media_by_message.remove(&model.id).unwrap_or_default();
                (
                    model.conversation_id,
                    MessageWithMedia {
                        message: message_from_model(model),
                        media,
                    },
                )
            })
            .collect())
    }
}

impl ConversationRepository for DbConversationRepository {
    async fn find_shared(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Conversation>, MessagingError> {
        let sql = r#"
            SELECT c.id, c.created_at, c.updated_at
            FROM conversations AS c
            JOIN conversation_members AS cm ON cm.conversation_id = c.id
            WHERE cm.user_id IN ($1, $2)
            GROUP BY c.id
            HAVING COUNT(cm.user_id) >= 2
            LIMIT 1
        "#;
        let model = conversations::Model::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [user_a.into(), user_b.into()],
        ))
        .one(&self.db)
        .await
        .context("find shared conversation")?;
        Ok(model.map(conversation_from_model))
    }

    async fn create_with_members(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Conversation, MessagingError> {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
        };
        let id = conversation.id;
        self.db
            .transaction::<_, (), sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    conversations::ActiveModel {
                        id: Set(id),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    insert_member(txn, id, user_a, now).await?;
                    insert_member(txn, id, user_b, now).await?;
                    Ok(())
                })
            })
            .await
            .context("create conversation with members")?;
        Ok(conversation)
    }

    async fn is_member(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, MessagingError> {
        let row = conversation_members::Entity::find_by_id((conversation_id, user_id))
            .one(&self.db)
            .await
            .context("check conversation membership")?;
        Ok(row.is_some())
    }

    async fn find_for_member(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationDetail>, MessagingError> {
        if !self.is_member(conversation_id, user_id).await? {
            return Ok(None);
        }
        let Some(model) = conversations::Entity::find_by_id(conversation_id)
            .one(&self.db)
            .await
            .context("find conversation")?
        else {
            return Ok(None);
        };
        let member = self
            .member_profiles(&[conversation_id], user_id)
            .await?
            .remove(&conversation_id);
        Ok(Some(ConversationDetail {
            conversation: conversation_from_model(model),
            member,
        }))
    }

    async fn other_member_ids(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, MessagingError> {
        let ids = conversation_members::Entity::find()
            .select_only()
            .column(conversation_members::Column::UserId)
            .filter(conversation_members::Column::ConversationId.eq(conversation_id))
            .filter(conversation_members::Column::UserId.ne(user_id))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .context("list other conversation members")?;
        Ok(ids)
    }

    async fn list_page(
        &self,
        user_id: Uuid,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<(u64, Vec<ConversationRow>), MessagingError> {
        let mut values: Vec<sea_orm::Value> = vec![user_id.into()];
        let search_join = match search {
            Some(term) if !term.trim().is_empty() => {
                values.push(like_pattern(term.trim()).into());
                SEARCH_JOIN
            }
            _ => "",
        };

        let count_sql = format!(
            r#"
            SELECT COUNT(DISTINCT c.id) AS count
            FROM conversations AS c
            JOIN conversation_members AS me
                ON me.conversation_id = c.id AND me.user_id = $1
            {search_join}
            "#,
        );
        let count = CountRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            count_sql,
            values.clone(),
        ))
        .one(&self.db)
        .await
        .context("count conversations")?
        .map(|row| row.count as u64)
        .unwrap_or(0);

        // Conversations with no messages sort last; ties break on id
        // descending (v7 ids track creation order).
        let limit_param = values.len() + 1;
        let offset_param = values.len() + 2;
        values.push((limit as i64).into());
        values.push((offset as i64).into());
        let page_sql = format!(
            r#"
            SELECT c.id, c.created_at, c.updated_at
            FROM conversations AS c
            JOIN conversation_members AS me
                ON me.conversation_id = c.id AND me.user_id = $1
            {search_join}
            LEFT JOIN messages AS m ON m.conversation_id = c.id
            GROUP BY c.id
            ORDER BY MAX(m.created_at) DESC NULLS LAST, c.id DESC
            LIMIT ${limit_param} OFFSET ${offset_param}
            "#,
        );
        let page = conversations::Model::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            page_sql,
            values,
        ))
        .all(&self.db)
        .await
        .context("list conversations page")?;

        if page.is_empty() {
            return Ok((count, vec![]));
        }

        let ids: Vec<Uuid> = page.iter().map(|c| c.id).collect();
        let mut members = self.member_profiles(&ids, user_id).await?;
        let mut latest = self.latest_messages(&ids).await?;

        let rows = page
            .into_iter()
            .map(|model| ConversationRow {
                member: members.remove(&model.id),
                last_message: latest.remove(&model.id),
                conversation: conversation_from_model(model),
            })
            .collect();
        Ok((count, rows))
    }

    async fn unread_counts(
        &self,
        conversation_ids: &[Uuid],
        excluding_user: Uuid,
    ) -> Result<HashMap<Uuid, u64>, MessagingError> {
        if conversation_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            r#"
            SELECT conversation_id, COUNT(*) AS count
            FROM messages
            WHERE user_id <> $1 AND is_seen = FALSE AND conversation_id IN ({ids})
            GROUP BY conversation_id
            "#,
            ids = uuid_list(conversation_ids),
        );
        let rows = UnreadRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [excluding_user.into()],
        ))
        .all(&self.db)
        .await
        .context("count unread messages per conversation")?;
        Ok(rows
            .into_iter()
            .map(|row| (row.conversation_id, row.count as u64))
            .collect())
    }

    async fn total_unread(&self, user_id: Uuid) -> Result<u64, MessagingError> {
        let sql = r#"
            SELECT COUNT(*) AS count
            FROM messages AS m
            JOIN conversation_members AS cm
                ON cm.conversation_id = m.conversation_id AND cm.user_id = $1
            WHERE m.user_id <> $1 AND m.is_seen = FALSE
        "#;
        let row = CountRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [user_id.into()],
        ))
        .one(&self.db)
        .await
        .context("count total unread messages")?;
        Ok(row.map(|r| r.count as u64).unwrap_or(0))
    }
}

async fn insert_member(
    txn: &DatabaseTransaction,
    conversation_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), sea_orm::DbErr> {
    conversation_members::ActiveModel {
        conversation_id: Set(conversation_id),
        user_id: Set(user_id),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn conversation_from_model(model: conversations::Model) -> Conversation {
    Conversation {
        id: model.id,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── Message repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbMessageRepository {
    pub db: DatabaseConnection,
}

impl MessageRepository for DbMessageRepository {
    async fn create_with_media<F, Fut>(
        &self,
        message: &Message,
        relocate: F,
    ) -> Result<Vec<MessageMedia>, MessagingError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<String>, MessagingError>> + Send,
    {
        // Explicit begin/commit: the relocation side effect runs between the
        // message insert and the media inserts, and an error anywhere must
        // drop the transaction so the message row is rolled back.
        let txn = self.db.begin().await.context("begin message creation")?;

        messages::ActiveModel {
            id: Set(message.id),
            conversation_id: Set(message.conversation_id),
            user_id: Set(message.user_id),
            content: Set(message.content.clone()),
            is_seen: Set(message.is_seen),
            created_at: Set(message.created_at),
            updated_at: Set(message.created_at),
        }
        .insert(&txn)
        .await
        .context("insert message")?;

        let srcs = relocate().await?;

        let now = Utc::now();
        let mut media = Vec::with_capacity(srcs.len());
        for src in srcs {
            let model = message_media::ActiveModel {
                id: Set(Uuid::now_v7()),
                message_id: Set(message.id),
                src: Set(src),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .context("insert message media")?;
            media.push(media_from_model(model));
        }

        txn.commit().await.context("commit message creation")?;
        Ok(media)
    }

    async fn mark_seen_from_others(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, MessagingError> {
        let result = messages::Entity::update_many()
            .col_expr(messages::Column::IsSeen, Expr::value(true))
            .col_expr(messages::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(messages::Column::ConversationId.eq(conversation_id))
            .filter(messages::Column::UserId.ne(reader_id))
            .filter(messages::Column::IsSeen.eq(false))
            .exec(&self.db)
            .await
            .context("mark messages seen")?;
        Ok(result.rows_affected)
    }

    async fn list_page(
        &self,
        conversation_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(u64, Vec<MessageWithMedia>), MessagingError> {
        let filter = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id));

        let count = filter
            .clone()
            .count(&self.db)
            .await
            .context("count messages")?;

        let models = filter
            .order_by_desc(messages::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await
            .context("list messages page")?;

        let message_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut media_by_message = load_media(&self.db, &message_ids).await?;

        let rows = models
            .into_iter()
            .map(|model| {
                let media = media_by_message.remove(&model.id).unwrap_or_default();
                MessageWithMedia {
                    message: message_from_model(model),
                    media,
                }
            })
            .collect();
        Ok((count, rows))
    }
}

async fn load_media(
    db: &DatabaseConnection,
    message_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<MessageMedia>>, MessagingError> {
    if message_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let models = message_media::Entity::find()
        .filter(message_media::Column::MessageId.is_in(message_ids.iter().copied()))
        .order_by_asc(message_media::Column::CreatedAt)
        .all(db)
        .await
        .context("load message media")?;

    let mut by_message: HashMap<Uuid, Vec<MessageMedia>> = HashMap::new();
    for model in models {
        by_message
            .entry(model.message_id)
            .or_default()
            .push(media_from_model(model));
    }
    Ok(by_message)
}

fn message_from_model(model: messages::Model) -> Message {
    Message {
        id: model.id,
        conversation_id: model.conversation_id,
        user_id: model.user_id,
        content: model.content,
        is_seen: model.is_seen,
        created_at: model.created_at,
    }
}

fn media_from_model(model: message_media::Model) -> MessageMedia {
    MessageMedia {
        id: model.id,
        message_id: model.message_id,
        src: model.src,
        created_at: model.created_at,
    }
}
