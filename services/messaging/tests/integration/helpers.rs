use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use courier_messaging::domain::repository::{
    ConversationRepository, FileStore, Mailer, MessageRepository, Notifier, UserRepository,
    VerificationCodeRepository,
};
use courier_messaging::domain::types::{
    Conversation, ConversationDetail, ConversationRow, Folder, Message, MessageMedia,
    MessageWithMedia, User, VerificationCode,
};
use courier_messaging::error::MessagingError;

pub fn test_user(email: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::now_v7(),
        fullname: email.to_owned(),
        email: email.to_owned(),
        phone: None,
        avatar: None,
        is_active: false,
        last_active_at: now,
        created_at: now,
        updated_at: now,
    }
}

pub fn test_message(conversation_id: Uuid, sender_id: Uuid, content: &str) -> MessageWithMedia {
    MessageWithMedia {
        message: Message {
            id: Uuid::now_v7(),
            conversation_id,
            user_id: sender_id,
            content: Some(content.to_owned()),
            is_seen: false,
            created_at: Utc::now(),
        },
        media: vec![],
    }
}

// ── MockUserRepo ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockUserRepo {
    pub users: Arc<Mutex<Vec<User>>>,
}

impl MockUserRepo {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn users_handle(&self) -> Arc<Mutex<Vec<User>>> {
        Arc::clone(&self.users)
    }
}

impl UserRepository for MockUserRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, MessagingError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, MessagingError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<(), MessagingError> {
        self.users.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        fullname: Option<&str>,
        phone: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, MessagingError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| MessagingError::not_found("User not found"))?;
        if let Some(fullname) = fullname {
            user.fullname = fullname.to_owned();
        }
        if let Some(phone) = phone {
            user.phone = Some(phone.to_owned());
        }
        if let Some(avatar) = avatar {
            user.avatar = Some(avatar.to_owned());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_presence(
        &self,
        id: Uuid,
        is_active: bool,
        last_active_at: DateTime<Utc>,
    ) -> Result<Option<User>, MessagingError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.is_active = is_active;
        user.last_active_at = last_active_at;
        Ok(Some(user.clone()))
    }

    async fn list_active_except(&self, user_id: Uuid) -> Result<Vec<User>, MessagingError> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.is_active && u.id != user_id)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.last_active_at);
        Ok(users)
    }
}

// ── MockVerificationCodeRepo ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockVerificationCodeRepo {
    pub codes: Arc<Mutex<HashMap<Uuid, VerificationCode>>>,
}

impl MockVerificationCodeRepo {
    pub fn empty() -> Self {
        Self {
            codes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_code(user_id: Uuid, code: &str, expires_at: DateTime<Utc>) -> Self {
        let repo = Self::empty();
        repo.codes.lock().unwrap().insert(
            user_id,
            VerificationCode {
                user_id,
                code: code.to_owned(),
                expires_at,
            },
        );
        repo
    }

    pub fn codes_handle(&self) -> Arc<Mutex<HashMap<Uuid, VerificationCode>>> {
        Arc::clone(&self.codes)
    }
}

impl VerificationCodeRepository for MockVerificationCodeRepo {
    async fn upsert(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), MessagingError> {
        self.codes.lock().unwrap().insert(
            user_id,
            VerificationCode {
                user_id,
                code: code.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn find_current(
        &self,
        user_id: Uuid,
    ) -> Result<Option<VerificationCode>, MessagingError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .get(&user_id)
            .filter(|code| code.expires_at > Utc::now())
            .cloned())
    }
}

// ── MockMailer ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockMailer {
    /// (recipient, code) pairs, in send order.
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn sent_handle(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.sent)
    }
}

impl Mailer for MockMailer {
    async fn send_sign_in_code(
        &self,
        to: &str,
        code: &str,
        _expires_in_minutes: i64,
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((to.to_owned(), code.to_owned()));
        Ok(())
    }
}

// ── MockConversationRepo ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockConversationRepo {
    pub conversations: Arc<Mutex<Vec<Conversation>>>,
    /// (conversation_id, user_id) join rows.
    pub members: Arc<Mutex<Vec<(Uuid, Uuid)>>>,
    /// Shared with [`MockMessageRepo`] so unread counts see created messages.
    pub messages: Arc<Mutex<Vec<MessageWithMedia>>>,
    /// Known users, for search matching on the other members.
    pub profiles: Arc<Mutex<Vec<User>>>,
}

impl MockConversationRepo {
    pub fn empty() -> Self {
        Self {
            conversations: Arc::new(Mutex::new(vec![])),
            members: Arc::new(Mutex::new(vec![])),
            messages: Arc::new(Mutex::new(vec![])),
            profiles: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Seed an existing conversation between two users.
    pub fn seed_pair(&self, user_a: Uuid, user_b: Uuid) -> Uuid {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
        };
        let id = conversation.id;
        self.conversations.lock().unwrap().push(conversation);
        let mut members = self.members.lock().unwrap();
        members.push((id, user_a));
        members.push((id, user_b));
        id
    }
}

impl ConversationRepository for MockConversationRepo {
    async fn find_shared(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Conversation>, MessagingError> {
        let members = self.members.lock().unwrap();
        let conversations = self.conversations.lock().unwrap();
        let found = conversations.iter().find(|c| {
            let matching = members
                .iter()
                .filter(|(cid, uid)| *cid == c.id && (*uid == user_a || *uid == user_b))
                .count();
            matching >= 2
        });
        Ok(found.cloned())
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
        self.conversations.lock().unwrap().push(conversation.clone());
        let mut members = self.members.lock().unwrap();
        members.push((conversation.id, user_a));
        members.push((conversation.id, user_b));
        Ok(conversation)
    }

    async fn is_member(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, MessagingError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .any(|(cid, uid)| *cid == conversation_id && *uid == user_id))
    }

    async fn find_for_member(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationDetail>, MessagingError> {
        if !self.is_member(conversation_id, user_id).await? {
            return Ok(None);
        }
        let conversation = self
            .conversations
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned();
        Ok(conversation.map(|conversation| ConversationDetail {
            conversation,
            member: None,
        }))
    }

    async fn other_member_ids(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, MessagingError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|(cid, uid)| *cid == conversation_id && *uid != user_id)
            .map(|(_, uid)| *uid)
            .collect())
    }

    async fn list_page(
        &self,
        user_id: Uuid,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<(u64, Vec<ConversationRow>), MessagingError> {
        let members = self.members.lock().unwrap().clone();
        let conversations = self.conversations.lock().unwrap().clone();
        let messages = self.messages.lock().unwrap().clone();
        let profiles = self.profiles.lock().unwrap().clone();

        let mut rows: Vec<ConversationRow> = conversations
            .into_iter()
            .filter(|c| {
                members
                    .iter()
                    .any(|(cid, uid)| *cid == c.id && *uid == user_id)
            })
            .filter(|c| match search {
                Some(term) if !term.is_empty() => {
                    // Matches only on the *other* members, never the requester.
                    let term = term.to_lowercase();
                    members
                        .iter()
                        .filter(|(cid, uid)| *cid == c.id && *uid != user_id)
                        .filter_map(|(_, uid)| profiles.iter().find(|p| p.id == *uid))
                        .any(|p| {
                            p.fullname.to_lowercase().contains(&term)
                                || p.email.to_lowercase().contains(&term)
                        })
                }
                _ => true,
            })
            .map(|conversation| {
                let last_message = messages
                    .iter()
                    .filter(|m| m.message.conversation_id == conversation.id)
                    .max_by_key(|m| m.message.created_at)
                    .cloned();
                ConversationRow {
                    conversation,
                    member: None,
                    last_message,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            let at = a.last_message.as_ref().map(|m| m.message.created_at);
            let bt = b.last_message.as_ref().map(|m| m.message.created_at);
            match (at, bt) {
                (Some(x), Some(y)) => y
                    .cmp(&x)
                    .then_with(|| b.conversation.id.cmp(&a.conversation.id)),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => b.conversation.id.cmp(&a.conversation.id),
            }
        });

        let count = rows.len() as u64;
        let page = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((count, page))
    }

    async fn unread_counts(
        &self,
        conversation_ids: &[Uuid],
        excluding_user: Uuid,
    ) -> Result<HashMap<Uuid, u64>, MessagingError> {
        let messages = self.messages.lock().unwrap();
        let mut counts = HashMap::new();
        for m in messages.iter() {
            if conversation_ids.contains(&m.message.conversation_id)
                && m.message.user_id != excluding_user
                && !m.message.is_seen
            {
                *counts.entry(m.message.conversation_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn total_unread(&self, user_id: Uuid) -> Result<u64, MessagingError> {
        let members = self.members.lock().unwrap();
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .filter(|m| {
                members
                    .iter()
                    .any(|(cid, uid)| *cid == m.message.conversation_id && *uid == user_id)
                    && m.message.user_id != user_id
                    && !m.message.is_seen
            })
            .count() as u64)
    }
}

// ── MockMessageRepo ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockMessageRepo {
    pub messages: Arc<Mutex<Vec<MessageWithMedia>>>,
}

impl MockMessageRepo {
    pub fn empty() -> Self {
        Self {
            messages: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Share the message store with a conversation repo so unread counts and
    /// listings observe the same rows.
    pub fn sharing(messages: Arc<Mutex<Vec<MessageWithMedia>>>) -> Self {
        Self { messages }
    }

    pub fn messages_handle(&self) -> Arc<Mutex<Vec<MessageWithMedia>>> {
        Arc::clone(&self.messages)
    }
}

impl MessageRepository for MockMessageRepo {
    async fn create_with_media<F, Fut>(
        &self,
        message: &Message,
        relocate: F,
    ) -> Result<Vec<MessageMedia>, MessagingError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<String>, MessagingError>> + Send,
    {
        // Mirrors the transaction: a relocation error means nothing persists.
        let srcs = relocate().await?;
        let now = Utc::now();
        let media: Vec<MessageMedia> = srcs
            .into_iter()
            .map(|src| MessageMedia {
                id: Uuid::now_v7(),
                message_id: message.id,
                src,
                created_at: now,
            })
            .collect();
        self.messages.lock().unwrap().push(MessageWithMedia {
            message: message.clone(),
            media: media.clone(),
        });
        Ok(media)
    }

    async fn mark_seen_from_others(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, MessagingError> {
        let mut messages = self.messages.lock().unwrap();
        let mut flipped = 0;
        for m in messages.iter_mut() {
            if m.message.conversation_id == conversation_id
                && m.message.user_id != reader_id
                && !m.message.is_seen
            {
                m.message.is_seen = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn list_page(
        &self,
        conversation_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(u64, Vec<MessageWithMedia>), MessagingError> {
        let mut rows: Vec<MessageWithMedia> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.message.conversation_id == conversation_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.message.created_at.cmp(&a.message.created_at));
        let count = rows.len() as u64;
        let page = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((count, page))
    }
}

// ── MockFileStore ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockFileStore {
    /// File names currently in temporary storage.
    pub temporary: Arc<Mutex<Vec<String>>>,
    /// Relative paths of relocated files.
    pub moved: Arc<Mutex<Vec<String>>>,
    /// Paths deleted by replacing moves.
    pub deleted: Arc<Mutex<Vec<String>>>,
}

impl MockFileStore {
    pub fn with_temporary(names: &[&str]) -> Self {
        Self {
            temporary: Arc::new(Mutex::new(names.iter().map(|s| s.to_string()).collect())),
            moved: Arc::new(Mutex::new(vec![])),
            deleted: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn empty() -> Self {
        Self::with_temporary(&[])
    }

    fn take_from_temporary(
        &self,
        file_name: &str,
        destination: Folder,
    ) -> Result<String, MessagingError> {
        let mut temporary = self.temporary.lock().unwrap();
        let Some(pos) = temporary.iter().position(|name| name == file_name) else {
            return Err(MessagingError::bad_request(format!(
                "Source file does not exist: {file_name}"
            )));
        };
        temporary.remove(pos);
        let path = format!("{}/{}", destination.name(), file_name);
        self.moved.lock().unwrap().push(path.clone());
        Ok(path)
    }
}

impl FileStore for MockFileStore {
    async fn move_from_temporary(
        &self,
        file_name: &str,
        destination: Folder,
    ) -> Result<String, MessagingError> {
        self.take_from_temporary(file_name, destination)
    }

    async fn move_from_temporary_replacing(
        &self,
        file_name: &str,
        destination: Folder,
        old_path: Option<&str>,
    ) -> Result<String, MessagingError> {
        let path = self.take_from_temporary(file_name, destination)?;
        if let Some(old_path) = old_path {
            self.deleted.lock().unwrap().push(old_path.to_owned());
        }
        Ok(path)
    }
}

// ── MockNotifier ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockNotifier {
    /// (target user, event name, payload) per send, in order.
    pub events: Arc<Mutex<Vec<(Uuid, String, serde_json::Value)>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn events_handle(&self) -> Arc<Mutex<Vec<(Uuid, String, serde_json::Value)>>> {
        Arc::clone(&self.events)
    }
}

impl Notifier for MockNotifier {
    fn send_to_user(&self, user_id: Uuid, event: &str, payload: serde_json::Value) {
        self.events
            .lock()
            .unwrap()
            .push((user_id, event.to_owned(), payload));
    }

    fn broadcast(&self, _event: &str, _payload: serde_json::Value) {}
}
