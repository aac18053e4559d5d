use chrono::{DateTime, Utc};
use rand::RngExt;
use uuid::Uuid;

/// One-time sign-in codes: 6 digits, valid for 5 minutes.
pub const VERIFICATION_CODE_LEN: usize = 6;
pub const VERIFICATION_CODE_TTL_MINUTES: i64 = 5;

const CODE_CHARSET: &[u8] = b"0123456789";

pub fn generate_verification_code() -> String {
    let mut rng = rand::rng();
    (0..VERIFICATION_CODE_LEN)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// User account. Created on first sign-in attempt with fullname = email.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public slice of a user shown to other conversation members.
#[derive(Debug, Clone)]
pub struct MemberProfile {
    pub user_id: Uuid,
    pub fullname: String,
    pub email: String,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub last_active_at: DateTime<Utc>,
}

impl From<User> for MemberProfile {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            fullname: user.fullname,
            email: user.email,
            avatar: user.avatar,
            is_active: user.is_active,
            last_active_at: user.last_active_at,
        }
    }
}

/// A two-party messaging thread.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A conversation plus the other member's public profile.
#[derive(Debug, Clone)]
pub struct ConversationDetail {
    pub conversation: Conversation,
    pub member: Option<MemberProfile>,
}

/// One row of the conversation listing as read from storage: the other
/// member and the most recent message with its media.
#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub conversation: Conversation,
    pub member: Option<MemberProfile>,
    pub last_message: Option<MessageWithMedia>,
}

/// A listing row annotated with the requester's unread count.
#[derive(Debug, Clone)]
pub struct ConversationOverview {
    pub conversation: Conversation,
    pub member: Option<MemberProfile>,
    pub last_message: Option<MessageWithMedia>,
    pub unread_count: u64,
}

impl ConversationOverview {
    pub fn from_row(row: ConversationRow, unread_count: u64) -> Self {
        Self {
            conversation: row.conversation,
            member: row.member,
            last_message: row.last_message,
            unread_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub content: Option<String>,
    pub is_seen: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MessageMedia {
    pub id: Uuid,
    pub message_id: Uuid,
    pub src: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MessageWithMedia {
    pub message: Message,
    pub media: Vec<MessageMedia>,
}

/// One-time sign-in code row; at most one per user.
#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub user_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn is_valid_now(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

// ── File folder policy ───────────────────────────────────────────────────────

const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tif", ".tiff", ".webp", ".heic", ".heif", ".raw",
];
const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".3gp", ".m4v", ".mpeg", ".mpg",
    ".ogv",
];
const MEDIA_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tif", ".tiff", ".webp", ".heic", ".heif", ".raw",
    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".3gp", ".m4v", ".mpeg", ".mpg",
    ".ogv",
];

const MAX_MEDIA_SIZE_BYTES: u64 = 100 * 1024 * 1024;
const MAX_IMAGE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Per-folder upload policy: which extensions are accepted and how large a
/// file may be.
#[derive(Debug, Clone, Copy)]
pub struct FolderPolicy {
    pub allowed_extensions: &'static [&'static str],
    pub max_size_bytes: u64,
}

/// Named destination folders under the client file root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    /// Holding area for uploads pending association with an entity.
    Temporary,
    /// Profile avatars.
    User,
    /// Files attached to messages.
    MessageMedia,
}

impl Folder {
    pub fn name(self) -> &'static str {
        match self {
            Self::Temporary => "temporary",
            Self::User => "user",
            Self::MessageMedia => "message_media",
        }
    }

    pub fn policy(self) -> FolderPolicy {
        match self {
            Self::Temporary | Self::MessageMedia => FolderPolicy {
                allowed_extensions: MEDIA_EXTENSIONS,
                max_size_bytes: MAX_MEDIA_SIZE_BYTES,
            },
            Self::User => FolderPolicy {
                allowed_extensions: IMAGE_EXTENSIONS,
                max_size_bytes: MAX_IMAGE_SIZE_BYTES,
            },
        }
    }
}
