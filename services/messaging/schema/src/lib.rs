//! sea-orm entities for the messaging service database.

pub mod conversation_members;
pub mod conversations;
pub mod message_media;
pub mod messages;
pub mod users;
pub mod verification_codes;
