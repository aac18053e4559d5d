use sea_orm_migration::prelude::*;

mod m20260601_000001_create_users;
mod m20260601_000002_create_conversations;
mod m20260601_000003_create_conversation_members;
mod m20260601_000004_create_messages;
mod m20260601_000005_create_message_media;
mod m20260601_000006_create_verification_codes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260601_000001_create_users::Migration),
            Box::new(m20260601_000002_create_conversations::Migration),
            Box::new(m20260601_000003_create_conversation_members::Migration),
            Box::new(m20260601_000004_create_messages::Migration),
            Box::new(m20260601_000005_create_message_media::Migration),
            Box::new(m20260601_000006_create_verification_codes::Migration),
        ]
    }
}
