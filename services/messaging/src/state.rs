use std::sync::Arc;

use sea_orm::DatabaseConnection;

use courier_auth_types::bearer::JwtSecretProvider;

use crate::hub::Hub;
use crate::infra::db::{
    DbConversationRepository, DbMessageRepository, DbUserRepository, DbVerificationCodeRepository,
};
use crate::infra::files::LocalFileStore;
use crate::infra::mail::SmtpMailer;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub hub: Arc<Hub>,
    pub files: LocalFileStore,
    pub mailer: SmtpMailer,
    pub jwt_secret: String,
    pub jwt_access_token_ttl_secs: u64,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn verification_code_repo(&self) -> DbVerificationCodeRepository {
        DbVerificationCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn conversation_repo(&self) -> DbConversationRepository {
        DbConversationRepository {
            db: self.db.clone(),
        }
    }

    pub fn message_repo(&self) -> DbMessageRepository {
        DbMessageRepository {
            db: self.db.clone(),
        }
    }
}

impl JwtSecretProvider for AppState {
    fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }
}
