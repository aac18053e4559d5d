use chrono::{Duration, Utc};
use uuid::Uuid;

use courier_auth_types::token::issue_access_token;
use courier_core::task::spawn_logged;

use crate::domain::repository::{Mailer, UserRepository, VerificationCodeRepository};
use crate::domain::types::{
    User, VERIFICATION_CODE_TTL_MINUTES, generate_verification_code,
};
use crate::error::MessagingError;

// ── SignIn ───────────────────────────────────────────────────────────────────

pub struct SignInInput {
    pub email: String,
}

pub struct SignInUseCase<U, V, M>
where
    U: UserRepository,
    V: VerificationCodeRepository,
    M: Mailer + Clone + 'static,
{
    pub users: U,
    pub codes: V,
    pub mailer: M,
}

impl<U, V, M> SignInUseCase<U, V, M>
where
    U: UserRepository,
    V: VerificationCodeRepository,
    M: Mailer + Clone + 'static,
{
    /// Request a one-time code. Unknown emails create an account on the fly
    /// (fullname defaults to the email). The mail goes out on a detached
    /// task — a mail-provider outage never fails this call.
    pub async fn execute(&self, input: SignInInput) -> Result<(), MessagingError> {
        let email = input.email.trim().to_lowercase();

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let now = Utc::now();
                let user = User {
                    id: Uuid::now_v7(),
                    fullname: email.clone(),
                    email: email.clone(),
                    phone: None,
                    avatar: None,
                    is_active: false,
                    last_active_at: now,
                    created_at: now,
                    updated_at: now,
                };
                self.users.create(&user).await?;
                user
            }
        };

        let code = generate_verification_code();
        let expires_at = Utc::now() + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES);
        self.codes.upsert(user.id, &code, expires_at).await?;

        let mailer = self.mailer.clone();
        spawn_logged("send-sign-in-mail", async move {
            mailer
                .send_sign_in_code(&email, &code, VERIFICATION_CODE_TTL_MINUTES)
                .await
        });

        Ok(())
    }
}

// ── VerifySignIn ─────────────────────────────────────────────────────────────

pub struct VerifySignInInput {
    pub email: String,
    pub code: String,
}

pub struct VerifySignInUseCase<U, V>
where
    U: UserRepository,
    V: VerificationCodeRepository,
{
    pub users: U,
    pub codes: V,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

impl<U, V> VerifySignInUseCase<U, V>
where
    U: UserRepository,
    V: VerificationCodeRepository,
{
    /// Exchange email + code for an access token. The code must be the
    /// user's current one and still within its TTL.
    pub async fn execute(&self, input: VerifySignInInput) -> Result<String, MessagingError> {
        let email = input.email.trim().to_lowercase();

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| MessagingError::bad_request("Email not found"))?;

        let current = self
            .codes
            .find_current(user.id)
            .await?
            .ok_or_else(|| MessagingError::bad_request("Invalid verification code"))?;
        if current.code != input.code {
            return Err(MessagingError::bad_request("Invalid verification code"));
        }

        issue_access_token(user.id, &self.jwt_secret, self.token_ttl_secs)
            .map_err(|e| MessagingError::Internal(anyhow::Error::new(e).context("issue token")))
    }
}
