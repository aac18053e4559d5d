/// Messaging service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port for the HTTP server (default 3000). Env var: `PORT`.
    pub port: u16,
    /// HS256 signing secret for access tokens.
    pub jwt_secret: String,
    /// Access-token lifetime in seconds (default 86400). Env var:
    /// `JWT_ACCESS_TOKEN_TTL_SECS`.
    pub jwt_access_token_ttl_secs: u64,
    /// SMTP relay host for sign-in mails.
    pub mail_host: String,
    /// SMTP port (default 587). Env var: `MAIL_PORT`.
    pub mail_port: u16,
    /// SMTP username; also the From address.
    pub mail_user: String,
    pub mail_password: String,
    /// Root directory for client-served files (default `resources/clients`).
    /// Env var: `FILES_ROOT`.
    pub files_root: String,
}

impl MessagingConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            jwt_secret: std::env::var("JWT_ACCESS_TOKEN_SECRET_KEY")
                .expect("JWT_ACCESS_TOKEN_SECRET_KEY"),
            jwt_access_token_ttl_secs: std::env::var("JWT_ACCESS_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86_400),
            mail_host: std::env::var("MAIL_HOST").expect("MAIL_HOST"),
            mail_port: std::env::var("MAIL_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            mail_user: std::env::var("MAIL_USER").expect("MAIL_USER"),
            mail_password: std::env::var("MAIL_PASSWORD").expect("MAIL_PASSWORD"),
            files_root: std::env::var("FILES_ROOT")
                .unwrap_or_else(|_| "resources/clients".to_owned()),
        }
    }
}
