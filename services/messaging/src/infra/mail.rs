//! SMTP mailer for sign-in codes.

use anyhow::Context as _;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor};

use crate::config::MessagingConfig;
use crate::domain::repository::Mailer;

const SIGN_IN_SUBJECT: &str = "Your sign-in code";

fn sign_in_body(code: &str, expires_in_minutes: i64) -> String {
    format!(
        "<html><body>\
         <p>Use this code to finish signing in:</p>\
         <p style=\"font-size:24px;letter-spacing:4px\"><strong>{code}</strong></p>\
         <p>The code expires in {expires_in_minutes} minutes. If you did not \
         request it, you can ignore this mail.</p>\
         </body></html>"
    )
}

/// Mailer backed by an async SMTP relay (STARTTLS). The username doubles as
/// the From address.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MessagingConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.mail_host)
            .context("smtp relay")?
            .port(config.mail_port)
            .credentials(Credentials::new(
                config.mail_user.clone(),
                config.mail_password.clone(),
            ))
            .build();
        let from = config.mail_user.parse().context("MAIL_USER mailbox")?;
        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    async fn send_sign_in_code(
        &self,
        to: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().context("recipient mailbox")?)
            .subject(SIGN_IN_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(sign_in_body(code, expires_in_minutes))
            .context("build sign-in mail")?;
        self.transport
            .send(message)
            .await
            .context("send sign-in mail")?;
        Ok(())
    }
}
