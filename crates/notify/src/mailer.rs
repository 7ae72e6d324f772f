use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor};
use model::notification::Notification;
use thiserror::Error;

use crate::templates;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("smtp: {0}")]
    Smtp(String),
}

pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Outbound email over STARTTLS. Credentials come from the environment;
/// nothing here is hardcoded.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let tls = TlsParameters::new(config.host.clone())
            .map_err(|err| MailError::Smtp(format!("tls: {err}")))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|err| MailError::Smtp(format!("relay: {err}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .tls(Tls::Required(tls))
            .build();
        let from = config
            .from
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from.clone()))?;
        Ok(Mailer { transport, from })
    }

    pub async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        let to: Mailbox = format!(
            "{} <{}>",
            notification.recipient.name, notification.recipient.email
        )
        .parse()
        .map_err(|_| MailError::InvalidAddress(notification.recipient.email.clone()))?;

        let rendered = templates::render(&notification.notice);
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(rendered.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(rendered.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(rendered.html),
                    ),
            )
            .map_err(|err| MailError::Smtp(format!("build: {err}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|err| MailError::Smtp(err.to_string()))?;
        Ok(())
    }
}
