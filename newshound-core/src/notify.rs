use crate::error::NotifyError;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use newshound_scanner::ScrapeResult;
use tracing::info;

/// Who a digest goes to and under what subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailEnvelope {
    pub from: String,
    pub to: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Port 465 speaks implicit TLS; every other port upgrades with STARTTLS.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let mut builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let message = build_message(email)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

pub fn build_message(email: &Email) -> Result<Message, NotifyError> {
    let message = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(email.html_body.clone())?;
    Ok(message)
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// One `<h4>` link per result. Order follows the map and means nothing.
pub fn format_digest(results: &ScrapeResult) -> String {
    results
        .iter()
        .map(|(url, text)| {
            format!(
                "<h4><a href=\"{}\">{}</a></h4>",
                escape_html(url),
                escape_html(text)
            )
        })
        .collect()
}

/// Mail a digest of `new_results`. Callers skip this when nothing is new.
pub async fn notify(
    new_results: &ScrapeResult,
    envelope: &EmailEnvelope,
    mailer: &dyn Mailer,
) -> Result<(), NotifyError> {
    if new_results.is_empty() {
        return Err(NotifyError::Empty);
    }

    let email = Email {
        from: envelope.from.clone(),
        to: envelope.to.clone(),
        subject: envelope.subject.clone(),
        html_body: format_digest(new_results),
    };
    mailer.send(&email).await?;
    info!("Sent digest of {} link(s) to {}", new_results.len(), envelope.to);
    Ok(())
}
