//! Post-remediation email to the affected user.
//!
//! ## Submodules
//!
//! - `smtp` - lettre SMTP transport construction

pub mod smtp;

use crate::directory::AccountRecord;
use crate::error::NotificationError;
use async_trait::async_trait;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::Mailbox;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub const DEFAULT_SUBJECT: &str = "IMPORTANT: Password Expiry";

/// Substitution point replaced with the account's display name.
pub const DISPLAY_NAME_PLACEHOLDER: &str = "{displayName}";

pub const DEFAULT_BODY_TEMPLATE: &str = r#"Hello {displayName},

Your domain account was configured so that its password never expired.
This exemption is no longer permitted by the password policy and has been
removed from your account.

Your current password keeps working for now. Once it reaches the maximum
password age you will be asked to choose a new one at sign-in. You can
change it earlier at any time.

If you have questions about this change, please contact the IT service desk.

Regards,
IT Services"#;

/// Sender, subject and body template shared by every notification in a run.
#[derive(Debug, Clone)]
pub struct MessageSettings {
    pub sender: Mailbox,
    pub subject: String,
    pub body_template: String,
}

impl MessageSettings {
    pub fn new(sender: Mailbox) -> Self {
        Self {
            sender,
            subject: DEFAULT_SUBJECT.to_string(),
            body_template: DEFAULT_BODY_TEMPLATE.to_string(),
        }
    }
}

/// Fill in the display name, falling back to the identifier when it is empty.
pub fn render_body(template: &str, record: &AccountRecord) -> String {
    let name = if record.display_name.trim().is_empty() {
        record.identifier.as_str()
    } else {
        record.display_name.as_str()
    };
    template.replace(DISPLAY_NAME_PLACEHOLDER, name)
}

/// `X-Priority` header for high priority mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPriorityHeader(String);

impl Header for XPriorityHeader {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn core::error::Error + Send + Sync>> {
        Ok(Self(s.into()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

impl XPriorityHeader {
    pub fn highest() -> Self {
        Self("1 (Highest)".to_string())
    }
}

/// `Importance` header, read by Outlook and Exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportanceHeader(String);

impl Header for ImportanceHeader {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Importance")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn core::error::Error + Send + Sync>> {
        Ok(Self(s.into()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

impl ImportanceHeader {
    pub fn high() -> Self {
        Self("High".to_string())
    }
}

/// Build the notification for a remediated account.
pub fn build_message(
    record: &AccountRecord,
    settings: &MessageSettings,
) -> Result<Message, NotificationError> {
    let address = record
        .mail_address
        .as_deref()
        .ok_or_else(|| NotificationError::MissingMailAddress {
            identifier: record.identifier.clone(),
        })?;
    let address: Address = address
        .trim()
        .parse()
        .map_err(|source| NotificationError::InvalidAddress {
            address: address.to_string(),
            source,
        })?;
    let display_name = Some(record.display_name.clone()).filter(|n| !n.trim().is_empty());

    let message = Message::builder()
        .from(settings.sender.clone())
        .to(Mailbox::new(display_name, address))
        .bcc(settings.sender.clone())
        .subject(settings.subject.clone())
        .header(XPriorityHeader::highest())
        .header(ImportanceHeader::high())
        .header(ContentType::TEXT_PLAIN)
        .body(render_body(&settings.body_template, record))?;

    Ok(message)
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<(), NotificationError>;
}

#[async_trait]
impl MailTransport for AsyncSmtpTransport<Tokio1Executor> {
    async fn deliver(&self, message: Message) -> Result<(), NotificationError> {
        self.send(message)
            .await
            .map(|_| ())
            .map_err(|e| NotificationError::Transport(e.to_string()))
    }
}

pub struct NotificationDispatcher<T> {
    transport: T,
}

impl<T: MailTransport> NotificationDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send the notification for `record`. Only called after a successful mutation.
    #[tracing::instrument(skip_all, fields(identifier = %record.identifier))]
    pub async fn notify(
        &self,
        record: &AccountRecord,
        settings: &MessageSettings,
    ) -> Result<(), NotificationError> {
        let message = build_message(record, settings)?;
        self.transport.deliver(message).await?;

        tracing::info!(
            name = "notify.notify.sent",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            identifier = %record.identifier,
            recipient = record.mail_address.as_deref().unwrap_or_default(),
            message = "Sent password expiry notice"
        );
        Ok(())
    }
}
