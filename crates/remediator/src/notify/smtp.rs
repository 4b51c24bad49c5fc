use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::Error as SmtpError;
use lettre::{AsyncSmtpTransport, Tokio1Executor};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Per-command timeout for the SMTP session.
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain SMTP, the usual setup for an internal relay.
    #[default]
    None,
    StartTls,
    Tls,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub credentials: Option<(String, String)>,
}

pub fn build_transport(
    settings: &SmtpSettings,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, SmtpError> {
    let builder = match settings.security {
        SmtpSecurity::None => {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.server)
        }
        SmtpSecurity::StartTls => {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)?
        }
        SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.server)?,
    };

    let mut builder = builder.port(settings.port).timeout(Some(SMTP_TIMEOUT));
    if let Some((username, password)) = &settings.credentials {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    tracing::debug!(
        server = %settings.server,
        port = settings.port,
        security = ?settings.security,
        "Built SMTP transport"
    );
    Ok(builder.build())
}
