use crate::directory::ldap::{BindCredentials, LdapSettings};
use crate::failure_log::DEFAULT_FAILURE_LOG;
use crate::notify::smtp::{DEFAULT_SMTP_PORT, SmtpSecurity, SmtpSettings};
use crate::notify::{DEFAULT_BODY_TEMPLATE, DEFAULT_SUBJECT, MessageSettings};
use lettre::message::Mailbox;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "remediator.yaml";
pub const ENV_PREFIX: &str = "REMEDIATOR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Missing required parameter: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LdapConfig {
    pub url: Option<String>,
    pub base_dn: Option<String>,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub identifier_attribute: String,
    pub starttls: bool,
    pub timeout_secs: u64,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            url: None,
            base_dn: None,
            bind_dn: None,
            bind_password: None,
            identifier_attribute: "sAMAccountName".to_string(),
            starttls: false,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub server: Option<String>,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: DEFAULT_SMTP_PORT,
            security: SmtpSecurity::None,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub sender: Option<String>,
    pub subject: String,
    /// Body template; `{displayName}` is replaced per recipient.
    pub body: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            sender: None,
            subject: DEFAULT_SUBJECT.to_string(),
            body: DEFAULT_BODY_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ldap: LdapConfig,
    pub smtp: SmtpConfig,
    pub message: MessageConfig,
    pub failure_log: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ldap: LdapConfig::default(),
            smtp: SmtpConfig::default(),
            message: MessageConfig::default(),
            failure_log: PathBuf::from(DEFAULT_FAILURE_LOG),
        }
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ldap: LdapSettings,
    pub smtp: SmtpSettings,
    pub message: MessageSettings,
    pub failure_log: PathBuf,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

impl AppConfig {
    /// Check mandatory parameters and convert into [`Settings`].
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let smtp_server = required(self.smtp.server, "smtp.server")?;
        let sender = required(self.message.sender, "message.sender")?;
        let ldap_url = required(self.ldap.url, "ldap.url")?;
        let base_dn = required(self.ldap.base_dn, "ldap.base_dn")?;

        let sender: Mailbox = sender
            .parse()
            .map_err(|e| ConfigError::Validation(format!("message.sender '{sender}': {e}")))?;
        if self.smtp.port == 0 {
            return Err(ConfigError::Validation("smtp.port must be > 0".into()));
        }
        if self.ldap.identifier_attribute.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ldap.identifier_attribute must not be empty".into(),
            ));
        }

        let bind = match (self.ldap.bind_dn, self.ldap.bind_password) {
            (Some(dn), Some(password)) => Some(BindCredentials { dn, password }),
            (Some(_), None) => return Err(ConfigError::Missing("ldap.bind_password")),
            (None, Some(_)) => return Err(ConfigError::Missing("ldap.bind_dn")),
            (None, None) => None,
        };
        let credentials = match (self.smtp.username, self.smtp.password) {
            (Some(username), Some(password)) => Some((username, password)),
            (Some(_), None) => return Err(ConfigError::Missing("smtp.password")),
            (None, Some(_)) => return Err(ConfigError::Missing("smtp.username")),
            (None, None) => None,
        };

        Ok(Settings {
            ldap: LdapSettings {
                url: ldap_url,
                base_dn,
                bind,
                identifier_attribute: self.ldap.identifier_attribute,
                starttls: self.ldap.starttls,
                timeout: Duration::from_secs(self.ldap.timeout_secs),
            },
            smtp: SmtpSettings {
                server: smtp_server,
                port: self.smtp.port,
                security: self.smtp.security,
                credentials,
            },
            message: MessageSettings {
                sender,
                subject: self.message.subject,
                body_template: self.message.body,
            },
            failure_log: self.failure_log,
        })
    }
}

/// Load configuration from an optional YAML file plus environment overrides.
///
/// Environment variables use the `REMEDIATOR__` prefix and double underscores
/// between key segments, e.g. `REMEDIATOR__SMTP__SERVER`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX).separator("__"),
        )
        .build()?;

    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> AppConfig {
        let mut config = AppConfig::default();
        config.ldap.url = Some("ldaps://dc01.corp.example".into());
        config.ldap.base_dn = Some("DC=corp,DC=example".into());
        config.smtp.server = Some("mail.corp.example".into());
        config.message.sender = Some("IT Services <it@corp.example>".into());
        config
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.smtp.port, 25);
        assert_eq!(config.message.subject, "IMPORTANT: Password Expiry");
        assert!(config.message.body.contains("{displayName}"));
        assert_eq!(config.failure_log, PathBuf::from("FailedAccountChanges.txt"));
        assert_eq!(config.ldap.identifier_attribute, "sAMAccountName");
    }

    #[test]
    fn complete_config_converts() {
        let settings = complete().into_settings().unwrap();
        assert_eq!(settings.smtp.server, "mail.corp.example");
        assert_eq!(settings.message.sender.email.to_string(), "it@corp.example");
        assert_eq!(settings.ldap.timeout, Duration::from_secs(30));
        assert!(settings.ldap.bind.is_none());
    }

    #[test]
    fn missing_smtp_server_is_fatal() {
        let mut config = complete();
        config.smtp.server = Some("   ".into());
        let err = config.into_settings().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("smtp.server")));
    }

    #[test]
    fn missing_sender_is_fatal() {
        let mut config = complete();
        config.message.sender = None;
        let err = config.into_settings().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("message.sender")));
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let mut config = complete();
        config.message.sender = Some("not a mailbox".into());
        assert!(matches!(
            config.into_settings().unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn bind_dn_without_password_is_rejected() {
        let mut config = complete();
        config.ldap.bind_dn = Some("CN=svc-remediator,OU=Service,DC=corp,DC=example".into());
        assert!(matches!(
            config.into_settings().unwrap_err(),
            ConfigError::Missing("ldap.bind_password")
        ));
    }

    #[test]
    fn bind_password_without_dn_is_rejected() {
        let mut config = complete();
        config.ldap.bind_password = Some("secret".into());
        assert!(matches!(
            config.into_settings().unwrap_err(),
            ConfigError::Missing("ldap.bind_dn")
        ));
    }

    #[test]
    fn smtp_password_without_username_is_rejected() {
        let mut config = complete();
        config.smtp.password = Some("secret".into());
        assert!(matches!(
            config.into_settings().unwrap_err(),
            ConfigError::Missing("smtp.username")
        ));
    }
}
