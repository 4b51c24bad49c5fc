use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};
use crate::identifiers::{IdentifierListError, Mode, load_identifiers};
use clap::{Args, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pwd-expiry-remediator")]
#[command(about = "Re-enable password expiry on directory accounts and notify the users")]
pub struct Cli {
    #[command(flatten)]
    pub target: Target,

    /// YAML configuration file. Missing file is not an error.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// SMTP server used for notifications.
    #[arg(long)]
    pub smtp_server: Option<String>,

    /// Sender address; also blind-copied on every notification.
    #[arg(long)]
    pub sender: Option<String>,

    #[arg(long)]
    pub subject: Option<String>,

    /// Body template. `{displayName}` is replaced with the user's display name.
    #[arg(long)]
    pub body: Option<String>,

    #[arg(long)]
    pub failure_log: Option<PathBuf>,

    #[arg(long)]
    pub ldap_url: Option<String>,

    #[arg(long)]
    pub base_dn: Option<String>,
}

/// Exactly one of a single identifier or a user list file.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Remediate one account.
    #[arg(long)]
    pub identifier: Option<String>,

    /// Remediate every account listed in the file, one identifier per line.
    #[arg(long)]
    pub user_list: Option<PathBuf>,
}

impl Cli {
    /// Command-line values take precedence over file and environment values.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(server) = &self.smtp_server {
            config.smtp.server = Some(server.clone());
        }
        if let Some(sender) = &self.sender {
            config.message.sender = Some(sender.clone());
        }
        if let Some(subject) = &self.subject {
            config.message.subject = subject.clone();
        }
        if let Some(body) = &self.body {
            config.message.body = body.clone();
        }
        if let Some(path) = &self.failure_log {
            config.failure_log = path.clone();
        }
        if let Some(url) = &self.ldap_url {
            config.ldap.url = Some(url.clone());
        }
        if let Some(base_dn) = &self.base_dn {
            config.ldap.base_dn = Some(base_dn.clone());
        }
    }

    /// Resolve the invocation mode, reading the user list in multi mode.
    pub fn mode(&self) -> Result<Mode, IdentifierListError> {
        match (&self.target.identifier, &self.target.user_list) {
            (Some(identifier), _) => Ok(Mode::Single(identifier.trim().to_string())),
            (None, Some(path)) => load_identifiers(path).map(Mode::Multi),
            (None, None) => unreachable!("clap requires --identifier or --user-list"),
        }
    }
}
