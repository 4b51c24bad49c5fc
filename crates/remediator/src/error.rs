use std::fmt;
use thiserror::Error;

/// Failure reported by a directory client while talking to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("LDAP protocol error: {0}")]
    Protocol(#[from] ldap3::LdapError),
    #[error("LDAP result code {rc}: {text}")]
    ResultCode { rc: u32, text: String },
    #[error("Malformed value for {attribute}: {value:?}")]
    Malformed {
        attribute: &'static str,
        value: String,
    },
}

/// Steps of the attribute reset protocol, in the order they are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStep {
    /// pwdLastSet = 0
    ForceReset,
    /// pwdLastSet = -1
    ClearForceReset,
    /// Clear "password never expires" and "cannot change password".
    EnforcePolicy,
}

impl fmt::Display for MutationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationStep::ForceReset => f.write_str("setting pwdLastSet to 0"),
            MutationStep::ClearForceReset => f.write_str("setting pwdLastSet to -1"),
            MutationStep::EnforcePolicy => f.write_str("clearing password policy flags"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("No account matches identifier '{identifier}'")]
    NotFound { identifier: String },
    #[error("Identifier '{identifier}' matches {count} accounts")]
    Ambiguous { identifier: String, count: usize },
    #[error("Lookup of '{identifier}' failed: {source}")]
    LookupFailed {
        identifier: String,
        #[source]
        source: ClientError,
    },
    #[error("Update of '{identifier}' failed while {step}: {source}")]
    Update {
        identifier: String,
        step: MutationStep,
        #[source]
        source: ClientError,
    },
}

impl DirectoryError {
    /// True when the identifier could not be resolved to exactly one account.
    pub fn is_lookup(&self) -> bool {
        !matches!(self, DirectoryError::Update { .. })
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Account '{identifier}' has no mail address")]
    MissingMailAddress { identifier: String },
    #[error("Invalid mail address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

/// Per-identifier failure. Never aborts a batch.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("Directory remediation failed: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Directory changes were applied but the notification failed: {0}")]
    Notification(#[from] NotificationError),
}

/// Coarse classification used in failure entries and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Lookup,
    Update,
    Notification,
}

impl RemediationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RemediationError::Directory(e) if e.is_lookup() => FailureKind::Lookup,
            RemediationError::Directory(_) => FailureKind::Update,
            RemediationError::Notification(_) => FailureKind::Notification,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Lookup => f.write_str("lookup"),
            FailureKind::Update => f.write_str("update"),
            FailureKind::Notification => f.write_str("notification"),
        }
    }
}
