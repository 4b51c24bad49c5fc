//! Directory access.
//!
//! The remediation protocol only talks to the directory through
//! [`DirectoryClient`], which keeps it independent of the LDAP transport.
//!
//! ## Submodules
//!
//! - `ldap` - ldap3 backed client for Active Directory
//! - `uac` - `userAccountControl` bit field

pub mod ldap;
pub mod uac;

use crate::error::ClientError;
use async_trait::async_trait;

pub use ldap::{LdapDirectory, LdapSettings};
pub use uac::UserAccountControl;

/// The attributes of one account that the remediation protocol needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub identifier: String,
    pub distinguished_name: String,
    pub mail_address: Option<String>,
    pub display_name: String,
    pub pwd_last_set: i64,
    pub account_control: UserAccountControl,
}

impl AccountRecord {
    pub fn password_never_expires(&self) -> bool {
        self.account_control.password_never_expires()
    }

    pub fn cannot_change_password(&self) -> bool {
        self.account_control.cannot_change_password()
    }

    /// Reflect a committed change in the local copy.
    pub fn apply(&mut self, change: &AttributeChange) {
        match change {
            AttributeChange::PwdLastSet(value) => self.pwd_last_set = *value,
            AttributeChange::AccountControl(uac) => self.account_control = *uac,
        }
    }
}

/// A single-attribute replace, committed on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeChange {
    PwdLastSet(i64),
    AccountControl(UserAccountControl),
}

impl AttributeChange {
    pub fn attribute(&self) -> &'static str {
        match self {
            AttributeChange::PwdLastSet(_) => "pwdLastSet",
            AttributeChange::AccountControl(_) => "userAccountControl",
        }
    }

    pub fn value(&self) -> String {
        match self {
            AttributeChange::PwdLastSet(value) => value.to_string(),
            AttributeChange::AccountControl(uac) => uac.to_string(),
        }
    }
}

#[async_trait]
pub trait DirectoryClient: Send {
    /// Every account matching `identifier`, with the protocol attributes loaded.
    async fn find_accounts(&mut self, identifier: &str) -> Result<Vec<AccountRecord>, ClientError>;

    /// Write one change to the entry at `dn` and wait for the server to commit it.
    async fn commit(&mut self, dn: &str, change: &AttributeChange) -> Result<(), ClientError>;
}
