//! In-memory directory and mail transport used by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use lettre::Message;
use pwd_expiry_remediator::directory::UserAccountControl;
use pwd_expiry_remediator::error::{ClientError, NotificationError};
use pwd_expiry_remediator::failure_log::{FailureEntry, FailureLog, FailureLogError};
use pwd_expiry_remediator::{AccountRecord, AttributeChange, DirectoryClient, MailTransport};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// NORMAL_ACCOUNT | PASSWD_CANT_CHANGE | DONT_EXPIRE_PASSWORD
pub const POLICY_EXEMPT_UAC: u32 = 0x1_0240;

pub fn account(identifier: &str) -> AccountRecord {
    AccountRecord {
        identifier: identifier.to_string(),
        distinguished_name: dn(identifier),
        mail_address: Some(format!("{identifier}@corp.example")),
        display_name: format!("User {identifier}"),
        pwd_last_set: 133_497_112_000_000_000,
        account_control: UserAccountControl::from(POLICY_EXEMPT_UAC),
    }
}

pub fn dn(identifier: &str) -> String {
    format!("CN={identifier},OU=Staff,DC=corp,DC=example")
}

#[derive(Debug, Default)]
pub struct FakeDirectory {
    pub accounts: BTreeMap<String, AccountRecord>,
    /// Every committed write, in order.
    pub writes: Vec<(String, AttributeChange)>,
    pub lookups: Vec<String>,
    /// DN -> zero-based index of the write to that DN that fails.
    pub failing_writes: HashMap<String, usize>,
    /// Identifiers that resolve to two entries.
    pub duplicated: HashSet<String>,
    pub unreachable: bool,
    attempts: HashMap<String, usize>,
}

impl FakeDirectory {
    pub fn with_accounts(identifiers: &[&str]) -> Self {
        let mut directory = Self::default();
        for identifier in identifiers {
            directory
                .accounts
                .insert(identifier.to_string(), account(identifier));
        }
        directory
    }

    pub fn fail_write(mut self, identifier: &str, index: usize) -> Self {
        self.failing_writes.insert(dn(identifier), index);
        self
    }

    pub fn writes_to(&self, identifier: &str) -> Vec<AttributeChange> {
        let dn = dn(identifier);
        self.writes
            .iter()
            .filter(|(target, _)| *target == dn)
            .map(|(_, change)| *change)
            .collect()
    }

    pub fn pwd_last_set_writes(&self, identifier: &str) -> Vec<i64> {
        self.writes_to(identifier)
            .into_iter()
            .filter_map(|change| match change {
                AttributeChange::PwdLastSet(value) => Some(value),
                AttributeChange::AccountControl(_) => None,
            })
            .collect()
    }

    pub fn stored(&self, identifier: &str) -> &AccountRecord {
        &self.accounts[identifier]
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn find_accounts(&mut self, identifier: &str) -> Result<Vec<AccountRecord>, ClientError> {
        self.lookups.push(identifier.to_string());
        if self.unreachable {
            return Err(ClientError::ResultCode {
                rc: 52,
                text: "unavailable".to_string(),
            });
        }
        let mut found: Vec<AccountRecord> = self.accounts.get(identifier).cloned().into_iter().collect();
        if self.duplicated.contains(identifier) {
            found.extend(found.clone());
        }
        Ok(found)
    }

    async fn commit(&mut self, dn: &str, change: &AttributeChange) -> Result<(), ClientError> {
        let attempt = self.attempts.entry(dn.to_string()).or_insert(0);
        let index = *attempt;
        *attempt += 1;

        if self.failing_writes.get(dn) == Some(&index) {
            return Err(ClientError::ResultCode {
                rc: 50,
                text: "insufficientAccessRights".to_string(),
            });
        }

        self.writes.push((dn.to_string(), *change));
        if let Some(record) = self
            .accounts
            .values_mut()
            .find(|record| record.distinguished_name == dn)
        {
            record.apply(change);
        }
        Ok(())
    }
}

/// Mail transport that records every delivery attempt.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    attempts: Arc<Mutex<Vec<Message>>>,
    pub unreachable: bool,
}

impl FakeTransport {
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> Vec<Message> {
        self.attempts.lock().unwrap().clone()
    }

    /// Sorted envelope recipients of each attempt, attempts in order.
    pub fn recipients(&self) -> Vec<Vec<String>> {
        self.attempts()
            .iter()
            .map(|m| {
                let mut to: Vec<String> = m.envelope().to().iter().map(|a| a.to_string()).collect();
                to.sort();
                to
            })
            .collect()
    }
}

#[async_trait]
impl MailTransport for FakeTransport {
    async fn deliver(&self, message: Message) -> Result<(), NotificationError> {
        self.attempts.lock().unwrap().push(message);
        if self.unreachable {
            return Err(NotificationError::Transport(
                "Connection refused (os error 111)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Failure log whose every write fails, as on a full or read-only disk.
#[derive(Debug, Default)]
pub struct BrokenFailureLog {
    pub attempts: usize,
}

impl FailureLog for BrokenFailureLog {
    fn append(&mut self, _entry: &FailureEntry) -> Result<(), FailureLogError> {
        self.attempts += 1;
        Err(FailureLogError {
            path: PathBuf::from("/var/log/remediator/FailedAccountChanges.txt"),
            source: io::Error::other("No space left on device"),
        })
    }
}
