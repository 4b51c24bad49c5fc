//! Remediation of directory accounts whose password never expires.
//!
//! For every identifier the tool resets `pwdLastSet` through `0` to `-1`,
//! clears the "password never expires" and "cannot change password" flags,
//! and emails the account owner. Accounts are processed sequentially and a
//! failing account never stops the batch; failures go to a flat failure log.

pub mod cli;
pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod failure_log;
pub mod identifiers;
pub mod mutator;
pub mod notify;

pub use controller::{AccountState, BatchRemediationController, RemediationOutcome, Summary};
pub use directory::{AccountRecord, AttributeChange, DirectoryClient};
pub use failure_log::{FailureEntry, FailureLog};
pub use identifiers::Mode;
pub use notify::{MailTransport, MessageSettings};
