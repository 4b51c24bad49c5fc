//! Batch remediation.
//!
//! Identifiers are processed one at a time, in order. Each one is driven
//! through the state machine below to a terminal state before the next one
//! starts:
//!
//! ```text
//! Pending -> Mutating -> MutationFailed
//!                     -> Mutated -> Notifying -> NotifyFailed
//!                                             -> Notified
//! ```
//!
//! A failure is written to the failure log and counted, then the batch
//! carries on with the next identifier.

use crate::directory::DirectoryClient;
use crate::error::{DirectoryError, NotificationError, RemediationError};
use crate::failure_log::{FailureEntry, FailureLog};
use crate::mutator::DirectoryAttributeMutator;
use crate::notify::{MailTransport, MessageSettings, NotificationDispatcher};
use std::fmt;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Pending,
    Mutating,
    MutationFailed,
    Mutated,
    Notifying,
    NotifyFailed,
    Notified,
}

impl AccountState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AccountState::MutationFailed | AccountState::NotifyFailed | AccountState::Notified
        )
    }

    /// Whether the directory changes were committed in this state.
    pub fn is_remediated(self) -> bool {
        matches!(
            self,
            AccountState::Mutated
                | AccountState::Notifying
                | AccountState::NotifyFailed
                | AccountState::Notified
        )
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountState::Pending => "pending",
            AccountState::Mutating => "mutating",
            AccountState::MutationFailed => "mutation-failed",
            AccountState::Mutated => "mutated",
            AccountState::Notifying => "notifying",
            AccountState::NotifyFailed => "notify-failed",
            AccountState::Notified => "notified",
        };
        f.write_str(name)
    }
}

/// Result of processing one identifier.
#[derive(Debug)]
pub enum RemediationOutcome {
    Notified,
    MutationFailed(DirectoryError),
    /// The directory changes stay applied.
    NotificationFailed(NotificationError),
}

impl RemediationOutcome {
    pub fn state(&self) -> AccountState {
        match self {
            RemediationOutcome::Notified => AccountState::Notified,
            RemediationOutcome::MutationFailed(_) => AccountState::MutationFailed,
            RemediationOutcome::NotificationFailed(_) => AccountState::NotifyFailed,
        }
    }

    pub fn into_error(self) -> Option<RemediationError> {
        match self {
            RemediationOutcome::Notified => None,
            RemediationOutcome::MutationFailed(e) => Some(e.into()),
            RemediationOutcome::NotificationFailed(e) => Some(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub total: usize,
    /// Terminal state of every identifier, in processing order.
    pub outcomes: Vec<(String, AccountState)>,
    /// One entry per failed identifier, in processing order.
    pub failures: Vec<FailureEntry>,
}

impl Summary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.total - self.failed()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BatchRemediationController<D, T, L> {
    mutator: DirectoryAttributeMutator<D>,
    dispatcher: NotificationDispatcher<T>,
    failure_log: L,
}

impl<D, T, L> BatchRemediationController<D, T, L>
where
    D: DirectoryClient,
    T: MailTransport,
    L: FailureLog,
{
    pub fn new(directory: D, transport: T, failure_log: L) -> Self {
        Self {
            mutator: DirectoryAttributeMutator::new(directory),
            dispatcher: NotificationDispatcher::new(transport),
            failure_log,
        }
    }

    pub fn directory_mut(&mut self) -> &mut D {
        self.mutator.directory_mut()
    }

    pub fn failure_log(&self) -> &L {
        &self.failure_log
    }

    /// Remediate every identifier in order and report the tally.
    #[tracing::instrument(skip_all, fields(total = identifiers.len()))]
    pub async fn run(&mut self, identifiers: &[String], settings: &MessageSettings) -> Summary {
        let mut summary = Summary {
            total: identifiers.len(),
            ..Summary::default()
        };

        for (index, identifier) in identifiers.iter().enumerate() {
            debug!(position = index + 1, total = identifiers.len(), %identifier, "Processing account");

            let outcome = self.process(identifier, settings).await;
            let state = outcome.state();
            summary.outcomes.push((identifier.clone(), state));

            match outcome.into_error() {
                None => info!(
                    name = "controller.run.account_remediated",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    identifier = %identifier,
                    message = "Account remediated and user notified"
                ),
                Some(err) => {
                    let entry = FailureEntry::new(identifier, &err);
                    error!(
                        name = "controller.run.account_failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        identifier = %identifier,
                        kind = %entry.kind,
                        state = %state,
                        error = %err,
                        message = "Account remediation failed"
                    );
                    if let Err(e) = self.failure_log.append(&entry) {
                        error!(
                            name = "controller.run.failure_log_write_failed",
                            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                            identifier = %identifier,
                            error = %e,
                            message = "Could not record failure in the failure log"
                        );
                    }
                    summary.failures.push(entry);
                }
            }
        }

        info!(
            name = "controller.run.completed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            total = summary.total,
            failed = summary.failed(),
            message = "Batch finished"
        );
        summary
    }

    /// Drive one identifier from `Pending` to a terminal state.
    pub async fn process(&mut self, identifier: &str, settings: &MessageSettings) -> RemediationOutcome {
        let mut state = AccountState::Pending;
        transition(identifier, &mut state, AccountState::Mutating);

        let record = match self.mutator.mutate(identifier).await {
            Ok(record) => record,
            Err(e) => {
                transition(identifier, &mut state, AccountState::MutationFailed);
                return RemediationOutcome::MutationFailed(e);
            }
        };
        transition(identifier, &mut state, AccountState::Mutated);

        transition(identifier, &mut state, AccountState::Notifying);
        match self.dispatcher.notify(&record, settings).await {
            Ok(()) => {
                transition(identifier, &mut state, AccountState::Notified);
                RemediationOutcome::Notified
            }
            Err(e) => {
                transition(identifier, &mut state, AccountState::NotifyFailed);
                RemediationOutcome::NotificationFailed(e)
            }
        }
    }
}

fn transition(identifier: &str, state: &mut AccountState, next: AccountState) {
    debug!(%identifier, from = %state, to = %next, "State transition");
    *state = next;
}
