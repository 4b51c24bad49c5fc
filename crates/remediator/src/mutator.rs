//! Attribute reset protocol for a single account.
//!
//! The order of the commits matters: pwdLastSet has to be committed as `0`
//! before it is committed as `-1`. Writing `-1` directly on an account whose
//! password never expired lets the directory treat the old password as
//! expired on the spot and locks the user out. Each step is its own commit;
//! a failed step leaves earlier steps in place.

use crate::directory::{AccountRecord, AttributeChange, DirectoryClient};
use crate::error::{DirectoryError, MutationStep};
use tracing::{debug, info};

/// pwdLastSet value used as the intermediate pivot.
pub const PWD_LAST_SET_PIVOT: i64 = 0;
/// pwdLastSet value committed last.
pub const PWD_LAST_SET_FINAL: i64 = -1;

pub struct DirectoryAttributeMutator<D> {
    directory: D,
}

impl<D: DirectoryClient> DirectoryAttributeMutator<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut D {
        &mut self.directory
    }

    /// Resolve `identifier` and run the reset protocol on it.
    ///
    /// Returns the record as committed: `pwd_last_set == -1` with both
    /// password-policy flags cleared.
    #[tracing::instrument(skip(self))]
    pub async fn mutate(&mut self, identifier: &str) -> Result<AccountRecord, DirectoryError> {
        let mut record = self.lookup(identifier).await?;
        debug!(
            dn = %record.distinguished_name,
            pwd_last_set = record.pwd_last_set,
            password_never_expires = record.password_never_expires(),
            cannot_change_password = record.cannot_change_password(),
            "Resolved account"
        );

        self.commit_step(&mut record, MutationStep::ForceReset).await?;
        self.commit_step(&mut record, MutationStep::ClearForceReset).await?;
        self.commit_step(&mut record, MutationStep::EnforcePolicy).await?;

        info!(
            name = "mutator.mutate.completed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            identifier = %identifier,
            dn = %record.distinguished_name,
            message = "Password expiry re-enabled"
        );
        Ok(record)
    }

    async fn lookup(&mut self, identifier: &str) -> Result<AccountRecord, DirectoryError> {
        let mut matches = self
            .directory
            .find_accounts(identifier)
            .await
            .map_err(|source| DirectoryError::LookupFailed {
                identifier: identifier.to_string(),
                source,
            })?;

        match matches.len() {
            0 => Err(DirectoryError::NotFound {
                identifier: identifier.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(DirectoryError::Ambiguous {
                identifier: identifier.to_string(),
                count,
            }),
        }
    }

    async fn commit_step(
        &mut self,
        record: &mut AccountRecord,
        step: MutationStep,
    ) -> Result<(), DirectoryError> {
        let change = match step {
            MutationStep::ForceReset => AttributeChange::PwdLastSet(PWD_LAST_SET_PIVOT),
            MutationStep::ClearForceReset => AttributeChange::PwdLastSet(PWD_LAST_SET_FINAL),
            MutationStep::EnforcePolicy => AttributeChange::AccountControl(
                record.account_control.with_password_policy_enforced(),
            ),
        };

        self.directory
            .commit(&record.distinguished_name, &change)
            .await
            .map_err(|source| DirectoryError::Update {
                identifier: record.identifier.clone(),
                step,
                source,
            })?;

        record.apply(&change);
        debug!(step = %step, "Committed");
        Ok(())
    }
}
