//! ldap3 backed [`DirectoryClient`] for Active Directory.

use super::{AccountRecord, AttributeChange, DirectoryClient, UserAccountControl};
use crate::error::ClientError;
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry, ldap_escape};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Attributes requested for every account lookup.
pub const ACCOUNT_ATTRIBUTES: [&str; 4] = ["pwdLastSet", "userAccountControl", "mail", "displayName"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindCredentials {
    pub dn: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapSettings {
    pub url: String,
    pub base_dn: String,
    pub bind: Option<BindCredentials>,
    /// Attribute the identifier is matched against, `sAMAccountName` by default.
    pub identifier_attribute: String,
    pub starttls: bool,
    pub timeout: Duration,
}

pub struct LdapDirectory {
    ldap: Ldap,
    base_dn: String,
    identifier_attribute: String,
}

impl LdapDirectory {
    /// Connect, and bind when credentials are configured.
    #[instrument(skip(settings), fields(url = %settings.url))]
    pub async fn connect(settings: &LdapSettings) -> Result<Self, ClientError> {
        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(settings.timeout)
            .set_starttls(settings.starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings, &settings.url).await?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        match &settings.bind {
            Some(bind) => {
                debug!(bind_dn = %bind.dn, "Performing LDAP bind");
                ldap.simple_bind(&bind.dn, &bind.password).await?.success()?;
            }
            None => warn!("No bind DN configured, continuing with an anonymous session"),
        }

        info!(
            name = "directory.connect.established",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            url = %settings.url,
            base_dn = %settings.base_dn,
            message = "LDAP connection established"
        );

        Ok(Self {
            ldap,
            base_dn: settings.base_dn.clone(),
            identifier_attribute: settings.identifier_attribute.clone(),
        })
    }

    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        self.ldap.unbind().await?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    #[instrument(skip(self))]
    async fn find_accounts(&mut self, identifier: &str) -> Result<Vec<AccountRecord>, ClientError> {
        let filter = account_filter(&self.identifier_attribute, identifier);
        debug!(filter = %filter, base_dn = %self.base_dn, "Searching for account");

        let (entries, _) = self
            .ldap
            .search(
                &self.base_dn,
                Scope::Subtree,
                &filter,
                ACCOUNT_ATTRIBUTES.to_vec(),
            )
            .await?
            .success()?;

        entries
            .into_iter()
            .map(|entry| account_from_entry(identifier, SearchEntry::construct(entry)))
            .collect()
    }

    #[instrument(skip(self, change), fields(attribute = change.attribute(), value = %change.value()))]
    async fn commit(&mut self, dn: &str, change: &AttributeChange) -> Result<(), ClientError> {
        let mods = vec![Mod::Replace(
            change.attribute().to_string(),
            HashSet::from([change.value()]),
        )];

        let result = self.ldap.modify(dn, mods).await?;
        if result.rc != 0 {
            return Err(ClientError::ResultCode {
                rc: result.rc,
                text: result.text,
            });
        }

        debug!(dn = %dn, "LDAP modify committed");
        Ok(())
    }
}

/// Search filter for user objects whose `attribute` equals `identifier`.
pub fn account_filter(attribute: &str, identifier: &str) -> String {
    format!(
        "(&(objectCategory=person)(objectClass=user)({}={}))",
        attribute,
        ldap_escape(identifier)
    )
}

fn first_value<'a>(entry: &'a SearchEntry, name: &str) -> Option<&'a String> {
    entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
}

/// Build an [`AccountRecord`] from a search result entry.
pub fn account_from_entry(identifier: &str, entry: SearchEntry) -> Result<AccountRecord, ClientError> {
    let pwd_last_set = match first_value(&entry, "pwdLastSet") {
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| ClientError::Malformed {
            attribute: "pwdLastSet",
            value: raw.clone(),
        })?,
        None => 0,
    };

    let account_control = match first_value(&entry, "userAccountControl") {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(UserAccountControl::from)
            .map_err(|_| ClientError::Malformed {
                attribute: "userAccountControl",
                value: raw.clone(),
            })?,
        None => UserAccountControl::default(),
    };

    let mail_address = first_value(&entry, "mail")
        .filter(|mail| !mail.trim().is_empty())
        .cloned();
    let display_name = first_value(&entry, "displayName")
        .cloned()
        .unwrap_or_default();

    Ok(AccountRecord {
        identifier: identifier.to_string(),
        distinguished_name: entry.dn,
        mail_address,
        display_name,
        pwd_last_set,
        account_control,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(attrs: &[(&str, &str)]) -> SearchEntry {
        SearchEntry {
            dn: "CN=Jane Doe,OU=Staff,DC=corp,DC=example".to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
                .collect::<HashMap<_, _>>(),
            bin_attrs: HashMap::new(),
        }
    }

    #[test]
    fn filter_escapes_identifier() {
        assert_eq!(
            account_filter("sAMAccountName", "jdoe"),
            "(&(objectCategory=person)(objectClass=user)(sAMAccountName=jdoe))"
        );
        let filter = account_filter("sAMAccountName", "a*)(cn=x");
        assert!(filter.contains("a\\2a\\29\\28cn=x"));
    }

    #[test]
    fn entry_with_all_attributes() {
        let record = account_from_entry(
            "jdoe",
            entry(&[
                ("pwdLastSet", "133497112000000000"),
                ("userAccountControl", "66112"),
                ("mail", "jane.doe@corp.example"),
                ("displayName", "Jane Doe"),
            ]),
        )
        .unwrap();

        assert_eq!(record.identifier, "jdoe");
        assert_eq!(record.distinguished_name, "CN=Jane Doe,OU=Staff,DC=corp,DC=example");
        assert_eq!(record.mail_address.as_deref(), Some("jane.doe@corp.example"));
        assert_eq!(record.display_name, "Jane Doe");
        assert_eq!(record.pwd_last_set, 133_497_112_000_000_000);
        assert!(record.password_never_expires());
        assert!(record.cannot_change_password());
    }

    #[test]
    fn attribute_names_match_case_insensitively() {
        let record = account_from_entry("jdoe", entry(&[("USERACCOUNTCONTROL", "65536")])).unwrap();
        assert!(record.password_never_expires());
    }

    #[test]
    fn missing_attributes_use_defaults() {
        let record = account_from_entry("jdoe", entry(&[("mail", "  ")])).unwrap();
        assert_eq!(record.mail_address, None);
        assert_eq!(record.display_name, "");
        assert_eq!(record.pwd_last_set, 0);
        assert_eq!(record.account_control, UserAccountControl::default());
    }

    #[test]
    fn malformed_integer_is_rejected() {
        let err = account_from_entry("jdoe", entry(&[("userAccountControl", "lots")])).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Malformed {
                attribute: "userAccountControl",
                ..
            }
        ));
    }

    #[test]
    fn changes_map_to_single_attribute_values() {
        assert_eq!(AttributeChange::PwdLastSet(-1).value(), "-1");
        assert_eq!(AttributeChange::PwdLastSet(0).attribute(), "pwdLastSet");
        let uac = AttributeChange::AccountControl(UserAccountControl::from(514));
        assert_eq!(uac.attribute(), "userAccountControl");
        assert_eq!(uac.value(), "514");
    }
}
