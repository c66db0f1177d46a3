//! Account credential resolution
//!
//! API keys are opaque secrets supplied through a dotenv-style file. Each key is
//! named by a fixed prefix followed by the uppercased account name:
//!
//! ```text
//! TYPEFULLY_API_KEY_PERSONAL=...
//! TYPEFULLY_API_KEY_COMPANY=...
//! ```
//!
//! The file is read once when the store is built; the store is immutable
//! afterwards and can be shared across tasks without locking.
//!
//! # Example
//!
//! ```no_run
//! use libtypecast::credentials::CredentialStore;
//!
//! # fn example() -> libtypecast::Result<()> {
//! let store = CredentialStore::from_env_file(
//!     std::path::Path::new("/home/me/.config/typecast/.env"),
//!     "TYPEFULLY_API_KEY_",
//! )?;
//!
//! // Lookups are case-insensitive
//! let key = store.resolve("Personal")?;
//! # let _ = key;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};

use crate::error::{ConfigError, Result, TypecastError};

const MAX_ACCOUNT_NAME_LEN: usize = 64;

/// Logical account name, normalized to lowercase
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountName(String);

impl AccountName {
    /// Validate and normalize an account name
    ///
    /// Rules:
    /// - ASCII alphanumeric characters, hyphens, and underscores only
    /// - 1 to 64 characters
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw.trim();

        if name.is_empty() {
            return Err(TypecastError::validation_field(
                "Account name cannot be empty",
                "account",
            ));
        }

        if name.len() > MAX_ACCOUNT_NAME_LEN {
            return Err(TypecastError::validation_field(
                format!(
                    "Account name too long: {} characters (max {})",
                    name.len(),
                    MAX_ACCOUNT_NAME_LEN
                ),
                "account",
            ));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TypecastError::validation_field(
                format!(
                    "Invalid account name '{}'. Must be alphanumeric with hyphens/underscores only",
                    name
                ),
                "account",
            ));
        }

        Ok(Self(name.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the variable that holds this account's key
    pub fn env_key(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0.to_uppercase())
    }
}

impl FromStr for AccountName {
    type Err = TypecastError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AccountName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque API credential
///
/// Held in a `SecretString` so it is zeroed on drop and never shows up in
/// `Debug` output or logs.
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Raw key for the `Authorization` header
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

/// Immutable account → credential mapping
#[derive(Debug, Default)]
pub struct CredentialStore {
    keys: BTreeMap<AccountName, ApiKey>,
    prefix: String,
}

impl CredentialStore {
    /// Load credentials from a dotenv-format file
    ///
    /// A missing file yields an empty store. Only variables that start with
    /// `prefix` are considered; everything else in the file is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvFile` if the file cannot be parsed, names an
    /// invalid account, defines an account twice, or has an empty key.
    pub fn from_env_file(path: &Path, prefix: &str) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                "Credentials file not found at {}. Create it with: {}<ACCOUNT>=your_key_here",
                path.display(),
                prefix
            );
            return Ok(Self {
                keys: BTreeMap::new(),
                prefix: prefix.to_string(),
            });
        }

        let path_str = path.display().to_string();
        let iter = dotenvy::from_path_iter(path).map_err(|e| ConfigError::EnvFile {
            path: path_str.clone(),
            message: e.to_string(),
        })?;

        let mut pairs = Vec::new();
        for item in iter {
            let pair = item.map_err(|e| ConfigError::EnvFile {
                path: path_str.clone(),
                message: e.to_string(),
            })?;
            pairs.push(pair);
        }

        let store = Self::build(pairs, prefix).map_err(|message| ConfigError::EnvFile {
            path: path_str.clone(),
            message,
        })?;

        tracing::debug!("Loaded {} account(s) from {}", store.len(), path_str);
        Ok(store)
    }

    /// Build a store from key/value pairs (e.g. process environment)
    pub fn from_pairs<I, K, V>(pairs: I, prefix: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.into()));
        Self::build(pairs, prefix).map_err(|message| {
            ConfigError::InvalidValue {
                field: "credentials".to_string(),
                message,
            }
            .into()
        })
    }

    fn build<I>(pairs: I, prefix: &str) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut keys = BTreeMap::new();

        for (key, value) in pairs {
            let Some(suffix) = key.strip_prefix(prefix) else {
                continue;
            };

            let account = AccountName::parse(suffix)
                .map_err(|_| format!("'{}' does not name a valid account", key))?;

            let value = value.trim();
            if value.is_empty() {
                return Err(format!("'{}' has an empty value", key));
            }

            if keys.contains_key(&account) {
                return Err(format!("account '{}' is defined more than once", account));
            }

            keys.insert(account, ApiKey::new(value));
        }

        Ok(Self {
            keys,
            prefix: prefix.to_string(),
        })
    }

    /// Resolve an account name to its credential, case-insensitively
    ///
    /// # Errors
    ///
    /// Returns `TypecastError::AccountNotFound` naming the attempted account and
    /// the accounts that are configured.
    pub fn resolve(&self, account: &str) -> Result<&ApiKey> {
        let not_found = || TypecastError::AccountNotFound {
            account: account.trim().to_string(),
            available: self.account_names(),
        };

        let name = AccountName::parse(account).map_err(|_| not_found())?;
        self.keys.get(&name).ok_or_else(not_found)
    }

    /// Configured accounts in sorted order
    pub fn accounts(&self) -> impl Iterator<Item = &AccountName> {
        self.keys.keys()
    }

    pub fn account_names(&self) -> Vec<String> {
        self.keys.keys().map(|name| name.to_string()).collect()
    }

    pub fn contains(&self, account: &str) -> bool {
        AccountName::parse(account)
            .map(|name| self.keys.contains_key(&name))
            .unwrap_or(false)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
