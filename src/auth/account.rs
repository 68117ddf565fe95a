//! Accounts as seen by the authentication core

use crate::auth::roles::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A provisioned account. Read-only for the authentication core.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// Unique, case-sensitive login identifier (usually an email)
    pub identifier: String,
    pub display_name: String,
    pub role: Role,
    /// Argon2 PHC digest of the account secret
    pub password_hash: String,
}

impl Account {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            role,
            password_hash: password_hash.into(),
        }
    }

    /// The public part of the account, safe to return to callers
    pub fn view(&self) -> AccountView {
        AccountView {
            identifier: self.identifier.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("identifier", &self.identifier)
            .field("display_name", &self.display_name)
            .field("role", &self.role)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Redacted account returned from login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    #[serde(rename = "email")]
    pub identifier: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: Role,
}
