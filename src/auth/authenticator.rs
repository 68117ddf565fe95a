//! Login: account lookup, credential check, token issuance

use crate::auth::account::{Account, AccountView};
use crate::auth::error::AuthError;
use crate::auth::password::PasswordHasher;
use crate::auth::tokens::TokenCodec;
use crate::storage::{AccountStore, StorageError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    #[serde(rename = "user")]
    pub account: AccountView,
}

/// Exchanges an identifier and secret for a signed identity token
#[derive(Clone)]
pub struct Authenticator {
    accounts: Arc<dyn AccountStore>,
    hasher: Arc<PasswordHasher>,
    codec: Arc<TokenCodec>,
}

impl Authenticator {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        hasher: Arc<PasswordHasher>,
        codec: Arc<TokenCodec>,
    ) -> Self {
        Self {
            accounts,
            hasher,
            codec,
        }
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub async fn login(&self, identifier: &str, secret: &str) -> Result<LoginOutcome, AuthError> {
        self.login_at(identifier, secret, Utc::now()).await
    }

    /// Same as [`login`](Self::login) with an explicit clock
    pub async fn login_at(
        &self,
        identifier: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        let account = match self.accounts.find_account_by_identifier(identifier).await {
            Ok(account) => Some(account),
            Err(StorageError::NotFound(_)) => {
                debug!(identifier = %identifier, "Login for unknown account");
                None
            }
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "Account lookup failed");
                None
            }
        };

        let verified = self.check_secret(account.as_ref(), secret).await;

        let account = match (account, verified) {
            (Some(account), true) => account,
            (Some(_), false) => {
                debug!(identifier = %identifier, "Login with wrong secret");
                return Err(AuthError::InvalidCredentials);
            }
            (None, _) => return Err(AuthError::InvalidCredentials),
        };

        let token = self.codec.issue(&account.identifier, account.role, now);
        info!(identifier = %account.identifier, role = %account.role, "Login succeeded");

        Ok(LoginOutcome {
            token,
            account: account.view(),
        })
    }

    /// Run the password check off the async runtime. Without an account the
    /// decoy digest is checked instead so both paths cost one verification.
    async fn check_secret(&self, account: Option<&Account>, secret: &str) -> bool {
        let hasher = self.hasher.clone();
        let secret = secret.to_string();
        let digest = account.map(|a| a.password_hash.clone());

        let result = tokio::task::spawn_blocking(move || match digest {
            Some(digest) => hasher.verify(&secret, &digest),
            None => {
                hasher.verify_decoy(&secret);
                false
            }
        })
        .await;

        match result {
            Ok(verified) => verified,
            Err(e) => {
                warn!(error = %e, "Credential check task failed");
                false
            }
        }
    }
}
