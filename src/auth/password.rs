//! Credential hashing and verification
//!
//! Digests are Argon2id PHC strings (`$argon2id$v=19$m=...,t=...,p=1$salt$hash`),
//! so the salt and cost travel with the digest and verification always uses
//! the parameters the digest was created with.

use crate::config::AuthConfig;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use rand::Rng;
use std::fmt;
use thiserror::Error;

const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid hashing parameters: {0}")]
    Params(String),

    #[error("hashing failed: {0}")]
    Hash(String),
}

/// Slow salted one-way hashing of account secrets
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Digest of a random secret, verified whenever there is no real digest
    /// to check against so every failure path costs one full hash
    decoy: String,
}

impl PasswordHasher {
    pub fn new(config: &AuthConfig) -> Result<Self, PasswordError> {
        Self::with_cost(config.hash_work_factor, config.hash_memory_kib)
    }

    /// Build a hasher with explicit Argon2 iterations and memory (KiB)
    pub fn with_cost(work_factor: u32, memory_kib: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, work_factor, 1, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut hasher = Self {
            argon2,
            decoy: String::new(),
        };

        let mut filler = [0u8; 32];
        rand::rng().fill(&mut filler);
        hasher.decoy = hasher.hash(&URL_SAFE_NO_PAD.encode(filler))?;

        Ok(hasher)
    }

    /// Hash a secret with a fresh random salt
    pub fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::rng().fill(&mut salt_bytes);
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

        let digest = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;

        Ok(digest.to_string())
    }

    /// Check a secret against a stored digest.
    ///
    /// Returns `false` for a wrong secret and for a digest that is not an
    /// Argon2 PHC string; both paths perform one full verification.
    pub fn verify(&self, secret: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) if Algorithm::try_from(parsed.algorithm).is_ok() => self
                .argon2
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            _ => {
                self.verify_decoy(secret);
                false
            }
        }
    }

    /// Spend the cost of one verification without a real digest.
    pub fn verify_decoy(&self, secret: &str) {
        if let Ok(parsed) = PasswordHash::new(&self.decoy) {
            let _ = self.argon2.verify_password(secret.as_bytes(), &parsed);
        }
    }
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish_non_exhaustive()
    }
}
