//! Identity tokens
//!
//! Tokens are compact HS256 JWTs:
//!
//! ```text
//! base64url({"alg":"HS256","typ":"JWT"}) . base64url(claims) . base64url(hmac)
//! ```
//!
//! The codec only ever trusts HMAC-SHA256 under the server secret. A token
//! that declares any other algorithm (including `none`) is rejected before
//! its signature is looked at.

use crate::auth::roles::Role;
use crate::config::AuthConfig;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The only accepted signing algorithm
pub const TOKEN_ALGORITHM: &str = "HS256";

/// Declared token type
pub const TOKEN_TYPE: &str = "JWT";

/// Upper bound on accepted token length; real tokens are a few hundred bytes
pub const MAX_TOKEN_LEN: usize = 4096;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("unsupported token algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("invalid token signature")]
    SignatureInvalid,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,
}

impl TokenError {
    fn malformed(reason: impl Into<String>) -> Self {
        TokenError::MalformedToken(reason.into())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Claims carried by an identity token (timestamps are unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account identifier
    pub sub: String,
    /// Role recorded on the account at login
    pub role: Role,
    /// Issued at
    pub iat: i64,
    /// Not before
    pub nbf: i64,
    /// Expires at (exclusive)
    pub exp: i64,
}

/// Who is making a request, as established from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Account identifier
    pub subject: String,
    pub role: Role,
}

/// Issues and verifies identity tokens under one immutable secret
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.signing_secret.clone(), config.token_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a signed token valid from `now` until `now + ttl`
    pub fn issue(&self, subject: &str, role: Role, now: DateTime<Utc>) -> String {
        let iat = now.timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat,
            nbf: iat,
            exp: iat.saturating_add(i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)),
        };

        let header = TokenHeader {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: Some(TOKEN_TYPE.to_string()),
        };
        let header_json = serde_json::to_vec(&header).expect("serialize header");
        let claims_json = serde_json::to_vec(&claims).expect("serialize claims");

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input).finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }

    /// Verify a token and return the identity it asserts
    pub fn parse(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let claims = self.verify(token, now)?;
        Ok(Identity {
            subject: claims.sub,
            role: claims.role,
        })
    }

    /// Verify a token and return its full claim set
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::malformed("token too long"));
        }

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(TokenError::malformed("expected three non-empty segments"));
        }
        let (header_b64, claims_b64, signature_b64) = (parts[0], parts[1], parts[2]);

        // Algorithm check comes first so a forged header never reaches the MAC
        let header_json = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|e| TokenError::malformed(format!("header encoding: {}", e)))?;
        let header: TokenHeader = serde_json::from_slice(&header_json)
            .map_err(|e| TokenError::malformed(format!("header json: {}", e)))?;

        if header.alg != TOKEN_ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }
        if let Some(typ) = header.typ.as_deref() {
            if typ != TOKEN_TYPE {
                return Err(TokenError::malformed(format!("unexpected type '{}'", typ)));
            }
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| TokenError::malformed(format!("signature encoding: {}", e)))?;

        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        self.mac(signing_input)
            .verify_slice(&signature)
            .map_err(|_| TokenError::SignatureInvalid)?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|e| TokenError::malformed(format!("claims encoding: {}", e)))?;
        let claims: Claims = serde_json::from_slice(&claims_json)
            .map_err(|e| TokenError::malformed(format!("claims json: {}", e)))?;

        if claims.sub.is_empty() {
            return Err(TokenError::malformed("empty subject"));
        }

        let now = now.timestamp();
        if now < claims.nbf {
            return Err(TokenError::NotYetValid);
        }
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        mac
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenCodec([REDACTED], ttl={:?})", self.ttl)
    }
}
