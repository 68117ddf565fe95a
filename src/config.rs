//! Process-wide configuration
//!
//! Values are read once at startup (see the binaries) and are immutable
//! afterwards. Components receive the parts they need at construction time.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Default bearer token lifetime
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest token lifetime accepted (one year)
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Default Argon2 iteration count
pub const DEFAULT_HASH_WORK_FACTOR: u32 = 3;

/// Default Argon2 memory cost in KiB (64 MiB)
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 64 * 1024;

/// Argon2 refuses less than 8 KiB per lane
pub const MIN_HASH_MEMORY_KIB: u32 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("token ttl must be at least one second")]
    ZeroTtl,

    #[error("token ttl must not exceed {} hours, got {:?}", MAX_TOKEN_TTL.as_secs() / 3600, .0)]
    TtlTooLong(Duration),

    #[error("hash work factor must be at least 1")]
    ZeroWorkFactor,

    #[error("hash memory must be at least {MIN_HASH_MEMORY_KIB} KiB, got {0}")]
    HashMemoryTooSmall(u32),
}

/// Authentication settings shared by the token codec and the password hasher
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key for signing identity tokens
    pub signing_secret: Vec<u8>,
    /// Lifetime of an issued token
    pub token_ttl: Duration,
    /// Argon2 iterations
    pub hash_work_factor: u32,
    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,
}

impl AuthConfig {
    pub fn new(signing_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
            hash_work_factor: DEFAULT_HASH_WORK_FACTOR,
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
        }
    }

    /// Set the token lifetime
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the Argon2 cost parameters
    pub fn hash_cost(mut self, work_factor: u32, memory_kib: u32) -> Self {
        self.hash_work_factor = work_factor;
        self.hash_memory_kib = memory_kib;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.token_ttl.as_secs() == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if self.token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::TtlTooLong(self.token_ttl));
        }
        if self.hash_work_factor == 0 {
            return Err(ConfigError::ZeroWorkFactor);
        }
        if self.hash_memory_kib < MIN_HASH_MEMORY_KIB {
            return Err(ConfigError::HashMemoryTooSmall(self.hash_memory_kib));
        }
        Ok(())
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("hash_work_factor", &self.hash_work_factor)
            .field("hash_memory_kib", &self.hash_memory_kib)
            .finish()
    }
}

/// Convert an hour count from the command line into a bounded token lifetime
pub fn ttl_from_hours(hours: u64) -> Result<Duration, ConfigError> {
    let ttl = hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or(ConfigError::TtlTooLong(Duration::MAX))?;
    if ttl.is_zero() {
        return Err(ConfigError::ZeroTtl);
    }
    if ttl > MAX_TOKEN_TTL {
        return Err(ConfigError::TtlTooLong(ttl));
    }
    Ok(ttl)
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Authentication settings
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr, auth: AuthConfig) -> Self {
        Self { bind_addr, auth }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::new("secret");
        assert_eq!(config.token_ttl, Duration::from_secs(86_400));
        assert_eq!(config.hash_work_factor, DEFAULT_HASH_WORK_FACTOR);
        assert_eq!(config.hash_memory_kib, DEFAULT_HASH_MEMORY_KIB);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(AuthConfig::new("").validate(), Err(ConfigError::EmptySecret)));
        assert!(matches!(
            AuthConfig::new("s").token_ttl(Duration::from_millis(10)).validate(),
            Err(ConfigError::ZeroTtl)
        ));
        assert!(matches!(
            AuthConfig::new("s").token_ttl(Duration::from_secs(u64::MAX)).validate(),
            Err(ConfigError::TtlTooLong(_))
        ));
        assert!(AuthConfig::new("s").token_ttl(MAX_TOKEN_TTL).validate().is_ok());
        assert!(matches!(
            AuthConfig::new("s").hash_cost(0, 1024).validate(),
            Err(ConfigError::ZeroWorkFactor)
        ));
        assert!(matches!(
            AuthConfig::new("s").hash_cost(1, 4).validate(),
            Err(ConfigError::HashMemoryTooSmall(4))
        ));
    }

    #[test]
    fn test_ttl_from_hours() {
        assert_eq!(ttl_from_hours(24).unwrap(), Duration::from_secs(86_400));
        assert_eq!(ttl_from_hours(365 * 24).unwrap(), MAX_TOKEN_TTL);
        assert!(matches!(ttl_from_hours(0), Err(ConfigError::ZeroTtl)));
        assert!(matches!(ttl_from_hours(365 * 24 + 1), Err(ConfigError::TtlTooLong(_))));
        assert!(matches!(ttl_from_hours(u64::MAX), Err(ConfigError::TtlTooLong(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AuthConfig::new("super-secret-value");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }
}
