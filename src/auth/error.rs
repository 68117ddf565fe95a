use crate::auth::tokens::TokenError;
use thiserror::Error;

/// Failures visible at the authentication boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown account or wrong secret; deliberately indistinguishable
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    #[error("insufficient role")]
    Forbidden,
}

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        AuthError::Unauthenticated
    }
}
