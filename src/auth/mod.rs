//! Authentication and authorization
//!
//! Login flow:
//! - `Authenticator` looks the account up, checks the secret with
//!   `PasswordHasher` and issues a token through `TokenCodec`
//!
//! Protected requests:
//! - `gate::enforce` runs the route's `GateChain`: parse the bearer token,
//!   then compare the token's role against the route's required role
//!
//! Roles:
//! - `front_desk`: demographic and contact fields
//! - `clinician`: clinical fields

mod account;
mod authenticator;
mod error;
pub mod gate;
mod password;
mod roles;
mod tokens;

pub use account::{Account, AccountView};
pub use authenticator::{Authenticator, LoginOutcome};
pub use error::AuthError;
pub use gate::{GateChain, GateContext, RouteGate};
pub use password::{PasswordError, PasswordHasher};
pub use roles::{can_write, is_allowed, FieldGroup, Role, UnknownRole};
pub use tokens::{Claims, Identity, TokenCodec, TokenError, MAX_TOKEN_LEN, TOKEN_ALGORITHM};
