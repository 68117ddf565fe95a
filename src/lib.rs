//! clinicgate - role-gated patient record backend
//!
//! Staff log in with an identifier and password and receive a signed bearer
//! token. Every protected route runs an access gate that verifies the token
//! and checks the caller's role; patient writes are further restricted by
//! field group (front desk: demographic, clinician: clinical).

pub mod auth;
pub mod config;
pub mod records;
pub mod server;
pub mod storage;

pub use auth::{Authenticator, Identity, Role, TokenCodec};
pub use config::{AuthConfig, ServerConfig};
pub use records::PatientService;
pub use server::ClinicServer;
