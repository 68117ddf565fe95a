//! Storage backends for clinicgate
//!
//! - Postgres: durable storage for accounts and patient records
//! - Memory: process-local store for tests and embedding

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresStore};

use crate::auth::Account;
use crate::records::{Patient, PatientPatch};
use chrono::{DateTime, Utc};
pub use async_trait::async_trait;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Account lookup, and provisioning for operator tooling
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account by its exact identifier
    async fn find_account_by_identifier(&self, identifier: &str) -> Result<Account, StorageError>;

    /// Insert a new account; fails with `Conflict` if the identifier is taken
    async fn create_account(&self, account: &Account) -> Result<(), StorageError>;
}

/// Patient record persistence
///
/// Deleted records are soft-deleted and invisible to every read.
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Insert a record; the store assigns and returns the id
    async fn insert_patient(&self, patient: &Patient) -> Result<Patient, StorageError>;

    async fn get_patient(&self, id: i64) -> Result<Patient, StorageError>;

    /// One page ordered by id, plus the total number of records
    async fn list_patients(&self, limit: u32, offset: u64)
        -> Result<(Vec<Patient>, u64), StorageError>;

    /// Case-insensitive substring match on first name, last name and email,
    /// plain substring match on contact number
    async fn search_patients(
        &self,
        term: &str,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<Patient>, u64), StorageError>;

    /// Write only the fields present in `patch`, in one atomic step, and
    /// return the record as stored afterwards
    async fn update_patient_fields(
        &self,
        id: i64,
        patch: &PatientPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Patient, StorageError>;

    async fn delete_patient(&self, id: i64) -> Result<(), StorageError>;
}

/// Shared search predicate for backends that filter in process
pub(crate) fn patient_matches(patient: &Patient, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    patient.first_name.to_lowercase().contains(&needle)
        || patient.last_name.to_lowercase().contains(&needle)
        || patient.email.to_lowercase().contains(&needle)
        || patient.contact_number.contains(term)
}
