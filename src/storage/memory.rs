//! In-memory storage backend

use crate::auth::Account;
use crate::records::{Patient, PatientPatch};
use crate::storage::{patient_matches, AccountStore, PatientStore, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

struct StoredPatient {
    patient: Patient,
    deleted: bool,
}

/// Accounts and patients held in process memory
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, Account>>,
    /// Keyed by id so iteration is in insertion order
    patients: RwLock<BTreeMap<i64, StoredPatient>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            patients: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Create a store pre-populated with accounts
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        {
            let mut map = store.accounts.write();
            for account in accounts {
                map.insert(account.identifier.clone(), account);
            }
        }
        store
    }

    fn page_where<F>(&self, limit: u32, offset: u64, filter: F) -> (Vec<Patient>, u64)
    where
        F: Fn(&Patient) -> bool,
    {
        let patients = self.patients.read();
        let matching: Vec<&Patient> = patients
            .values()
            .filter(|p| !p.deleted)
            .map(|p| &p.patient)
            .filter(|&p| filter(p))
            .collect();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        (items, total)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account_by_identifier(&self, identifier: &str) -> Result<Account, StorageError> {
        self.accounts
            .read()
            .get(identifier)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("Account not found: {}", identifier)))
    }

    async fn create_account(&self, account: &Account) -> Result<(), StorageError> {
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&account.identifier) {
            return Err(StorageError::Conflict(format!(
                "Account already exists: {}",
                account.identifier
            )));
        }
        accounts.insert(account.identifier.clone(), account.clone());
        Ok(())
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn insert_patient(&self, patient: &Patient) -> Result<Patient, StorageError> {
        let mut patients = self.patients.write();

        if !patient.email.is_empty()
            && patients
                .values()
                .any(|p| !p.deleted && p.patient.email == patient.email)
        {
            return Err(StorageError::Conflict(format!(
                "Patient email already registered: {}",
                patient.email
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = patient.clone();
        stored.id = id;

        patients.insert(
            id,
            StoredPatient {
                patient: stored.clone(),
                deleted: false,
            },
        );

        Ok(stored)
    }

    async fn get_patient(&self, id: i64) -> Result<Patient, StorageError> {
        self.patients
            .read()
            .get(&id)
            .filter(|p| !p.deleted)
            .map(|p| p.patient.clone())
            .ok_or_else(|| StorageError::NotFound(format!("Patient not found: {}", id)))
    }

    async fn list_patients(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<Patient>, u64), StorageError> {
        Ok(self.page_where(limit, offset, |_| true))
    }

    async fn search_patients(
        &self,
        term: &str,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<Patient>, u64), StorageError> {
        Ok(self.page_where(limit, offset, |p| patient_matches(p, term)))
    }

    async fn update_patient_fields(
        &self,
        id: i64,
        patch: &PatientPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Patient, StorageError> {
        // Check and write under one lock so concurrent patches compose
        let mut patients = self.patients.write();
        let not_found = || StorageError::NotFound(format!("Patient not found: {}", id));

        if !patients.get(&id).is_some_and(|s| !s.deleted) {
            return Err(not_found());
        }

        if let Some(email) = patch.demographic.email.as_deref() {
            if !email.is_empty()
                && patients
                    .values()
                    .any(|p| !p.deleted && p.patient.id != id && p.patient.email == email)
            {
                return Err(StorageError::Conflict(format!(
                    "Patient email already registered: {}",
                    email
                )));
            }
        }

        let stored = patients.get_mut(&id).ok_or_else(not_found)?;
        patch.apply(&mut stored.patient);
        stored.patient.updated_at = updated_at;
        Ok(stored.patient.clone())
    }

    async fn delete_patient(&self, id: i64) -> Result<(), StorageError> {
        match self.patients.write().get_mut(&id) {
            Some(stored) if !stored.deleted => {
                stored.deleted = true;
                Ok(())
            }
            _ => Err(StorageError::NotFound(format!("Patient not found: {}", id))),
        }
    }
}
