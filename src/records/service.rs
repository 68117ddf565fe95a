//! Patient record operations with field-level authorization

use crate::auth::{can_write, FieldGroup, Identity, Role};
use crate::records::model::{DemographicPatch, Page, PageRequest, Patient, PatientPatch};
use crate::storage::{PatientStore, StorageError};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("patient {0} not found")]
    NotFound(i64),

    #[error("role '{role}' may not write {group} fields")]
    Forbidden { role: Role, group: FieldGroup },

    #[error("role '{0}' may not delete patients")]
    DeleteForbidden(Role),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl RecordError {
    fn from_storage(e: StorageError, id: i64) -> Self {
        match e {
            StorageError::NotFound(_) => RecordError::NotFound(id),
            StorageError::Conflict(msg) => RecordError::Conflict(msg),
            other => RecordError::Storage(other),
        }
    }
}

/// Patient CRUD and search on behalf of an authenticated caller
#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn PatientStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }

    /// Register a new patient. Clinical fields start empty.
    pub async fn create(&self, caller: &Identity, patch: PatientPatch) -> Result<Patient, RecordError> {
        authorize_groups(caller, &[FieldGroup::Demographic])?;
        authorize_groups(caller, &patch.field_groups())?;

        let d = patch.demographic;
        let now = Utc::now();
        let patient = Patient {
            id: 0,
            first_name: d.first_name.unwrap_or_default(),
            last_name: d.last_name.unwrap_or_default(),
            date_of_birth: d
                .date_of_birth
                .ok_or_else(|| RecordError::Invalid("date_of_birth is required".to_string()))?,
            gender: d
                .gender
                .ok_or_else(|| RecordError::Invalid("gender is required".to_string()))?,
            contact_number: d.contact_number.unwrap_or_default(),
            email: d.email.unwrap_or_default(),
            address: d.address.unwrap_or_default(),
            emergency_name: d.emergency_name.unwrap_or_default(),
            emergency_number: d.emergency_number.unwrap_or_default(),
            blood_group: String::new(),
            allergies: String::new(),
            medical_history: String::new(),
            current_medication: String::new(),
            notes: String::new(),
            registered_by: caller.subject.clone(),
            created_at: now,
            updated_at: now,
        };
        validate(&patient)?;

        let stored = self
            .store
            .insert_patient(&patient)
            .await
            .map_err(|e| RecordError::from_storage(e, 0))?;

        info!(patient_id = stored.id, by = %caller.subject, "Registered patient");
        Ok(stored)
    }

    pub async fn get(&self, caller: &Identity, id: i64) -> Result<Patient, RecordError> {
        debug!(patient_id = id, by = %caller.subject, "Fetching patient");
        self.store
            .get_patient(id)
            .await
            .map_err(|e| RecordError::from_storage(e, id))
    }

    pub async fn list(&self, caller: &Identity, page: PageRequest) -> Result<Page<Patient>, RecordError> {
        debug!(by = %caller.subject, page = page.page, "Listing patients");
        let (items, total) = self
            .store
            .list_patients(page.limit(), page.offset())
            .await
            .map_err(RecordError::Storage)?;
        Ok(Page::new(items, total, page))
    }

    pub async fn search(
        &self,
        caller: &Identity,
        term: &str,
        page: PageRequest,
    ) -> Result<Page<Patient>, RecordError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(RecordError::Invalid("search term is required".to_string()));
        }

        debug!(by = %caller.subject, page = page.page, "Searching patients");
        let (items, total) = self
            .store
            .search_patients(term, page.limit(), page.offset())
            .await
            .map_err(RecordError::Storage)?;
        Ok(Page::new(items, total, page))
    }

    /// Apply a patch. Every field group it touches must be writable by the
    /// caller's role; otherwise nothing is written.
    pub async fn update(
        &self,
        caller: &Identity,
        id: i64,
        patch: PatientPatch,
    ) -> Result<Patient, RecordError> {
        if patch.is_empty() {
            return Err(RecordError::Invalid("no fields to update".to_string()));
        }
        authorize_groups(caller, &patch.field_groups())?;

        validate_patch(&patch.demographic)?;

        let stored = self
            .store
            .update_patient_fields(id, &patch, Utc::now())
            .await
            .map_err(|e| RecordError::from_storage(e, id))?;

        info!(patient_id = id, by = %caller.subject, role = %caller.role, "Updated patient");
        Ok(stored)
    }

    pub async fn delete(&self, caller: &Identity, id: i64) -> Result<(), RecordError> {
        if caller.role != Role::FrontDesk {
            return Err(RecordError::DeleteForbidden(caller.role));
        }

        self.store
            .delete_patient(id)
            .await
            .map_err(|e| RecordError::from_storage(e, id))?;

        info!(patient_id = id, by = %caller.subject, "Deleted patient");
        Ok(())
    }
}

fn authorize_groups(caller: &Identity, groups: &[FieldGroup]) -> Result<(), RecordError> {
    match groups.iter().find(|g| !can_write(caller.role, **g)) {
        Some(&group) => {
            debug!(subject = %caller.subject, role = %caller.role, group = %group, "Field write denied");
            Err(RecordError::Forbidden {
                role: caller.role,
                group,
            })
        }
        None => Ok(()),
    }
}

fn validate(patient: &Patient) -> Result<(), RecordError> {
    let required = [
        ("first_name", &patient.first_name),
        ("last_name", &patient.last_name),
        ("contact_number", &patient.contact_number),
        ("address", &patient.address),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(RecordError::Invalid(format!("{} is required", name)));
        }
    }

    if !patient.email.is_empty() && !patient.email.contains('@') {
        return Err(RecordError::Invalid(format!("invalid email '{}'", patient.email)));
    }

    Ok(())
}

/// Validates only the fields the patch writes
fn validate_patch(patch: &DemographicPatch) -> Result<(), RecordError> {
    let required = [
        ("first_name", &patch.first_name),
        ("last_name", &patch.last_name),
        ("contact_number", &patch.contact_number),
        ("address", &patch.address),
    ];
    for (name, value) in required {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(RecordError::Invalid(format!("{} is required", name)));
        }
    }

    match patch.email.as_deref() {
        Some(email) if !email.is_empty() && !email.contains('@') => {
            Err(RecordError::Invalid(format!("invalid email '{}'", email)))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::model::{ClinicalPatch, DemographicPatch};
    use crate::records::Gender;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    fn nurse() -> Identity {
        Identity {
            subject: "nurse@example.com".to_string(),
            role: Role::FrontDesk,
        }
    }

    fn doctor() -> Identity {
        Identity {
            subject: "doc@example.com".to_string(),
            role: Role::Clinician,
        }
    }

    fn registration(first: &str, email: &str) -> PatientPatch {
        PatientPatch::demographic(DemographicPatch {
            first_name: Some(first.to_string()),
            last_name: Some("Lopez".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 2, 14),
            gender: Some(Gender::Female),
            contact_number: Some("555-1234".to_string()),
            email: Some(email.to_string()),
            address: Some("12 Elm St".to_string()),
            ..Default::default()
        })
    }

    fn service() -> PatientService {
        PatientService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_by_front_desk() {
        let svc = service();
        let patient = svc.create(&nurse(), registration("Maria", "maria@example.com")).await.unwrap();

        assert_eq!(patient.id, 1);
        assert_eq!(patient.registered_by, "nurse@example.com");
        assert!(patient.allergies.is_empty());
    }

    #[tokio::test]
    async fn test_create_by_clinician_forbidden() {
        let svc = service();
        let err = svc.create(&doctor(), registration("Maria", "")).await.unwrap_err();
        assert!(matches!(
            err,
            RecordError::Forbidden { role: Role::Clinician, group: FieldGroup::Demographic }
        ));
    }

    #[tokio::test]
    async fn test_create_with_clinical_fields_forbidden() {
        let svc = service();
        let mut patch = registration("Maria", "");
        patch.clinical.allergies = Some("penicillin".to_string());

        let err = svc.create(&nurse(), patch).await.unwrap_err();
        assert!(matches!(err, RecordError::Forbidden { group: FieldGroup::Clinical, .. }));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let svc = service();

        let mut missing_name = registration("", "");
        missing_name.demographic.first_name = None;
        assert!(matches!(
            svc.create(&nurse(), missing_name).await,
            Err(RecordError::Invalid(_))
        ));

        assert!(matches!(
            svc.create(&nurse(), registration("Maria", "not-an-email")).await,
            Err(RecordError::Invalid(_))
        ));

        let mut no_gender = registration("Maria", "");
        no_gender.demographic.gender = None;
        assert!(matches!(svc.create(&nurse(), no_gender).await, Err(RecordError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflict() {
        let svc = service();
        svc.create(&nurse(), registration("Maria", "m@example.com")).await.unwrap();
        assert!(matches!(
            svc.create(&nurse(), registration("Marta", "m@example.com")).await,
            Err(RecordError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_field_split_on_update() {
        let svc = service();
        let id = svc.create(&nurse(), registration("Maria", "")).await.unwrap().id;

        let clinical = PatientPatch::clinical(ClinicalPatch {
            allergies: Some("penicillin".to_string()),
            ..Default::default()
        });
        let demographic = PatientPatch::demographic(DemographicPatch {
            address: Some("99 Oak Ave".to_string()),
            ..Default::default()
        });

        // Each role can write its own group
        let updated = svc.update(&doctor(), id, clinical.clone()).await.unwrap();
        assert_eq!(updated.allergies, "penicillin");
        let updated = svc.update(&nurse(), id, demographic.clone()).await.unwrap();
        assert_eq!(updated.address, "99 Oak Ave");
        assert_eq!(updated.allergies, "penicillin");

        // And not the other one
        assert!(matches!(
            svc.update(&nurse(), id, clinical).await,
            Err(RecordError::Forbidden { group: FieldGroup::Clinical, .. })
        ));
        assert!(matches!(
            svc.update(&doctor(), id, demographic).await,
            Err(RecordError::Forbidden { group: FieldGroup::Demographic, .. })
        ));
    }

    #[tokio::test]
    async fn test_mixed_patch_writes_nothing() {
        let svc = service();
        let id = svc.create(&nurse(), registration("Maria", "")).await.unwrap().id;

        let mut patch = PatientPatch::demographic(DemographicPatch {
            address: Some("1 New St".to_string()),
            ..Default::default()
        });
        patch.clinical.notes = Some("sneaky".to_string());

        assert!(svc.update(&nurse(), id, patch).await.is_err());
        let stored = svc.get(&nurse(), id).await.unwrap();
        assert_eq!(stored.address, "12 Elm St");
        assert!(stored.notes.is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_empty_and_missing() {
        let svc = service();
        assert!(matches!(
            svc.update(&nurse(), 1, PatientPatch::default()).await,
            Err(RecordError::Invalid(_))
        ));

        let patch = PatientPatch::demographic(DemographicPatch {
            address: Some("x".to_string()),
            ..Default::default()
        });
        assert!(matches!(svc.update(&nurse(), 42, patch).await, Err(RecordError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_delete_is_front_desk_only() {
        let svc = service();
        let id = svc.create(&nurse(), registration("Maria", "")).await.unwrap().id;

        assert!(matches!(
            svc.delete(&doctor(), id).await,
            Err(RecordError::DeleteForbidden(Role::Clinician))
        ));
        svc.delete(&nurse(), id).await.unwrap();
        assert!(matches!(svc.get(&doctor(), id).await, Err(RecordError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_and_search_paging() {
        let svc = service();
        for i in 0..12 {
            svc.create(&nurse(), registration(&format!("Pat{}", i), "")).await.unwrap();
        }

        let page = svc.list(&doctor(), PageRequest::new(2, 5)).await.unwrap();
        assert_eq!(page.total_items, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].first_name, "Pat5");

        let page = svc.search(&nurse(), "pat1", PageRequest::default()).await.unwrap();
        // Pat1, Pat10, Pat11
        assert_eq!(page.total_items, 3);

        assert!(matches!(
            svc.search(&nurse(), "  ", PageRequest::default()).await,
            Err(RecordError::Invalid(_))
        ));
    }

    /// Holds every field update until two are in flight at once
    struct LockstepStore {
        inner: MemoryStore,
        barrier: tokio::sync::Barrier,
    }

    #[async_trait::async_trait]
    impl PatientStore for LockstepStore {
        async fn insert_patient(&self, patient: &Patient) -> Result<Patient, StorageError> {
            self.inner.insert_patient(patient).await
        }

        async fn get_patient(&self, id: i64) -> Result<Patient, StorageError> {
            self.inner.get_patient(id).await
        }

        async fn list_patients(
            &self,
            limit: u32,
            offset: u64,
        ) -> Result<(Vec<Patient>, u64), StorageError> {
            self.inner.list_patients(limit, offset).await
        }

        async fn search_patients(
            &self,
            term: &str,
            limit: u32,
            offset: u64,
        ) -> Result<(Vec<Patient>, u64), StorageError> {
            self.inner.search_patients(term, limit, offset).await
        }

        async fn update_patient_fields(
            &self,
            id: i64,
            patch: &PatientPatch,
            updated_at: chrono::DateTime<Utc>,
        ) -> Result<Patient, StorageError> {
            self.barrier.wait().await;
            self.inner.update_patient_fields(id, patch, updated_at).await
        }

        async fn delete_patient(&self, id: i64) -> Result<(), StorageError> {
            self.inner.delete_patient(id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_different_groups_both_persist() {
        let svc = PatientService::new(Arc::new(LockstepStore {
            inner: MemoryStore::new(),
            barrier: tokio::sync::Barrier::new(2),
        }));
        let id = svc.create(&nurse(), registration("Maria", "")).await.unwrap().id;

        let address = PatientPatch::demographic(DemographicPatch {
            address: Some("7 Birch Rd".to_string()),
            ..Default::default()
        });
        let allergies = PatientPatch::clinical(ClinicalPatch {
            allergies: Some("sulfa".to_string()),
            ..Default::default()
        });

        let (nurse_id, doctor_id) = (nurse(), doctor());
        let (a, b) = tokio::join!(
            svc.update(&nurse_id, id, address),
            svc.update(&doctor_id, id, allergies),
        );
        a.unwrap();
        b.unwrap();

        let stored = svc.get(&doctor(), id).await.unwrap();
        assert_eq!(stored.address, "7 Birch Rd");
        assert_eq!(stored.allergies, "sulfa");
    }

    #[tokio::test]
    async fn test_update_validates_written_fields_only() {
        let svc = service();
        let id = svc.create(&nurse(), registration("Maria", "")).await.unwrap().id;

        let blank_name = PatientPatch::demographic(DemographicPatch {
            last_name: Some("   ".to_string()),
            ..Default::default()
        });
        assert!(matches!(svc.update(&nurse(), id, blank_name).await, Err(RecordError::Invalid(_))));

        let bad_email = PatientPatch::demographic(DemographicPatch {
            email: Some("nope".to_string()),
            ..Default::default()
        });
        assert!(matches!(svc.update(&nurse(), id, bad_email).await, Err(RecordError::Invalid(_))));

        // Clearing the optional email is allowed
        let clear_email = PatientPatch::demographic(DemographicPatch {
            email: Some(String::new()),
            ..Default::default()
        });
        assert!(svc.update(&nurse(), id, clear_email).await.is_ok());
    }
}
