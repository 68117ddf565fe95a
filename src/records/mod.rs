//! Patient records
//!
//! Record fields are split into two groups with separate write rules:
//! front desk staff own the demographic/contact group, clinicians own the
//! clinical group. `PatientService` enforces the split on every write.

mod model;
mod service;

pub use model::{
    ClinicalPatch, DemographicPatch, Gender, Page, PageRequest, Patient, PatientPatch,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use service::{PatientService, RecordError};
