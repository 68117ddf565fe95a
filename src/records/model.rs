//! Patient record types

use crate::auth::FieldGroup;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller asks for nothing or something out of range
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("invalid gender '{}'", other)),
        }
    }
}

/// A stored patient record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,

    // Demographic / contact
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub contact_number: String,
    pub email: String,
    pub address: String,
    pub emergency_name: String,
    pub emergency_number: String,

    // Clinical
    pub blood_group: String,
    pub allergies: String,
    pub medical_history: String,
    pub current_medication: String,
    pub notes: String,

    /// Identifier of the account that registered the patient
    pub registered_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Demographic and contact fields of a write request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_name: Option<String>,
    pub emergency_number: Option<String>,
}

impl DemographicPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Clinical fields of a write request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalPatch {
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub current_medication: Option<String>,
    pub notes: Option<String>,
}

impl ClinicalPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Body of every patient write. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientPatch {
    #[serde(flatten)]
    pub demographic: DemographicPatch,
    #[serde(flatten)]
    pub clinical: ClinicalPatch,
}

impl PatientPatch {
    pub fn demographic(demographic: DemographicPatch) -> Self {
        Self {
            demographic,
            clinical: ClinicalPatch::default(),
        }
    }

    pub fn clinical(clinical: ClinicalPatch) -> Self {
        Self {
            demographic: DemographicPatch::default(),
            clinical,
        }
    }

    /// Field groups this patch writes to
    pub fn field_groups(&self) -> Vec<FieldGroup> {
        let mut groups = Vec::with_capacity(2);
        if !self.demographic.is_empty() {
            groups.push(FieldGroup::Demographic);
        }
        if !self.clinical.is_empty() {
            groups.push(FieldGroup::Clinical);
        }
        groups
    }

    pub fn is_empty(&self) -> bool {
        self.demographic.is_empty() && self.clinical.is_empty()
    }

    /// Write the present fields onto `patient`
    pub fn apply(&self, patient: &mut Patient) {
        let d = &self.demographic;
        if let Some(v) = &d.first_name {
            patient.first_name = v.clone();
        }
        if let Some(v) = &d.last_name {
            patient.last_name = v.clone();
        }
        if let Some(v) = d.date_of_birth {
            patient.date_of_birth = v;
        }
        if let Some(v) = d.gender {
            patient.gender = v;
        }
        if let Some(v) = &d.contact_number {
            patient.contact_number = v.clone();
        }
        if let Some(v) = &d.email {
            patient.email = v.clone();
        }
        if let Some(v) = &d.address {
            patient.address = v.clone();
        }
        if let Some(v) = &d.emergency_name {
            patient.emergency_name = v.clone();
        }
        if let Some(v) = &d.emergency_number {
            patient.emergency_number = v.clone();
        }

        let c = &self.clinical;
        if let Some(v) = &c.blood_group {
            patient.blood_group = v.clone();
        }
        if let Some(v) = &c.allergies {
            patient.allergies = v.clone();
        }
        if let Some(v) = &c.medical_history {
            patient.medical_history = v.clone();
        }
        if let Some(v) = &c.current_medication {
            patient.current_medication = v.clone();
        }
        if let Some(v) = &c.notes {
            patient.notes = v.clone();
        }
    }
}

/// Normalised pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Clamp raw values: a page below 1 becomes 1, a size outside
    /// `1..=MAX_PAGE_SIZE` becomes `DEFAULT_PAGE_SIZE`.
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = if page < 1 { 1 } else { page.min(u32::MAX as i64) as u32 };
        let page_size = if page_size < 1 || page_size > MAX_PAGE_SIZE as i64 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size as u32
        };
        Self { page, page_size }
    }

    /// Lenient parse of query-string values; garbage falls back to defaults
    pub fn from_query(page: Option<&str>, page_size: Option<&str>) -> Self {
        let page = page.and_then(|p| p.trim().parse().ok()).unwrap_or(1);
        let page_size = page_size
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE as i64);
        Self::new(page, page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE as i64)
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_items: u64,
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: u64, request: PageRequest) -> Self {
        let size = request.page_size as u64;
        Self {
            total_items,
            items,
            page: request.page,
            page_size: request.page_size,
            total_pages: total_items.div_ceil(size),
        }
    }
}
