//! Roles and the role policy
//!
//! Authorization is keyed purely on the caller's role. There is no hierarchy
//! and no wildcard: a route that requires `clinician` admits clinicians only.
//!
//! Field writes are split by role as well:
//! - `front_desk` may write demographic/contact fields
//! - `clinician` may write clinical fields

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown role '{0}': expected 'front_desk' or 'clinician'")]
pub struct UnknownRole(pub String);

/// The closed set of account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Registers patients and maintains their contact details
    FrontDesk,
    /// Maintains the clinical part of a patient record
    Clinician,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::FrontDesk, Role::Clinician];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::FrontDesk => "front_desk",
            Role::Clinician => "clinician",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front_desk" => Ok(Role::FrontDesk),
            "clinician" => Ok(Role::Clinician),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Groups of patient-record fields that share a write rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    /// Names, birth date, gender, contact and emergency-contact details
    Demographic,
    /// Blood group, allergies, history, medication, notes
    Clinical,
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldGroup::Demographic => write!(f, "demographic"),
            FieldGroup::Clinical => write!(f, "clinical"),
        }
    }
}

/// Route-level check: does `actual` satisfy a stage that requires `required`?
pub fn is_allowed(actual: Role, required: Role) -> bool {
    match (actual, required) {
        (Role::FrontDesk, Role::FrontDesk) => true,
        (Role::Clinician, Role::Clinician) => true,
        (Role::FrontDesk, Role::Clinician) | (Role::Clinician, Role::FrontDesk) => false,
    }
}

/// Field-level check applied by record operations
pub fn can_write(role: Role, group: FieldGroup) -> bool {
    match (role, group) {
        (Role::FrontDesk, FieldGroup::Demographic) => true,
        (Role::FrontDesk, FieldGroup::Clinical) => false,
        (Role::Clinician, FieldGroup::Demographic) => false,
        (Role::Clinician, FieldGroup::Clinical) => true,
    }
}
