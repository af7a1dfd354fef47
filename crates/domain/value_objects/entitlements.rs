use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::access_types::{AccessLevel, AccessType};

/// Whole-library view: how many divisions the user can open out of the published total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryAccess {
    pub accessible_divisions: u64,
    pub total_divisions: u64,
    pub has_all_access: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessSummary {
    pub has_access: bool,
    pub access_type: AccessType,
    pub access_level: AccessLevel,
    pub purchased_divisions: Vec<Uuid>,
}

impl AccessSummary {
    pub fn none() -> Self {
        Self {
            has_access: false,
            access_type: AccessType::None,
            access_level: AccessLevel::None,
            purchased_divisions: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckDivisionAccessRequest {
    #[serde(default)]
    pub division_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckBookAccessRequest {
    #[serde(default)]
    pub book_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResourceAccessDto {
    pub resource_id: String,
    pub has_access: bool,
    pub access_type: AccessType,
}

impl ResourceAccessDto {
    pub fn denied(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            has_access: false,
            access_type: AccessType::None,
        }
    }
}
