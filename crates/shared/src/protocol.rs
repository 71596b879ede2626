use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    confirm::ReviewDecision,
    domain::{Applicant, ApplicantId, Category, Department},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterApplicantRequest {
    pub name: String,
    pub age: u32,
    pub marks_12: f64,
    pub entrance_score: f64,
    pub preferences: Vec<String>,
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub name: String,
    pub total_seats: u32,
    pub available_seats: u32,
    pub quotas: BTreeMap<Category, u32>,
    pub filled_seats: BTreeMap<Category, u32>,
}

impl From<&Department> for DepartmentSummary {
    fn from(department: &Department) -> Self {
        Self {
            name: department.name.clone(),
            total_seats: department.total_seats,
            available_seats: department.available_seats(),
            quotas: department.quotas.clone(),
            filled_seats: department.filled_seats.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub selected: Vec<ApplicantId>,
    pub waiting: Vec<ApplicantId>,
    pub rejected: Vec<ApplicantId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub applicant: Applicant,
    /// Waiting applicant moved into the seat a rejection freed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reallocated: Option<ApplicantId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MarksCheck {
    Verified { found: f64 },
    Mismatch { claimed: f64, found: f64 },
    Unreadable,
}

impl MarksCheck {
    pub fn is_verified(&self) -> bool {
        matches!(self, MarksCheck::Verified { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarksheetResponse {
    pub applicant_id: ApplicantId,
    #[serde(flatten)]
    pub check: MarksCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    ApplicantRegistered {
        applicant_id: ApplicantId,
        name: String,
    },
    MeritListGenerated {
        ranked: usize,
        generated_at: DateTime<Utc>,
    },
    ApplicantSelected {
        applicant_id: ApplicantId,
        name: String,
        department: String,
    },
    AdmissionConfirmed {
        applicant_id: ApplicantId,
        name: String,
    },
    AdmissionCancelled {
        applicant_id: ApplicantId,
        name: String,
    },
}

impl ServerEvent {
    pub fn selected(applicant: &Applicant) -> Option<Self> {
        applicant
            .allocated_department
            .as_ref()
            .map(|department| ServerEvent::ApplicantSelected {
                applicant_id: applicant.id,
                name: applicant.name.clone(),
                department: department.clone(),
            })
    }
}
