use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiException, ErrorCode};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ApplicantId);

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ApiException;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let raw = raw.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|value| value.as_str().eq_ignore_ascii_case(raw))
                    .ok_or_else(|| {
                        ApiException::new(
                            ErrorCode::Validation,
                            format!("unknown {} '{raw}'", stringify!($name)),
                        )
                    })
            }
        }
    };
}

/// Reservation category an applicant competes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    General,
    #[serde(rename = "OBC")]
    Obc,
    #[serde(rename = "SC")]
    Sc,
    #[serde(rename = "ST")]
    St,
    #[serde(rename = "EWS")]
    Ews,
}

string_enum!(Category {
    General => "General",
    Obc => "OBC",
    Sc => "SC",
    St => "ST",
    Ews => "EWS",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AdmissionStatus {
    #[default]
    Applied,
    Selected,
    Waiting,
    Rejected,
    Cancelled,
    Confirmed,
}

string_enum!(AdmissionStatus {
    Applied => "Applied",
    Selected => "Selected",
    Waiting => "Waiting",
    Rejected => "Rejected",
    Cancelled => "Cancelled",
    Confirmed => "Confirmed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DocumentStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

string_enum!(DocumentStatus {
    Pending => "Pending",
    Verified => "Verified",
    Rejected => "Rejected",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub name: String,
    pub age: u32,
    pub marks_12: f64,
    pub entrance_score: f64,
    /// Department names in order of preference.
    pub preferences: Vec<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub final_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated_department: Option<String>,
    #[serde(default)]
    pub admission_status: AdmissionStatus,
    #[serde(default)]
    pub document_status: DocumentStatus,
    #[serde(default)]
    pub marks_verified: bool,
    pub registered_at: DateTime<Utc>,
}

impl Applicant {
    pub fn new(
        id: ApplicantId,
        name: impl Into<String>,
        age: u32,
        marks_12: f64,
        entrance_score: f64,
        preferences: Vec<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            age,
            marks_12,
            entrance_score,
            preferences,
            category: Category::General,
            final_score: 0.0,
            rank: None,
            allocated_department: None,
            admission_status: AdmissionStatus::Applied,
            document_status: DocumentStatus::Pending,
            marks_verified: false,
            registered_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }
}

/// A department with per-category seat quotas.
///
/// Quotas are hard limits: a category without a quota entry never gets a
/// seat, and unused seats of one category are not lent to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub name: String,
    pub total_seats: u32,
    pub quotas: BTreeMap<Category, u32>,
    #[serde(default)]
    pub filled_seats: BTreeMap<Category, u32>,
}

impl Department {
    /// All seats go to the General quota.
    pub fn new(name: impl Into<String>, total_seats: u32) -> Self {
        Self::with_quotas(name, total_seats, BTreeMap::from([(Category::General, total_seats)]))
    }

    pub fn with_quotas(
        name: impl Into<String>,
        total_seats: u32,
        quotas: BTreeMap<Category, u32>,
    ) -> Self {
        Self {
            name: name.into(),
            total_seats,
            quotas,
            filled_seats: Category::ALL.iter().map(|category| (*category, 0)).collect(),
        }
    }

    pub fn filled(&self, category: Category) -> u32 {
        self.filled_seats.get(&category).copied().unwrap_or(0)
    }

    pub fn quota(&self, category: Category) -> u32 {
        self.quotas.get(&category).copied().unwrap_or(0)
    }

    pub fn available_seats(&self) -> u32 {
        let filled: u32 = self.filled_seats.values().sum();
        self.total_seats.saturating_sub(filled)
    }

    pub fn can_admit(&self, category: Category) -> bool {
        self.filled(category) < self.quota(category)
    }

    pub fn occupy(&mut self, category: Category) {
        *self.filled_seats.entry(category).or_insert(0) += 1;
    }

    pub fn release(&mut self, category: Category) {
        let filled = self.filled_seats.entry(category).or_insert(0);
        *filled = filled.saturating_sub(1);
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
