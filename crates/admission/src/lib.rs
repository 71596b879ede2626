//! Admission rules: merit ranking, seat allocation, document review and the
//! artefacts handed to applicants. Everything here works on in-memory
//! values; persistence is the caller's concern.

pub mod allocation;
pub mod error;
pub mod letter;
pub mod marks;
pub mod merit;
pub mod notice;
pub mod review;

pub use error::AdmissionError;

use std::collections::BTreeMap;

use shared::domain::Department;

/// Departments keyed by name, as allocation looks them up.
pub type DepartmentMap = BTreeMap<String, Department>;

pub fn department_map(departments: impl IntoIterator<Item = Department>) -> DepartmentMap {
    departments
        .into_iter()
        .map(|department| (department.name.clone(), department))
        .collect()
}
