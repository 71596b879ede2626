use shared::{
    confirm::ReviewDecision,
    domain::{AdmissionStatus, Applicant, DocumentStatus},
};

use crate::{AdmissionError, DepartmentMap};

/// Applies a reviewer's decision to a selected applicant.
///
/// A rejection hands the seat back to its department; refilling it from the
/// waiting list is left to the caller.
pub fn apply_decision(
    applicant: &mut Applicant,
    decision: ReviewDecision,
    departments: &mut DepartmentMap,
) -> Result<(), AdmissionError> {
    if applicant.admission_status != AdmissionStatus::Selected {
        return Err(AdmissionError::UnexpectedStatus {
            applicant: applicant.id,
            expected: AdmissionStatus::Selected,
            actual: applicant.admission_status,
        });
    }

    match decision {
        ReviewDecision::Approve => {
            if applicant.allocated_department.is_none() {
                return Err(AdmissionError::NoAllocation(applicant.id));
            }
            applicant.document_status = DocumentStatus::Verified;
            applicant.admission_status = AdmissionStatus::Confirmed;
        }
        ReviewDecision::Reject => {
            if let Some(name) = applicant.allocated_department.take() {
                if let Some(department) = departments.get_mut(&name) {
                    department.release(applicant.category);
                }
            }
            applicant.document_status = DocumentStatus::Rejected;
            applicant.admission_status = AdmissionStatus::Cancelled;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/review_tests.rs"]
mod tests;
