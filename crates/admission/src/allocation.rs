use shared::{
    domain::{AdmissionStatus, Applicant, ApplicantId, DocumentStatus},
    protocol::AllocationSummary,
};

use crate::{merit::by_rank, DepartmentMap};

/// Runs one allocation round over every applicant still in `Applied`.
///
/// Applicants are visited in rank order; the slice itself is not reordered.
pub fn allocate_seats(
    applicants: &mut [Applicant],
    departments: &mut DepartmentMap,
) -> AllocationSummary {
    let mut summary = AllocationSummary::default();

    for idx in rank_order(applicants) {
        let applicant = &mut applicants[idx];
        if applicant.admission_status != AdmissionStatus::Applied {
            continue;
        }

        if place(applicant, departments) {
            summary.selected.push(applicant.id);
        } else if has_known_preference(applicant, departments) {
            applicant.admission_status = AdmissionStatus::Waiting;
            summary.waiting.push(applicant.id);
        } else {
            applicant.admission_status = AdmissionStatus::Rejected;
            summary.rejected.push(applicant.id);
        }
    }

    summary
}

/// Moves at most one waiting applicant, the best ranked one that fits, into
/// a free seat.
pub fn reallocate_waiting(
    applicants: &mut [Applicant],
    departments: &mut DepartmentMap,
) -> Option<ApplicantId> {
    for idx in rank_order(applicants) {
        let applicant = &mut applicants[idx];
        if applicant.admission_status != AdmissionStatus::Waiting {
            continue;
        }
        if place(applicant, departments) {
            return Some(applicant.id);
        }
    }
    None
}

fn rank_order(applicants: &[Applicant]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..applicants.len()).collect();
    order.sort_by(|&a, &b| by_rank(&applicants[a], &applicants[b]));
    order
}

fn place(applicant: &mut Applicant, departments: &mut DepartmentMap) -> bool {
    for preference in &applicant.preferences {
        let Some(department) = departments.get_mut(preference) else {
            continue;
        };
        if department.can_admit(applicant.category) {
            department.occupy(applicant.category);
            applicant.admission_status = AdmissionStatus::Selected;
            applicant.document_status = DocumentStatus::Pending;
            applicant.allocated_department = Some(preference.clone());
            return true;
        }
    }
    false
}

fn has_known_preference(applicant: &Applicant, departments: &DepartmentMap) -> bool {
    applicant
        .preferences
        .iter()
        .any(|preference| departments.contains_key(preference))
}

#[cfg(test)]
#[path = "tests/allocation_tests.rs"]
mod tests;
