use std::cmp::Ordering;

use shared::domain::Applicant;

const MARKS_WEIGHT: f64 = 0.6;
const ENTRANCE_WEIGHT: f64 = 0.4;

pub fn final_score(applicant: &Applicant) -> f64 {
    applicant.marks_12 * MARKS_WEIGHT + applicant.entrance_score * ENTRANCE_WEIGHT
}

/// Scores every applicant and orders them best first, assigning ranks from 1.
///
/// Ties on score go to the older applicant; full ties keep their existing
/// relative order.
pub fn rank_applicants(applicants: &mut [Applicant]) {
    for applicant in applicants.iter_mut() {
        applicant.final_score = final_score(applicant);
    }

    applicants.sort_by(|a, b| {
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| b.age.cmp(&a.age))
    });

    for (idx, applicant) in applicants.iter_mut().enumerate() {
        applicant.rank = Some(idx as u32 + 1);
    }
}

/// Orders by rank, unranked applicants last.
pub fn by_rank(a: &Applicant, b: &Applicant) -> Ordering {
    match (a.rank, b.rank) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
#[path = "tests/merit_tests.rs"]
mod tests;
