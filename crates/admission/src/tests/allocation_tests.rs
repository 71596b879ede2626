use std::collections::BTreeMap;

use shared::domain::{Category, Department};

use super::*;
use crate::{department_map, merit::rank_applicants};

fn applicant(id: i64, marks: f64, preferences: &[&str]) -> Applicant {
    Applicant::new(
        ApplicantId(id),
        format!("applicant-{id}"),
        18,
        marks,
        marks,
        preferences.iter().map(|p| p.to_string()).collect(),
    )
}

fn departments() -> DepartmentMap {
    department_map([
        Department::new("CS", 2),
        Department::new("MECH", 1),
        Department::new("CIVIL", 1),
    ])
}

#[test]
fn best_ranked_applicants_get_their_first_choice() {
    let mut applicants = vec![
        applicant(1, 70.0, &["CS"]),
        applicant(2, 95.0, &["CS"]),
        applicant(3, 90.0, &["CS"]),
    ];
    rank_applicants(&mut applicants);
    let mut departments = departments();

    let summary = allocate_seats(&mut applicants, &mut departments);

    assert_eq!(summary.selected, vec![ApplicantId(2), ApplicantId(3)]);
    assert_eq!(summary.waiting, vec![ApplicantId(1)]);
    assert_eq!(departments["CS"].filled(Category::General), 2);
}

#[test]
fn falls_through_to_later_preferences() {
    let mut applicants = vec![
        applicant(1, 99.0, &["MECH"]),
        applicant(2, 80.0, &["MECH", "CIVIL"]),
    ];
    rank_applicants(&mut applicants);
    let mut departments = departments();

    allocate_seats(&mut applicants, &mut departments);

    let second = applicants.iter().find(|a| a.id == ApplicantId(2)).expect("applicant");
    assert_eq!(second.admission_status, AdmissionStatus::Selected);
    assert_eq!(second.allocated_department.as_deref(), Some("CIVIL"));
}

#[test]
fn unknown_departments_only_lead_to_rejection() {
    let mut applicants = vec![applicant(1, 99.0, &["ARTS"])];
    rank_applicants(&mut applicants);
    let mut departments = departments();

    let summary = allocate_seats(&mut applicants, &mut departments);

    assert_eq!(summary.rejected, vec![ApplicantId(1)]);
    assert_eq!(applicants[0].admission_status, AdmissionStatus::Rejected);
}

#[test]
fn category_without_quota_waits() {
    let mut applicants = vec![applicant(1, 99.0, &["CS"])];
    applicants[0].category = Category::Sc;
    rank_applicants(&mut applicants);
    let mut departments = departments();

    allocate_seats(&mut applicants, &mut departments);

    assert_eq!(applicants[0].admission_status, AdmissionStatus::Waiting);
}

#[test]
fn reserved_quota_admits_its_category() {
    let mut applicants = vec![applicant(1, 60.0, &["CS"]).with_category(Category::Obc)];
    rank_applicants(&mut applicants);
    let mut departments = department_map([Department::with_quotas(
        "CS",
        2,
        BTreeMap::from([(Category::General, 1), (Category::Obc, 1)]),
    )]);

    allocate_seats(&mut applicants, &mut departments);

    assert_eq!(applicants[0].admission_status, AdmissionStatus::Selected);
    assert_eq!(departments["CS"].filled(Category::Obc), 1);
}

#[test]
fn only_applied_applicants_are_considered() {
    let mut applicants = vec![applicant(1, 99.0, &["MECH"]), applicant(2, 50.0, &["MECH"])];
    rank_applicants(&mut applicants);
    applicants[0].admission_status = AdmissionStatus::Cancelled;
    let mut departments = departments();

    let summary = allocate_seats(&mut applicants, &mut departments);

    assert_eq!(summary.selected, vec![ApplicantId(2)]);
    assert_eq!(applicants[0].admission_status, AdmissionStatus::Cancelled);
}

#[test]
fn allocation_does_not_reorder_the_slice() {
    let mut applicants = vec![applicant(1, 10.0, &["CS"]), applicant(2, 90.0, &["CS"])];
    applicants[0].rank = Some(2);
    applicants[1].rank = Some(1);
    let mut departments = departments();

    allocate_seats(&mut applicants, &mut departments);

    assert_eq!(applicants[0].id, ApplicantId(1));
}

#[test]
fn reallocation_moves_the_best_waiting_applicant_once() {
    let mut applicants = vec![
        applicant(1, 99.0, &["MECH"]),
        applicant(2, 90.0, &["MECH"]),
        applicant(3, 80.0, &["MECH"]),
    ];
    rank_applicants(&mut applicants);
    let mut departments = departments();
    allocate_seats(&mut applicants, &mut departments);
    assert!(applicants[1..]
        .iter()
        .all(|a| a.admission_status == AdmissionStatus::Waiting));

    departments
        .get_mut("MECH")
        .expect("mech")
        .release(Category::General);
    let moved = reallocate_waiting(&mut applicants, &mut departments);

    assert_eq!(moved, Some(ApplicantId(2)));
    assert_eq!(applicants[1].admission_status, AdmissionStatus::Selected);
    assert_eq!(applicants[2].admission_status, AdmissionStatus::Waiting);
    assert_eq!(reallocate_waiting(&mut applicants, &mut departments), None);
}
