use super::*;

#[test]
fn default_department_gives_every_seat_to_general() {
    let department = Department::new("CS", 2);
    assert_eq!(department.quota(Category::General), 2);
    assert_eq!(department.quota(Category::Obc), 0);
    assert_eq!(department.available_seats(), 2);
    assert!(department.can_admit(Category::General));
    assert!(!department.can_admit(Category::Sc));
}

#[test]
fn occupying_and_releasing_tracks_category_counts() {
    let mut department = Department::new("MECH", 1);
    department.occupy(Category::General);
    assert!(!department.can_admit(Category::General));
    assert_eq!(department.available_seats(), 0);

    department.release(Category::General);
    department.release(Category::General);
    assert_eq!(department.filled(Category::General), 0);
    assert!(department.can_admit(Category::General));
}

#[test]
fn category_quotas_do_not_overflow_into_general() {
    let mut department = Department::with_quotas(
        "CIVIL",
        3,
        BTreeMap::from([(Category::General, 2), (Category::Obc, 1)]),
    );
    department.occupy(Category::Obc);
    assert!(!department.can_admit(Category::Obc));
    assert!(department.can_admit(Category::General));
    assert_eq!(department.available_seats(), 2);
}

#[test]
fn categories_parse_case_insensitively() {
    assert_eq!("obc".parse::<Category>().expect("obc"), Category::Obc);
    assert_eq!(" EWS ".parse::<Category>().expect("ews"), Category::Ews);
    let err = "alien".parse::<Category>().expect_err("unknown");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[test]
fn statuses_round_trip_through_their_names() {
    for status in AdmissionStatus::ALL {
        assert_eq!(status.as_str().parse::<AdmissionStatus>().expect("status"), *status);
    }
    for status in DocumentStatus::ALL {
        assert_eq!(status.to_string().parse::<DocumentStatus>().expect("status"), *status);
    }
}

#[test]
fn category_serializes_with_upper_case_acronyms() {
    let json = serde_json::to_string(&Category::Obc).expect("json");
    assert_eq!(json, "\"OBC\"");
    let department = Department::new("CS", 1);
    let json = serde_json::to_value(&department).expect("json");
    assert_eq!(json["quotas"]["General"], 1);
}

#[test]
fn new_applicant_starts_in_applied_state() {
    let applicant = Applicant::new(ApplicantId(1), "Asha", 18, 91.0, 80.0, vec!["CS".into()]);
    assert_eq!(applicant.admission_status, AdmissionStatus::Applied);
    assert_eq!(applicant.document_status, DocumentStatus::Pending);
    assert_eq!(applicant.category, Category::General);
    assert!(applicant.rank.is_none());
}
