use shared::domain::{Category, DocumentStatus};

use super::*;

async fn setup() -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .seed_departments(&[
            Department::new("CS", 2),
            Department::new("MECH", 1),
            Department::new("CIVIL", 1),
        ])
        .await
        .expect("seed");
    ApiContext::new(storage)
}

fn request(name: &str, marks: f64, preferences: &[&str]) -> RegisterApplicantRequest {
    RegisterApplicantRequest {
        name: name.to_string(),
        age: 18,
        marks_12: marks,
        entrance_score: marks,
        preferences: preferences.iter().map(|p| p.to_string()).collect(),
        category: Category::General,
    }
}

async fn register(ctx: &ApiContext, name: &str, marks: f64, preferences: &[&str]) -> ApplicantId {
    register_applicant(ctx, request(name, marks, preferences))
        .await
        .expect("register")
        .value
        .id
}

#[tokio::test]
async fn registration_validates_input() {
    let ctx = setup().await;

    let mut young = request("Kid", 80.0, &["CS"]);
    young.age = 15;
    let err = register_applicant(&ctx, young).await.expect_err("too young");
    assert_eq!(err.code, ErrorCode::Validation);

    let err = register_applicant(&ctx, request("Over", 100.5, &["CS"]))
        .await
        .expect_err("marks out of range");
    assert_eq!(err.code, ErrorCode::Validation);

    let err = register_applicant(&ctx, request("Lost", 80.0, &["ARTS"]))
        .await
        .expect_err("unknown department");
    assert!(err.message.contains("ARTS"));

    let err = register_applicant(&ctx, request("  ", 80.0, &["CS"]))
        .await
        .expect_err("blank name");
    assert_eq!(err.code, ErrorCode::Validation);

    let err = register_applicant(&ctx, request("Nowhere", 80.0, &[]))
        .await
        .expect_err("no preference");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn registration_normalises_preferences_and_emits_event() {
    let ctx = setup().await;
    let outcome = register_applicant(&ctx, request(" Asha ", 90.0, &["cs", " mech "]))
        .await
        .expect("register");

    assert_eq!(outcome.value.name, "Asha");
    assert_eq!(outcome.value.preferences, vec!["CS", "MECH"]);
    assert!(matches!(
        outcome.events.as_slice(),
        [ServerEvent::ApplicantRegistered { .. }]
    ));
}

#[tokio::test]
async fn listing_filters_by_name_case_insensitively() {
    let ctx = setup().await;
    register(&ctx, "Alice Smith", 80.0, &["CS"]).await;
    register(&ctx, "bob jones", 80.0, &["CS"]).await;
    register(&ctx, "ALICE Cooper", 80.0, &["CS"]).await;

    let names: Vec<_> = list_applicants(&ctx, "alice")
        .await
        .expect("list")
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["Alice Smith", "ALICE Cooper"]);

    assert_eq!(list_applicants(&ctx, "").await.expect("all").len(), 3);
    assert!(list_applicants(&ctx, "xyz").await.expect("none").is_empty());
}

#[tokio::test]
async fn merit_then_allocation_fills_seats_by_rank() {
    let ctx = setup().await;
    let low = register(&ctx, "Low", 60.0, &["MECH"]).await;
    let high = register(&ctx, "High", 95.0, &["MECH"]).await;

    let merit = generate_merit_list(&ctx).await.expect("merit");
    assert_eq!(merit.value[0].id, high);
    assert_eq!(merit_list(&ctx).await.expect("merit").len(), 2);

    let outcome = allocate_seats(&ctx).await.expect("allocate");
    assert_eq!(outcome.value.selected, vec![high]);
    assert_eq!(outcome.value.waiting, vec![low]);
    assert!(matches!(
        outcome.events.as_slice(),
        [ServerEvent::ApplicantSelected { department, .. }] if department == "MECH"
    ));

    let mech = list_departments(&ctx)
        .await
        .expect("departments")
        .into_iter()
        .find(|d| d.name == "MECH")
        .expect("mech");
    assert_eq!(mech.available_seats, 0);

    let selected = list_selected(&ctx).await.expect("selected");
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id, high);
}

#[tokio::test]
async fn rejection_cancels_and_promotes_waiting_applicant() {
    let ctx = setup().await;
    let first = register(&ctx, "First", 95.0, &["MECH"]).await;
    let second = register(&ctx, "Second", 70.0, &["MECH"]).await;
    generate_merit_list(&ctx).await.expect("merit");
    allocate_seats(&ctx).await.expect("allocate");

    let outcome = review_documents(&ctx, first, ReviewDecision::Reject)
        .await
        .expect("reject");

    assert_eq!(outcome.value.applicant.admission_status, AdmissionStatus::Cancelled);
    assert_eq!(outcome.value.applicant.document_status, DocumentStatus::Rejected);
    assert_eq!(outcome.value.reallocated, Some(second));
    assert_eq!(outcome.events.len(), 2);

    let promoted = get_applicant(&ctx, second).await.expect("second");
    assert_eq!(promoted.admission_status, AdmissionStatus::Selected);
    assert_eq!(promoted.allocated_department.as_deref(), Some("MECH"));
}

#[tokio::test]
async fn approval_confirms_and_unlocks_the_letter() {
    let ctx = setup().await;
    let id = register(&ctx, "Meera", 92.0, &["CS"]).await;

    let err = admission_letter(&ctx, id).await.expect_err("not yet confirmed");
    assert_eq!(err.code, ErrorCode::Conflict);

    generate_merit_list(&ctx).await.expect("merit");
    allocate_seats(&ctx).await.expect("allocate");
    let outcome = review_documents(&ctx, id, ReviewDecision::Approve)
        .await
        .expect("approve");
    assert_eq!(outcome.value.applicant.admission_status, AdmissionStatus::Confirmed);
    assert!(outcome.value.reallocated.is_none());

    let letter = admission_letter(&ctx, id).await.expect("letter");
    assert!(letter.contains("Allocated Department: CS"));
}

#[tokio::test]
async fn reviewing_unknown_or_unselected_applicants_fails() {
    let ctx = setup().await;
    let err = review_documents(&ctx, ApplicantId(404), ReviewDecision::Approve)
        .await
        .expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);

    let id = register(&ctx, "Fresh", 80.0, &["CS"]).await;
    let err = review_documents(&ctx, id, ReviewDecision::Approve)
        .await
        .expect_err("not selected");
    assert_eq!(err.code, ErrorCode::Conflict);
}

#[tokio::test]
async fn marksheet_check_records_the_result() {
    let ctx = setup().await;
    let id = register(&ctx, "Ravi", 88.0, &["CS"]).await;

    let response = check_marksheet(&ctx, id, "Total Marks: 88.4")
        .await
        .expect("check");
    assert!(response.check.is_verified());
    assert!(get_applicant(&ctx, id).await.expect("load").marks_verified);

    let response = check_marksheet(&ctx, id, "Total Marks: 70")
        .await
        .expect("check");
    assert!(!response.check.is_verified());
    assert!(!get_applicant(&ctx, id).await.expect("load").marks_verified);
}

#[tokio::test]
async fn marksheet_check_is_not_lost_to_a_running_round() {
    let ctx = setup().await;
    let id = register(&ctx, "Ravi", 88.0, &["CS"]).await;

    let round = ctx.round_lock.lock().await;
    let snapshot = ctx.storage.list_applicants().await.expect("snapshot");

    let pending = tokio::spawn({
        let ctx = ctx.clone();
        async move { check_marksheet(&ctx, id, "Total Marks: 88").await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!pending.is_finished(), "check ran while a round held the lock");

    ctx.storage
        .persist_round(&snapshot, &[])
        .await
        .expect("round write-back");
    drop(round);

    let response = pending.await.expect("join").expect("check");
    assert!(response.check.is_verified());
    assert!(get_applicant(&ctx, id).await.expect("load").marks_verified);
}
