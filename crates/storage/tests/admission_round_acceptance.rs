use shared::domain::{AdmissionStatus, Category, Department};
use storage::{NewApplicant, Storage};

#[tokio::test]
async fn allocation_round_persists_applicants_and_seats_together() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let database_url = format!(
        "sqlite://{}",
        temp_root
            .path()
            .join("admissions.db")
            .to_string_lossy()
            .replace('\\', "/")
    );

    let storage = Storage::new(&database_url).await.expect("db");
    storage
        .seed_departments(&[Department::new("CS", 1)])
        .await
        .expect("seed");
    let id = storage
        .insert_applicant(&NewApplicant {
            name: "Priya".into(),
            age: 19,
            marks_12: 91.0,
            entrance_score: 84.0,
            preferences: vec!["CS".into()],
            category: Category::General,
        })
        .await
        .expect("insert");

    let mut applicant = storage.get_applicant(id).await.expect("load").expect("found");
    let mut cs = storage.department("CS").await.expect("load").expect("cs");
    applicant.rank = Some(1);
    applicant.admission_status = AdmissionStatus::Selected;
    applicant.allocated_department = Some("CS".into());
    cs.occupy(applicant.category);
    storage
        .persist_round(&[applicant], &[cs])
        .await
        .expect("persist");
    drop(storage);

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let selected = reopened
        .list_applicants_by_status(AdmissionStatus::Selected)
        .await
        .expect("selected");
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].allocated_department.as_deref(), Some("CS"));

    let cs = reopened.department("CS").await.expect("load").expect("cs");
    assert_eq!(cs.available_seats(), 0);
}
