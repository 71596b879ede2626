use std::sync::Arc;

use admission::{
    allocation, department_map, letter::render_admission_letter, marks::check_marks, merit,
    review::apply_decision, DepartmentMap,
};
use chrono::Utc;
use shared::{
    confirm::ReviewDecision,
    domain::{AdmissionStatus, Applicant, ApplicantId, Department},
    error::{ApiError, ErrorCode},
    protocol::{
        AllocationSummary, DepartmentSummary, MarksheetResponse, RegisterApplicantRequest,
        ReviewResponse, ServerEvent,
    },
    roster::{retain_matching, NameQuery},
};
use storage::{NewApplicant, Storage};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const MIN_AGE: u32 = 16;
pub const MAX_SCORE: f64 = 100.0;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    /// Serialises the read-modify-write admission rounds.
    round_lock: Arc<Mutex<()>>,
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            round_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Result of an operation together with the events it produced.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub events: Vec<ServerEvent>,
}

impl<T> Outcome<T> {
    fn new(value: T, events: Vec<ServerEvent>) -> Self {
        Self { value, events }
    }
}

pub async fn register_applicant(
    ctx: &ApiContext,
    req: RegisterApplicantRequest,
) -> Result<Outcome<Applicant>, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("name must not be empty"));
    }
    if req.age < MIN_AGE {
        return Err(ApiError::validation(format!(
            "applicant must be at least {MIN_AGE} years old"
        )));
    }
    ensure_score("12th marks", req.marks_12)?;
    ensure_score("entrance score", req.entrance_score)?;

    let preferences: Vec<String> = req
        .preferences
        .iter()
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
        .collect();
    if preferences.is_empty() {
        return Err(ApiError::validation(
            "at least one department preference is required",
        ));
    }
    let departments = ctx.storage.list_departments().await.map_err(internal)?;
    if let Some(unknown) = preferences
        .iter()
        .find(|p| !departments.iter().any(|d| &d.name == *p))
    {
        return Err(ApiError::validation(format!("unknown department '{unknown}'")));
    }

    let applicant_id = ctx
        .storage
        .insert_applicant(&NewApplicant {
            name: name.to_string(),
            age: req.age,
            marks_12: req.marks_12,
            entrance_score: req.entrance_score,
            preferences,
            category: req.category,
        })
        .await
        .map_err(internal)?;
    let applicant = load_applicant(ctx, applicant_id).await?;
    info!(applicant_id = %applicant.id, name = %applicant.name, "applicant registered");

    let event = ServerEvent::ApplicantRegistered {
        applicant_id,
        name: applicant.name.clone(),
    };
    Ok(Outcome::new(applicant, vec![event]))
}

/// Applicants in registration order, narrowed to names containing `query`.
pub async fn list_applicants(ctx: &ApiContext, query: &str) -> Result<Vec<Applicant>, ApiError> {
    let mut applicants = ctx.storage.list_applicants().await.map_err(internal)?;
    retain_matching(&mut applicants, &NameQuery::new(query), |a| &a.name);
    Ok(applicants)
}

pub async fn get_applicant(
    ctx: &ApiContext,
    applicant_id: ApplicantId,
) -> Result<Applicant, ApiError> {
    load_applicant(ctx, applicant_id).await
}

pub async fn list_departments(ctx: &ApiContext) -> Result<Vec<DepartmentSummary>, ApiError> {
    let departments = ctx.storage.list_departments().await.map_err(internal)?;
    Ok(departments.iter().map(DepartmentSummary::from).collect())
}

pub async fn generate_merit_list(ctx: &ApiContext) -> Result<Outcome<Vec<Applicant>>, ApiError> {
    let _round = ctx.round_lock.lock().await;

    let mut applicants = ctx.storage.list_applicants().await.map_err(internal)?;
    merit::rank_applicants(&mut applicants);
    ctx.storage
        .persist_round(&applicants, &[])
        .await
        .map_err(internal)?;
    info!(ranked = applicants.len(), "merit list generated");

    let event = ServerEvent::MeritListGenerated {
        ranked: applicants.len(),
        generated_at: Utc::now(),
    };
    Ok(Outcome::new(applicants, vec![event]))
}

pub async fn merit_list(ctx: &ApiContext) -> Result<Vec<Applicant>, ApiError> {
    ctx.storage.list_merit().await.map_err(internal)
}

pub async fn allocate_seats(ctx: &ApiContext) -> Result<Outcome<AllocationSummary>, ApiError> {
    let _round = ctx.round_lock.lock().await;

    let mut applicants = ctx.storage.list_applicants().await.map_err(internal)?;
    if applicants
        .iter()
        .any(|a| a.admission_status == AdmissionStatus::Applied && a.rank.is_none())
    {
        warn!("allocating before every applicant is ranked; unranked applicants go last");
    }
    let mut departments = load_department_map(ctx).await?;

    let summary = allocation::allocate_seats(&mut applicants, &mut departments);
    persist(ctx, &applicants, departments).await?;
    info!(
        selected = summary.selected.len(),
        waiting = summary.waiting.len(),
        rejected = summary.rejected.len(),
        "seat allocation completed"
    );

    let events = applicants
        .iter()
        .filter(|a| summary.selected.contains(&a.id))
        .filter_map(ServerEvent::selected)
        .collect();
    Ok(Outcome::new(summary, events))
}

/// Selected applicants awaiting document review, best rank first.
pub async fn list_selected(ctx: &ApiContext) -> Result<Vec<Applicant>, ApiError> {
    ctx.storage
        .list_applicants_by_status(AdmissionStatus::Selected)
        .await
        .map_err(internal)
}

pub async fn review_documents(
    ctx: &ApiContext,
    applicant_id: ApplicantId,
    decision: ReviewDecision,
) -> Result<Outcome<ReviewResponse>, ApiError> {
    let _round = ctx.round_lock.lock().await;

    let mut applicants = ctx.storage.list_applicants().await.map_err(internal)?;
    let idx = applicants
        .iter()
        .position(|a| a.id == applicant_id)
        .ok_or_else(|| ApiError::not_found("applicant not found"))?;
    let mut departments = load_department_map(ctx).await?;

    apply_decision(&mut applicants[idx], decision, &mut departments)?;
    let mut events = Vec::new();
    let reviewed = &applicants[idx];
    let reallocated = match decision {
        ReviewDecision::Approve => {
            events.push(ServerEvent::AdmissionConfirmed {
                applicant_id,
                name: reviewed.name.clone(),
            });
            None
        }
        ReviewDecision::Reject => {
            events.push(ServerEvent::AdmissionCancelled {
                applicant_id,
                name: reviewed.name.clone(),
            });
            allocation::reallocate_waiting(&mut applicants, &mut departments)
        }
    };
    if let Some(moved) = reallocated {
        if let Some(event) = applicants
            .iter()
            .find(|a| a.id == moved)
            .and_then(ServerEvent::selected)
        {
            events.push(event);
        }
    }

    persist(ctx, &applicants, departments).await?;
    info!(
        applicant_id = %applicant_id,
        decision = decision.as_str(),
        reallocated = ?reallocated,
        "documents reviewed"
    );

    let applicant = applicants.swap_remove(idx);
    Ok(Outcome::new(
        ReviewResponse {
            applicant,
            reallocated,
        },
        events,
    ))
}

/// Compares the recognised text of an uploaded marksheet with the marks the
/// applicant declared.
pub async fn check_marksheet(
    ctx: &ApiContext,
    applicant_id: ApplicantId,
    document_text: &str,
) -> Result<MarksheetResponse, ApiError> {
    // Rounds write whole applicant rows back; the flag must not land mid-round.
    let _round = ctx.round_lock.lock().await;

    let applicant = load_applicant(ctx, applicant_id).await?;
    let check = check_marks(applicant.marks_12, document_text);
    ctx.storage
        .set_marks_verified(applicant_id, check.is_verified())
        .await
        .map_err(internal)?;
    info!(applicant_id = %applicant_id, ?check, "marksheet checked");
    Ok(MarksheetResponse {
        applicant_id,
        check,
    })
}

pub async fn admission_letter(
    ctx: &ApiContext,
    applicant_id: ApplicantId,
) -> Result<String, ApiError> {
    let applicant = load_applicant(ctx, applicant_id).await?;
    Ok(render_admission_letter(&applicant)?)
}

async fn load_applicant(ctx: &ApiContext, applicant_id: ApplicantId) -> Result<Applicant, ApiError> {
    ctx.storage
        .get_applicant(applicant_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("applicant not found"))
}

async fn load_department_map(ctx: &ApiContext) -> Result<DepartmentMap, ApiError> {
    let departments = ctx.storage.list_departments().await.map_err(internal)?;
    Ok(department_map(departments))
}

async fn persist(
    ctx: &ApiContext,
    applicants: &[Applicant],
    departments: DepartmentMap,
) -> Result<(), ApiError> {
    let departments: Vec<Department> = departments.into_values().collect();
    ctx.storage
        .persist_round(applicants, &departments)
        .await
        .map_err(internal)
}

fn ensure_score(label: &str, value: f64) -> Result<(), ApiError> {
    if !(0.0..=MAX_SCORE).contains(&value) {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("{label} must be between 0 and {MAX_SCORE}"),
        ));
    }
    Ok(())
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
