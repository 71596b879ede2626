use shared::domain::{AdmissionStatus, Applicant};

use crate::AdmissionError;

const TITLE: &str = "UNIVERSITY ADMISSION LETTER";

/// Renders the plain-text admission letter for a confirmed applicant.
pub fn render_admission_letter(applicant: &Applicant) -> Result<String, AdmissionError> {
    if applicant.admission_status != AdmissionStatus::Confirmed {
        return Err(AdmissionError::UnexpectedStatus {
            applicant: applicant.id,
            expected: AdmissionStatus::Confirmed,
            actual: applicant.admission_status,
        });
    }
    let department = applicant
        .allocated_department
        .as_deref()
        .ok_or(AdmissionError::NoAllocation(applicant.id))?;
    let rank = applicant
        .rank
        .map(|rank| rank.to_string())
        .unwrap_or_else(|| "-".to_string());

    let lines = [
        TITLE.to_string(),
        "=".repeat(TITLE.len()),
        String::new(),
        format!("Application ID: {}", applicant.id),
        format!("Name: {}", applicant.name),
        format!("Rank: {rank}"),
        format!("Category: {}", applicant.category),
        format!("Final Score: {:.2}", applicant.final_score),
        String::new(),
        format!("Allocated Department: {department}"),
        String::new(),
        "Congratulations! Your admission has been confirmed.".to_string(),
        "Please report to the university campus for further instructions.".to_string(),
    ];
    let mut letter = lines.join("\n");
    letter.push('\n');
    Ok(letter)
}
