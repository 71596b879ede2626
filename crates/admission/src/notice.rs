use shared::protocol::ServerEvent;

/// Text of the message sent to the applicant an event concerns, if any.
pub fn applicant_message(event: &ServerEvent) -> Option<(&str, String)> {
    match event {
        ServerEvent::ApplicantSelected {
            name, department, ..
        } => Some((
            name.as_str(),
            format!("Provisional admission offered in {department}"),
        )),
        ServerEvent::AdmissionConfirmed { name, .. } => {
            Some((name.as_str(), "Admission CONFIRMED. Welcome!".to_string()))
        }
        ServerEvent::AdmissionCancelled { name, .. } => Some((
            name.as_str(),
            "Admission cancelled due to document rejection.".to_string(),
        )),
        ServerEvent::ApplicantRegistered { .. } | ServerEvent::MeritListGenerated { .. } => None,
    }
}
