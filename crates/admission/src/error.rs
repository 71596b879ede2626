use shared::{
    domain::{AdmissionStatus, ApplicantId},
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AdmissionError {
    #[error("applicant {applicant} is {actual}, expected {expected}")]
    UnexpectedStatus {
        applicant: ApplicantId,
        expected: AdmissionStatus,
        actual: AdmissionStatus,
    },
    #[error("applicant {0} has no allocated department")]
    NoAllocation(ApplicantId),
}

impl From<AdmissionError> for ApiError {
    fn from(value: AdmissionError) -> Self {
        ApiError::new(ErrorCode::Conflict, value.to_string())
    }
}
