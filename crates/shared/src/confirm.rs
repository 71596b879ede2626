use serde::{Deserialize, Serialize};

/// Outcome a reviewer picks for a selected applicant's documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn prompt(self) -> &'static str {
        match self {
            ReviewDecision::Approve => "Approve documents and confirm admission?",
            ReviewDecision::Reject => "Reject documents and cancel admission?",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewDecision::Approve => "approve",
            ReviewDecision::Reject => "reject",
        }
    }

    /// Anything other than "approve" is a rejection, matching the review form.
    pub fn from_form_value(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("approve") {
            ReviewDecision::Approve
        } else {
            ReviewDecision::Reject
        }
    }
}

/// Something that can put a yes/no question to the operator and block until
/// they answer.
pub trait Prompter {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F> Prompter for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

pub fn confirm_decision(prompter: &mut impl Prompter, decision: ReviewDecision) -> bool {
    prompter.confirm(decision.prompt())
}

pub fn confirm_approve(prompter: &mut impl Prompter) -> bool {
    confirm_decision(prompter, ReviewDecision::Approve)
}

pub fn confirm_reject(prompter: &mut impl Prompter) -> bool {
    confirm_decision(prompter, ReviewDecision::Reject)
}

#[cfg(test)]
#[path = "tests/confirm_tests.rs"]
mod tests;
