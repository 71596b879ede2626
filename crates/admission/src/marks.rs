use std::sync::OnceLock;

use regex::Regex;
use shared::protocol::MarksCheck;

/// Largest gap between the claimed and the documented marks still accepted.
pub const MARKS_TOLERANCE: f64 = 1.0;

fn marks_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:Marks|Total|Percentage|Score)\D*(\d+(?:\.\d+)?)")
            .expect("marks pattern is a valid regex")
    })
}

/// Pulls the first labelled figure out of a recognised marksheet.
pub fn extract_marks(text: &str) -> Option<f64> {
    marks_pattern()
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|value| value.as_str().parse().ok())
}

pub fn check_marks(claimed: f64, document_text: &str) -> MarksCheck {
    match extract_marks(document_text) {
        None => MarksCheck::Unreadable,
        Some(found) if (found - claimed).abs() < MARKS_TOLERANCE => MarksCheck::Verified { found },
        Some(found) => MarksCheck::Mismatch { claimed, found },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_labelled_figures() {
        assert_eq!(extract_marks("Total Marks: 95"), Some(95.0));
        assert_eq!(extract_marks("percentage obtained - 88.25 %"), Some(88.25));
        assert_eq!(extract_marks("SCORE\n71"), Some(71.0));
    }

    #[test]
    fn ignores_unlabelled_numbers() {
        assert_eq!(extract_marks("Roll 20231145 Grade A"), None);
        assert_eq!(extract_marks(""), None);
    }

    #[test]
    fn accepts_marks_within_tolerance() {
        assert_eq!(
            check_marks(90.0, "Percentage: 90.6"),
            MarksCheck::Verified { found: 90.6 }
        );
    }

    #[test]
    fn flags_mismatch_at_or_beyond_tolerance() {
        assert_eq!(
            check_marks(90.0, "Total: 91"),
            MarksCheck::Mismatch {
                claimed: 90.0,
                found: 91.0
            }
        );
    }

    #[test]
    fn unreadable_document_is_not_verified() {
        let check = check_marks(90.0, "blurry scan");
        assert_eq!(check, MarksCheck::Unreadable);
        assert!(!check.is_verified());
    }
}
