//! Name filtering for the applicant table.
//!
//! A row is visible iff its name, case-folded, contains the case-folded
//! query as a substring. The empty query matches every name. Rows are never
//! reordered, added or removed; only their visibility changes.

/// The current filter text, already case-folded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameQuery {
    folded: String,
}

impl NameQuery {
    pub fn new(raw: &str) -> Self {
        Self {
            folded: raw.to_lowercase(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.folded
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.is_empty() || name.to_lowercase().contains(&self.folded)
    }

    pub fn visibility_for(&self, name: Option<&str>) -> Visibility {
        // A row without a name cell behaves like an empty name.
        if self.matches(name.unwrap_or_default()) {
            Visibility::Shown
        } else {
            Visibility::Hidden
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Hidden,
}

/// One rendered table row the filter can read and toggle.
pub trait RosterRow {
    fn name(&self) -> Option<String>;
    fn set_visibility(&mut self, visibility: Visibility);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub shown: usize,
    pub hidden: usize,
}

pub fn apply_filter<'a, R, I>(rows: I, query: &NameQuery) -> FilterOutcome
where
    R: RosterRow + 'a,
    I: IntoIterator<Item = &'a mut R>,
{
    let mut outcome = FilterOutcome::default();
    for row in rows {
        let visibility = query.visibility_for(row.name().as_deref());
        match visibility {
            Visibility::Shown => outcome.shown += 1,
            Visibility::Hidden => outcome.hidden += 1,
        }
        row.set_visibility(visibility);
    }
    outcome
}

/// Keeps the items whose name matches, preserving order.
pub fn retain_matching<T>(items: &mut Vec<T>, query: &NameQuery, name: impl Fn(&T) -> &str) {
    if query.is_empty() {
        return;
    }
    items.retain(|item| query.matches(name(item)));
}

#[cfg(test)]
#[path = "tests/roster_tests.rs"]
mod tests;
