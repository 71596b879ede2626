//! Server-rendered pages for the admissions office.
//!
//! The markup carries the hooks the page script binds to: the `searchInput`
//! text box, the `applicantsTable` body rows with their `name-col` cells,
//! and review forms gated on `confirmApprove` / `confirmReject`.

use shared::{
    confirm::ReviewDecision,
    domain::Applicant,
    protocol::DepartmentSummary,
};

const PAGE_SCRIPT: &str = r#"<script type="module">
  import init, { confirmApprove, confirmReject } from "/static/pkg/admissions_web.js";
  await init();
  window.confirmApprove = confirmApprove;
  window.confirmReject = confirmReject;
</script>"#;

pub fn dashboard_page(
    applicants: &[Applicant],
    departments: &[DepartmentSummary],
    query: &str,
) -> String {
    let mut body = format!(
        r#"<form method="get" action="/dashboard">
  <input type="text" id="searchInput" name="q" placeholder="Search by name" value="{}" autocomplete="off">
</form>
"#,
        escape_html(query)
    );

    body.push_str(
        r#"<table id="applicantsTable">
<thead><tr><th>ID</th><th>Name</th><th>Category</th><th>Score</th><th>Rank</th><th>Status</th><th>Department</th><th>Documents</th></tr></thead>
<tbody>
"#,
    );
    for applicant in applicants {
        body.push_str(&format!(
            "<tr><td>{}</td><td class=\"name-col\">{}</td><td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            applicant.id,
            escape_html(&applicant.name),
            applicant.category,
            applicant.final_score,
            rank_cell(applicant),
            applicant.admission_status,
            escape_html(applicant.allocated_department.as_deref().unwrap_or("-")),
            applicant.document_status,
        ));
    }
    body.push_str("</tbody>\n</table>\n");

    body.push_str(
        "<h2>Departments</h2>\n<table id=\"departmentsTable\">\n<thead><tr><th>Name</th><th>Total</th><th>Available</th></tr></thead>\n<tbody>\n",
    );
    for department in departments {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&department.name),
            department.total_seats,
            department.available_seats,
        ));
    }
    body.push_str("</tbody>\n</table>\n");

    layout("Dashboard", &body)
}

pub fn verify_page(selected: &[Applicant]) -> String {
    if selected.is_empty() {
        return layout(
            "Document Verification",
            "<p>No applicants are awaiting document review.</p>\n",
        );
    }

    let mut body = String::from(
        r#"<table id="applicantsTable">
<thead><tr><th>ID</th><th>Name</th><th>Rank</th><th>Department</th><th>Marks checked</th><th>Actions</th></tr></thead>
<tbody>
"#,
    );
    for applicant in selected {
        body.push_str(&format!(
            "<tr><td>{id}</td><td class=\"name-col\">{name}</td><td>{rank}</td><td>{department}</td><td>{marks}</td><td>{approve}{reject}</td></tr>\n",
            id = applicant.id,
            name = escape_html(&applicant.name),
            rank = rank_cell(applicant),
            department = escape_html(applicant.allocated_department.as_deref().unwrap_or("-")),
            marks = if applicant.marks_verified { "yes" } else { "no" },
            approve = review_form(applicant, ReviewDecision::Approve),
            reject = review_form(applicant, ReviewDecision::Reject),
        ));
    }
    body.push_str("</tbody>\n</table>\n");

    layout("Document Verification", &body)
}

fn review_form(applicant: &Applicant, decision: ReviewDecision) -> String {
    let label = match decision {
        ReviewDecision::Approve => "Approve",
        ReviewDecision::Reject => "Reject",
    };
    format!(
        r#"<form method="post" action="/verify/{id}" onsubmit="{guard}"><input type="hidden" name="action" value="{value}"><button type="submit">{label}</button></form>"#,
        id = applicant.id,
        guard = confirm_guard(decision),
        value = decision.as_str(),
    )
}

/// Submit guard for a review form. Until the page script has loaded, the
/// browser's own dialog asks the same question.
fn confirm_guard(decision: ReviewDecision) -> String {
    let function = match decision {
        ReviewDecision::Approve => "confirmApprove",
        ReviewDecision::Reject => "confirmReject",
    };
    format!(
        "return window.{function} ? {function}() : window.confirm('{prompt}')",
        prompt = escape_html(decision.prompt()),
    )
}

fn rank_cell(applicant: &Applicant) -> String {
    applicant
        .rank
        .map(|rank| rank.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | Admissions</title>
</head>
<body>
<nav><a href="/dashboard">Dashboard</a> | <a href="/verify">Verify</a></nav>
<h1>{title}</h1>
{body}{PAGE_SCRIPT}
</body>
</html>
"#
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
#[path = "tests/pages_tests.rs"]
mod tests;
