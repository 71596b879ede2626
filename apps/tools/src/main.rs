use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use server_api::{
    admission_letter, allocate_seats, check_marksheet, generate_merit_list, list_applicants,
    list_departments, list_selected, register_applicant, review_documents, ApiContext,
};
use shared::{
    confirm::{confirm_decision, Prompter, ReviewDecision},
    domain::{Applicant, ApplicantId, Category, Department},
    error::ApiError,
    protocol::{RegisterApplicantRequest, ServerEvent},
};
use storage::Storage;

#[derive(Parser, Debug)]
#[command(about = "Admissions office command line")]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/admissions.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adds departments given as NAME:SEATS; existing ones are left alone.
    SeedDepartments {
        #[arg(required = true, value_parser = parse_department)]
        departments: Vec<Department>,
    },
    Register {
        name: String,
        age: u32,
        marks_12: f64,
        entrance_score: f64,
        #[arg(long = "pref", required = true)]
        preferences: Vec<String>,
        #[arg(long, default_value = "General", value_parser = parse_category)]
        category: Category,
    },
    Merit,
    Allocate,
    Dashboard {
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Walks through selected applicants and records a review for each.
    Verify {
        /// Answer yes to every confirmation.
        #[arg(long)]
        yes: bool,
    },
    /// Checks recognised marksheet text from a file against declared marks.
    Marksheet {
        applicant_id: i64,
        path: std::path::PathBuf,
    },
    Letter {
        applicant_id: i64,
        #[arg(long)]
        out: Option<std::path::PathBuf>,
    },
}

/// Reads answers line by line; a confirmation is anything but "y" or "yes"
/// declined, unless every confirmation is assumed.
struct TerminalPrompter<R> {
    input: R,
    assume_yes: bool,
}

impl<R: BufRead> TerminalPrompter<R> {
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        print!("{question} ");
        io::stdout().flush()?;
        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Ok(None);
        }
        Ok(Some(answer.trim().to_lowercase()))
    }
}

impl<R: BufRead> Prompter for TerminalPrompter<R> {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            println!("{message} yes");
            return true;
        }
        match self.ask(&format!("{message} [y/N]")) {
            Ok(Some(answer)) => matches!(answer.as_str(), "y" | "yes"),
            Ok(None) | Err(_) => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    let ctx = ApiContext::new(storage);

    match cli.command {
        Command::SeedDepartments { departments } => {
            let added = ctx.storage.seed_departments(&departments).await?;
            println!("seeded {added} of {} departments", departments.len());
        }
        Command::Register {
            name,
            age,
            marks_12,
            entrance_score,
            preferences,
            category,
        } => {
            let outcome = register_applicant(
                &ctx,
                RegisterApplicantRequest {
                    name,
                    age,
                    marks_12,
                    entrance_score,
                    preferences,
                    category,
                },
            )
            .await
            .map_err(api_failure)?;
            println!("registered applicant_id={}", outcome.value.id);
            print_events(&outcome.events);
        }
        Command::Merit => {
            let outcome = generate_merit_list(&ctx).await.map_err(api_failure)?;
            for applicant in &outcome.value {
                print_applicant(applicant);
            }
            print_events(&outcome.events);
        }
        Command::Allocate => {
            let outcome = allocate_seats(&ctx).await.map_err(api_failure)?;
            let summary = &outcome.value;
            println!(
                "selected={} waiting={} rejected={}",
                summary.selected.len(),
                summary.waiting.len(),
                summary.rejected.len()
            );
            print_events(&outcome.events);
        }
        Command::Dashboard { filter } => {
            let applicants = list_applicants(&ctx, &filter).await.map_err(api_failure)?;
            if applicants.is_empty() {
                println!("no applicants match '{filter}'");
            }
            for applicant in &applicants {
                print_applicant(applicant);
            }
            for department in list_departments(&ctx).await.map_err(api_failure)? {
                println!(
                    "{:<8} total={} available={}",
                    department.name, department.total_seats, department.available_seats
                );
            }
        }
        Command::Verify { yes } => {
            let mut prompter = TerminalPrompter {
                input: io::stdin().lock(),
                assume_yes: yes,
            };
            verify(&ctx, &mut prompter).await?;
        }
        Command::Marksheet { applicant_id, path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read marksheet text from {}", path.display()))?;
            if text.trim().is_empty() {
                bail!("marksheet text in {} is empty", path.display());
            }
            let response = check_marksheet(&ctx, ApplicantId(applicant_id), &text)
                .await
                .map_err(api_failure)?;
            println!("{}", serde_json_line(&response.check));
        }
        Command::Letter { applicant_id, out } => {
            let letter = admission_letter(&ctx, ApplicantId(applicant_id))
                .await
                .map_err(api_failure)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, letter)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
                None => print!("{letter}"),
            }
        }
    }

    Ok(())
}

/// Offers each selected applicant for review. The operator picks approve,
/// reject or skip, and the pick only takes effect once confirmed.
async fn verify<R: BufRead>(ctx: &ApiContext, prompter: &mut TerminalPrompter<R>) -> Result<()> {
    let selected = list_selected(ctx).await.map_err(api_failure)?;
    if selected.is_empty() {
        println!("no applicants are awaiting document review");
        return Ok(());
    }

    for applicant in selected {
        print_applicant(&applicant);
        let Some(choice) = prompter.ask("[a]pprove, [r]eject or [s]kip?")? else {
            break;
        };
        let decision = match choice.as_str() {
            "a" | "approve" => ReviewDecision::Approve,
            "r" | "reject" => ReviewDecision::Reject,
            _ => continue,
        };
        if !confirm_decision(prompter, decision) {
            println!("no change for applicant {}", applicant.id);
            continue;
        }
        let outcome = review_documents(ctx, applicant.id, decision)
            .await
            .map_err(api_failure)?;
        println!(
            "applicant {} is now {}",
            outcome.value.applicant.id, outcome.value.applicant.admission_status
        );
        print_events(&outcome.events);
    }
    Ok(())
}

fn print_applicant(applicant: &Applicant) {
    println!(
        "{:>4}  {:<24} {:<8} score={:>6.2} rank={:<4} {:<10} {}",
        applicant.id,
        applicant.name,
        applicant.category,
        applicant.final_score,
        applicant
            .rank
            .map(|rank| rank.to_string())
            .unwrap_or_else(|| "-".to_string()),
        applicant.admission_status,
        applicant.allocated_department.as_deref().unwrap_or("-"),
    );
}

fn print_events(events: &[ServerEvent]) {
    for event in events {
        if let Some((to, message)) = admission::notice::applicant_message(event) {
            println!("notify {to}: {message}");
        }
    }
}

fn serde_json_line(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<unprintable: {err}>"))
}

fn parse_department(raw: &str) -> Result<Department, String> {
    let (name, seats) = raw
        .split_once(':')
        .ok_or_else(|| format!("'{raw}' must look like NAME:SEATS"))?;
    let name = name.trim().to_uppercase();
    if name.is_empty() {
        return Err(format!("'{raw}' has no department name"));
    }
    let seats = seats
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("'{raw}' has an invalid seat count: {err}"))?;
    Ok(Department::new(name, seats))
}

fn parse_category(raw: &str) -> Result<Category, String> {
    raw.parse().map_err(|err: shared::error::ApiException| err.to_string())
}

fn api_failure(err: ApiError) -> anyhow::Error {
    anyhow::anyhow!("{:?}: {}", err.code, err.message)
}
