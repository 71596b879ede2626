use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, SqliteConnection,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    AdmissionStatus, Applicant, ApplicantId, Category, Department, DocumentStatus,
};

const APPLICANT_COLUMNS: &str = "id, name, age, marks_12, entrance_score, preferences, category, \
     final_score, rank, allocated_department, admission_status, document_status, marks_verified, \
     registered_at";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Registration data for an applicant not yet stored.
#[derive(Debug, Clone)]
pub struct NewApplicant {
    pub name: String,
    pub age: u32,
    pub marks_12: f64,
    pub entrance_score: f64,
    pub preferences: Vec<String>,
    pub category: Category,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts departments that do not exist yet; existing rows are left
    /// untouched. Returns how many were added.
    pub async fn seed_departments(&self, departments: &[Department]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut added = 0;
        for department in departments {
            let result = sqlx::query(
                "INSERT INTO departments (name, total_seats) VALUES (?, ?)
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(&department.name)
            .bind(i64::from(department.total_seats))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to seed department '{}'", department.name))?;
            if result.rows_affected() == 0 {
                continue;
            }
            write_department_seats(&mut tx, department).await?;
            added += 1;
        }
        tx.commit().await?;
        Ok(added)
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        let rows = sqlx::query("SELECT name, total_seats FROM departments ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        let seat_rows = sqlx::query(
            "SELECT department, category, quota, filled FROM department_seats ORDER BY department",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut departments: BTreeMap<String, Department> = BTreeMap::new();
        for row in rows {
            let name: String = row.get(0);
            let total_seats = to_u32(row.get::<i64, _>(1));
            let mut department = Department::with_quotas(name.clone(), total_seats, BTreeMap::new());
            department.filled_seats.clear();
            departments.insert(name, department);
        }

        for row in seat_rows {
            let name: String = row.get(0);
            let Some(department) = departments.get_mut(&name) else {
                continue;
            };
            let category = Category::from_str(row.get::<&str, _>(1))?;
            let quota = to_u32(row.get::<i64, _>(2));
            let filled = to_u32(row.get::<i64, _>(3));
            if quota > 0 {
                department.quotas.insert(category, quota);
            }
            department.filled_seats.insert(category, filled);
        }

        Ok(departments.into_values().collect())
    }

    pub async fn department(&self, name: &str) -> Result<Option<Department>> {
        Ok(self
            .list_departments()
            .await?
            .into_iter()
            .find(|department| department.name == name))
    }

    pub async fn insert_applicant(&self, applicant: &NewApplicant) -> Result<ApplicantId> {
        let preferences = serde_json::to_string(&applicant.preferences)?;
        let rec = sqlx::query(
            "INSERT INTO applicants
                (name, age, marks_12, entrance_score, preferences, category, registered_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&applicant.name)
        .bind(i64::from(applicant.age))
        .bind(applicant.marks_12)
        .bind(applicant.entrance_score)
        .bind(preferences)
        .bind(applicant.category.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(ApplicantId(rec.get::<i64, _>(0)))
    }

    pub async fn get_applicant(&self, applicant_id: ApplicantId) -> Result<Option<Applicant>> {
        let row = sqlx::query(&format!(
            "SELECT {APPLICANT_COLUMNS} FROM applicants WHERE id = ?"
        ))
        .bind(applicant_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(applicant_from_row).transpose()
    }

    /// Every applicant in registration order.
    pub async fn list_applicants(&self) -> Result<Vec<Applicant>> {
        let rows = sqlx::query(&format!(
            "SELECT {APPLICANT_COLUMNS} FROM applicants ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(applicant_from_row).collect()
    }

    /// Applicants in one state, best rank first and unranked last.
    pub async fn list_applicants_by_status(
        &self,
        status: AdmissionStatus,
    ) -> Result<Vec<Applicant>> {
        let rows = sqlx::query(&format!(
            "SELECT {APPLICANT_COLUMNS} FROM applicants
             WHERE admission_status = ?
             ORDER BY rank IS NULL, rank, id"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(applicant_from_row).collect()
    }

    /// Applicants ordered by merit rank; only ranked applicants appear.
    pub async fn list_merit(&self) -> Result<Vec<Applicant>> {
        let rows = sqlx::query(&format!(
            "SELECT {APPLICANT_COLUMNS} FROM applicants WHERE rank IS NOT NULL ORDER BY rank"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(applicant_from_row).collect()
    }

    pub async fn set_marks_verified(&self, applicant_id: ApplicantId, verified: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE applicants SET marks_verified = ? WHERE id = ?")
            .bind(verified)
            .bind(applicant_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Writes a batch of applicants and department seat counts in one
    /// transaction, so a ranking or allocation round is never half-applied.
    pub async fn persist_round(
        &self,
        applicants: &[Applicant],
        departments: &[Department],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for applicant in applicants {
            write_applicant(&mut tx, applicant).await?;
        }
        for department in departments {
            sqlx::query("UPDATE departments SET total_seats = ? WHERE name = ?")
                .bind(i64::from(department.total_seats))
                .bind(&department.name)
                .execute(&mut *tx)
                .await?;
            write_department_seats(&mut tx, department).await?;
        }
        tx.commit()
            .await
            .context("failed to commit admission round")?;
        Ok(())
    }
}

async fn write_applicant(conn: &mut SqliteConnection, applicant: &Applicant) -> Result<()> {
    let preferences = serde_json::to_string(&applicant.preferences)?;
    let result = sqlx::query(
        "UPDATE applicants SET
            name = ?, age = ?, marks_12 = ?, entrance_score = ?, preferences = ?, category = ?,
            final_score = ?, rank = ?, allocated_department = ?, admission_status = ?,
            document_status = ?, marks_verified = ?
         WHERE id = ?",
    )
    .bind(&applicant.name)
    .bind(i64::from(applicant.age))
    .bind(applicant.marks_12)
    .bind(applicant.entrance_score)
    .bind(preferences)
    .bind(applicant.category.as_str())
    .bind(applicant.final_score)
    .bind(applicant.rank.map(i64::from))
    .bind(applicant.allocated_department.as_deref())
    .bind(applicant.admission_status.as_str())
    .bind(applicant.document_status.as_str())
    .bind(applicant.marks_verified)
    .bind(applicant.id.0)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        anyhow::bail!("applicant {} does not exist", applicant.id);
    }
    Ok(())
}

async fn write_department_seats(conn: &mut SqliteConnection, department: &Department) -> Result<()> {
    for category in Category::ALL {
        sqlx::query(
            "INSERT INTO department_seats (department, category, quota, filled)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(department, category) DO UPDATE SET
                quota = excluded.quota,
                filled = excluded.filled",
        )
        .bind(&department.name)
        .bind(category.as_str())
        .bind(i64::from(department.quota(*category)))
        .bind(i64::from(department.filled(*category)))
        .execute(&mut *conn)
        .await
        .with_context(|| {
            format!(
                "failed to write {category} seats for department '{}'",
                department.name
            )
        })?;
    }
    Ok(())
}

fn applicant_from_row(row: &SqliteRow) -> Result<Applicant> {
    let preferences: String = row.try_get("preferences")?;
    let registered_at: DateTime<Utc> = row.try_get("registered_at")?;
    Ok(Applicant {
        id: ApplicantId(row.try_get("id")?),
        name: row.try_get("name")?,
        age: to_u32(row.try_get("age")?),
        marks_12: row.try_get("marks_12")?,
        entrance_score: row.try_get("entrance_score")?,
        preferences: serde_json::from_str(&preferences)
            .context("applicant preferences are not a JSON list")?,
        category: Category::from_str(row.try_get("category")?)?,
        final_score: row.try_get("final_score")?,
        rank: row.try_get::<Option<i64>, _>("rank")?.map(to_u32),
        allocated_department: row.try_get("allocated_department")?,
        admission_status: AdmissionStatus::from_str(row.try_get("admission_status")?)?,
        document_status: DocumentStatus::from_str(row.try_get("document_status")?)?,
        marks_verified: row.try_get("marks_verified")?,
        registered_at,
    })
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() || path == ":memory:" {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
