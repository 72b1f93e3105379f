use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: i32,
    pub name: String,
    pub industry: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Employer {
    pub id: i32,
    pub company_id: i32,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: String,
    pub location: String,
    pub desired_job_title: String,
    pub desired_industry: String,
    pub desired_salary_min: i32,
    pub desired_salary_max: i32,
    /// Free-text summary of the user's skills.
    pub skills: String,
    pub experience: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSkill {
    pub id: i32,
    pub user_id: i32,
    pub skill: String,
    /// Years.
    pub experience: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub industry: String,
    pub company_id: i32,
    pub description: String,
    pub location: String,
    pub salary_min: i32,
    pub salary_max: i32,
    pub requirements: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct JobSkill {
    pub id: i32,
    pub job_id: i32,
    pub skill: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    Seen,
    Interviewing,
    Offered,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobApplication {
    pub id: i32,
    pub user_id: i32,
    pub job_id: i32,
    pub message: Option<String>,
    #[serde(skip_serializing)]
    pub cv: Vec<u8>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

/// Application row without the CV payload, used by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct JobApplicationSummary {
    pub id: i32,
    pub user_id: i32,
    pub job_id: i32,
    pub message: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

impl From<JobApplication> for JobApplicationSummary {
    fn from(application: JobApplication) -> Self {
        JobApplicationSummary {
            id: application.id,
            user_id: application.user_id,
            job_id: application.job_id,
            message: application.message,
            status: application.status,
            applied_at: application.applied_at,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Query parameters
// ────────────────────────────────────────────────────────────────────────────

/// `LIMIT` / `OFFSET` pair shared by every list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn new(limit: i64, offset: i64) -> Self {
        Pagination { limit, offset }
    }

    pub fn first_page() -> Self {
        Pagination::new(Self::DEFAULT_LIMIT, 0)
    }
}

#[derive(Debug, Clone)]
pub struct CreateCompanyParams {
    pub name: String,
    pub industry: String,
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct UpdateCompanyParams {
    pub id: i32,
    pub name: String,
    pub industry: String,
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct CreateEmployerParams {
    pub company_id: i32,
    pub full_name: String,
    pub email: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone)]
pub struct UpdateEmployerParams {
    pub id: i32,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub hashed_password: String,
    pub full_name: String,
    pub location: String,
    pub desired_job_title: String,
    pub desired_industry: String,
    pub desired_salary_min: i32,
    pub desired_salary_max: i32,
    pub skills: String,
    pub experience: String,
}

#[derive(Debug, Clone)]
pub struct UpdateUserParams {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub location: String,
    pub desired_job_title: String,
    pub desired_industry: String,
    pub desired_salary_min: i32,
    pub desired_salary_max: i32,
    pub skills: String,
    pub experience: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSkillInput {
    pub skill: String,
    pub experience: i32,
}

#[derive(Debug, Clone)]
pub struct CreateUserSkillParams {
    pub user_id: i32,
    pub skill: String,
    pub experience: i32,
}

#[derive(Debug, Clone)]
pub struct CreateJobParams {
    pub title: String,
    pub industry: String,
    pub company_id: i32,
    pub description: String,
    pub location: String,
    pub salary_min: i32,
    pub salary_max: i32,
    pub requirements: String,
}

#[derive(Debug, Clone)]
pub struct UpdateJobParams {
    pub id: i32,
    pub title: String,
    pub industry: String,
    pub description: String,
    pub location: String,
    pub salary_min: i32,
    pub salary_max: i32,
    pub requirements: String,
}

/// Inclusive salary window; a job matches when it lies entirely inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: i32,
    pub max: i32,
}

impl SalaryRange {
    pub fn contains(&self, salary_min: i32, salary_max: i32) -> bool {
        salary_min >= self.min && salary_max <= self.max
    }
}

#[derive(Debug, Clone)]
pub struct CreateJobApplicationParams {
    pub user_id: i32,
    pub job_id: i32,
    pub message: Option<String>,
    pub cv: Vec<u8>,
}
