//! Typed operations over the relational row store.
//!
//! Single-row lookups fail with [`DbError::NotFound`](super::DbError::NotFound) on an
//! empty result. List operations return an empty `Vec` when nothing matches, including
//! when the offset runs past the last row. All lists are ordered by id.

use async_trait::async_trait;

use crate::db::models::*;
use crate::db::DbResult;
use crate::search::IndexedJob;

#[async_trait]
pub trait Queries: Send + Sync {
    // ── companies ───────────────────────────────────────────────────────────
    async fn create_company(&self, params: CreateCompanyParams) -> DbResult<Company>;
    async fn get_company_by_id(&self, id: i32) -> DbResult<Company>;
    async fn get_company_by_name(&self, name: &str) -> DbResult<Company>;
    async fn update_company(&self, params: UpdateCompanyParams) -> DbResult<Company>;
    async fn delete_company(&self, id: i32) -> DbResult<()>;

    // ── employers ───────────────────────────────────────────────────────────
    async fn create_employer(&self, params: CreateEmployerParams) -> DbResult<Employer>;
    async fn get_employer_by_id(&self, id: i32) -> DbResult<Employer>;
    async fn get_employer_by_email(&self, email: &str) -> DbResult<Employer>;
    async fn update_employer(&self, params: UpdateEmployerParams) -> DbResult<Employer>;
    async fn update_employer_password(&self, id: i32, hashed_password: &str) -> DbResult<()>;
    async fn delete_employer(&self, id: i32) -> DbResult<()>;

    // ── users ───────────────────────────────────────────────────────────────
    async fn create_user(&self, params: CreateUserParams) -> DbResult<User>;
    async fn get_user_by_id(&self, id: i32) -> DbResult<User>;
    async fn get_user_by_email(&self, email: &str) -> DbResult<User>;
    async fn update_user(&self, params: UpdateUserParams) -> DbResult<User>;
    async fn update_user_password(&self, id: i32, hashed_password: &str) -> DbResult<()>;
    async fn delete_user(&self, id: i32) -> DbResult<()>;

    // ── user skills ─────────────────────────────────────────────────────────
    async fn create_user_skill(&self, params: CreateUserSkillParams) -> DbResult<UserSkill>;
    async fn get_user_skill_by_id(&self, id: i32) -> DbResult<UserSkill>;
    async fn list_user_skills(&self, user_id: i32, page: Pagination) -> DbResult<Vec<UserSkill>>;
    async fn delete_user_skill(&self, id: i32) -> DbResult<()>;

    // ── jobs ────────────────────────────────────────────────────────────────
    async fn create_job(&self, params: CreateJobParams) -> DbResult<Job>;
    async fn get_job(&self, id: i32) -> DbResult<Job>;
    async fn update_job(&self, params: UpdateJobParams) -> DbResult<Job>;
    async fn delete_job(&self, id: i32) -> DbResult<()>;
    async fn list_jobs(&self, page: Pagination) -> DbResult<Vec<Job>>;
    async fn list_jobs_by_company_id(&self, company_id: i32, page: Pagination)
        -> DbResult<Vec<Job>>;
    /// Case-insensitive substring match on the job title.
    async fn list_jobs_by_title(&self, title: &str, page: Pagination) -> DbResult<Vec<Job>>;
    async fn list_jobs_by_industry(&self, industry: &str, page: Pagination)
        -> DbResult<Vec<Job>>;
    /// Case-insensitive substring match on the owning company's name.
    async fn list_jobs_by_company_name(&self, name: &str, page: Pagination)
        -> DbResult<Vec<Job>>;
    async fn list_jobs_by_company_exact_name(
        &self,
        name: &str,
        page: Pagination,
    ) -> DbResult<Vec<Job>>;
    async fn list_jobs_by_location(&self, location: &str, page: Pagination)
        -> DbResult<Vec<Job>>;
    /// Jobs whose salary band lies entirely inside `range`.
    async fn list_jobs_by_salary_range(
        &self,
        range: SalaryRange,
        page: Pagination,
    ) -> DbResult<Vec<Job>>;
    /// Jobs sharing at least one exact (case-sensitive) skill with the user.
    async fn list_jobs_matching_user_skills(
        &self,
        user_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<Job>>;

    // ── job skills ──────────────────────────────────────────────────────────
    async fn create_job_skill(&self, job_id: i32, skill: &str) -> DbResult<JobSkill>;
    async fn list_job_skills_by_job_id(&self, job_id: i32, page: Pagination)
        -> DbResult<Vec<JobSkill>>;
    async fn list_all_job_skills_by_job_id(&self, job_id: i32) -> DbResult<Vec<JobSkill>>;
    async fn delete_job_skills_by_job_id(&self, job_id: i32) -> DbResult<()>;

    // ── search projection ───────────────────────────────────────────────────
    async fn get_indexed_job(&self, job_id: i32) -> DbResult<IndexedJob>;
    async fn list_indexed_jobs(&self) -> DbResult<Vec<IndexedJob>>;

    // ── job applications ────────────────────────────────────────────────────
    async fn create_job_application(
        &self,
        params: CreateJobApplicationParams,
    ) -> DbResult<JobApplication>;
    async fn get_job_application(&self, id: i32) -> DbResult<JobApplication>;
    async fn list_job_applications_by_user_id(
        &self,
        user_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<JobApplicationSummary>>;
    async fn list_job_applications_by_job_id(
        &self,
        job_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<JobApplicationSummary>>;
}
