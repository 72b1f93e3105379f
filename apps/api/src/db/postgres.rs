//! sqlx-backed implementation of [`Queries`].

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::*;
use crate::db::queries::Queries;
use crate::db::{contains_pattern, DbError, DbResult};
use crate::search::IndexedJob;

const INDEXED_JOB_SELECT: &str = r#"
    SELECT j.id, j.title, j.industry, c.name AS company_name, j.description, j.location,
           j.salary_min, j.salary_max, j.requirements,
           COALESCE(
               array_agg(js.skill ORDER BY js.id) FILTER (WHERE js.id IS NOT NULL),
               ARRAY[]::TEXT[]
           ) AS job_skills
    FROM jobs j
    JOIN companies c ON c.id = j.company_id
    LEFT JOIN job_skills js ON js.job_id = j.id
"#;

const APPLICATION_SUMMARY_COLUMNS: &str = "id, user_id, job_id, message, status, applied_at";

#[derive(Clone)]
pub struct PgQueries {
    pool: PgPool,
}

impl PgQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_jobs(&self, sql: &str, arg: &str, page: Pagination) -> DbResult<Vec<Job>> {
        Ok(sqlx::query_as::<_, Job>(sql)
            .bind(arg)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?)
    }
}

/// `DELETE`/`UPDATE` without `RETURNING` report a miss through the affected row count.
fn expect_affected(rows: u64) -> DbResult<()> {
    if rows == 0 {
        Err(DbError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Queries for PgQueries {
    async fn create_company(&self, params: CreateCompanyParams) -> DbResult<Company> {
        Ok(sqlx::query_as::<_, Company>(
            "INSERT INTO companies (name, industry, location) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(params.name)
        .bind(params.industry)
        .bind(params.location)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_company_by_id(&self, id: i32) -> DbResult<Company> {
        Ok(
            sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn get_company_by_name(&self, name: &str) -> DbResult<Company> {
        Ok(
            sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE name = $1")
                .bind(name)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn update_company(&self, params: UpdateCompanyParams) -> DbResult<Company> {
        Ok(sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET name = $2, industry = $3, location = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(params.id)
        .bind(params.name)
        .bind(params.industry)
        .bind(params.location)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_company(&self, id: i32) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn create_employer(&self, params: CreateEmployerParams) -> DbResult<Employer> {
        Ok(sqlx::query_as::<_, Employer>(
            r#"
            INSERT INTO employers (company_id, full_name, email, hashed_password)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(params.company_id)
        .bind(params.full_name)
        .bind(params.email)
        .bind(params.hashed_password)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_employer_by_id(&self, id: i32) -> DbResult<Employer> {
        Ok(
            sqlx::query_as::<_, Employer>("SELECT * FROM employers WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn get_employer_by_email(&self, email: &str) -> DbResult<Employer> {
        Ok(
            sqlx::query_as::<_, Employer>("SELECT * FROM employers WHERE email = $1")
                .bind(email)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn update_employer(&self, params: UpdateEmployerParams) -> DbResult<Employer> {
        Ok(sqlx::query_as::<_, Employer>(
            "UPDATE employers SET full_name = $2, email = $3 WHERE id = $1 RETURNING *",
        )
        .bind(params.id)
        .bind(params.full_name)
        .bind(params.email)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_employer_password(&self, id: i32, hashed_password: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE employers SET hashed_password = $2 WHERE id = $1")
            .bind(id)
            .bind(hashed_password)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn delete_employer(&self, id: i32) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM employers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn create_user(&self, params: CreateUserParams) -> DbResult<User> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (email, hashed_password, full_name, location, desired_job_title,
                 desired_industry, desired_salary_min, desired_salary_max, skills, experience)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(params.email)
        .bind(params.hashed_password)
        .bind(params.full_name)
        .bind(params.location)
        .bind(params.desired_job_title)
        .bind(params.desired_industry)
        .bind(params.desired_salary_min)
        .bind(params.desired_salary_max)
        .bind(params.skills)
        .bind(params.experience)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_user_by_id(&self, id: i32) -> DbResult<User> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> DbResult<User> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn update_user(&self, params: UpdateUserParams) -> DbResult<User> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = $2, full_name = $3, location = $4, desired_job_title = $5,
                desired_industry = $6, desired_salary_min = $7, desired_salary_max = $8,
                skills = $9, experience = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(params.id)
        .bind(params.email)
        .bind(params.full_name)
        .bind(params.location)
        .bind(params.desired_job_title)
        .bind(params.desired_industry)
        .bind(params.desired_salary_min)
        .bind(params.desired_salary_max)
        .bind(params.skills)
        .bind(params.experience)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_user_password(&self, id: i32, hashed_password: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET hashed_password = $2 WHERE id = $1")
            .bind(id)
            .bind(hashed_password)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn delete_user(&self, id: i32) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn create_user_skill(&self, params: CreateUserSkillParams) -> DbResult<UserSkill> {
        Ok(sqlx::query_as::<_, UserSkill>(
            "INSERT INTO user_skills (user_id, skill, experience) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(params.user_id)
        .bind(params.skill)
        .bind(params.experience)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_user_skill_by_id(&self, id: i32) -> DbResult<UserSkill> {
        Ok(
            sqlx::query_as::<_, UserSkill>("SELECT * FROM user_skills WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn list_user_skills(&self, user_id: i32, page: Pagination) -> DbResult<Vec<UserSkill>> {
        Ok(sqlx::query_as::<_, UserSkill>(
            "SELECT * FROM user_skills WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_user_skill(&self, id: i32) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM user_skills WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn create_job(&self, params: CreateJobParams) -> DbResult<Job> {
        Ok(sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
                (title, industry, company_id, description, location,
                 salary_min, salary_max, requirements)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(params.title)
        .bind(params.industry)
        .bind(params.company_id)
        .bind(params.description)
        .bind(params.location)
        .bind(params.salary_min)
        .bind(params.salary_max)
        .bind(params.requirements)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_job(&self, id: i32) -> DbResult<Job> {
        Ok(sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_job(&self, params: UpdateJobParams) -> DbResult<Job> {
        Ok(sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET
                title = $2, industry = $3, description = $4, location = $5,
                salary_min = $6, salary_max = $7, requirements = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(params.id)
        .bind(params.title)
        .bind(params.industry)
        .bind(params.description)
        .bind(params.location)
        .bind(params.salary_min)
        .bind(params.salary_max)
        .bind(params.requirements)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_job(&self, id: i32) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn list_jobs(&self, page: Pagination) -> DbResult<Vec<Job>> {
        Ok(
            sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY id LIMIT $1 OFFSET $2")
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn list_jobs_by_company_id(
        &self,
        company_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        Ok(sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE company_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
        )
        .bind(company_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_jobs_by_title(&self, title: &str, page: Pagination) -> DbResult<Vec<Job>> {
        self.fetch_jobs(
            "SELECT * FROM jobs WHERE title ILIKE $1 ORDER BY id LIMIT $2 OFFSET $3",
            &contains_pattern(title),
            page,
        )
        .await
    }

    async fn list_jobs_by_industry(
        &self,
        industry: &str,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.fetch_jobs(
            "SELECT * FROM jobs WHERE industry = $1 ORDER BY id LIMIT $2 OFFSET $3",
            industry,
            page,
        )
        .await
    }

    async fn list_jobs_by_company_name(
        &self,
        name: &str,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.fetch_jobs(
            r#"
            SELECT j.* FROM jobs j
            JOIN companies c ON c.id = j.company_id
            WHERE c.name ILIKE $1
            ORDER BY j.id
            LIMIT $2 OFFSET $3
            "#,
            &contains_pattern(name),
            page,
        )
        .await
    }

    async fn list_jobs_by_company_exact_name(
        &self,
        name: &str,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.fetch_jobs(
            r#"
            SELECT j.* FROM jobs j
            JOIN companies c ON c.id = j.company_id
            WHERE c.name = $1
            ORDER BY j.id
            LIMIT $2 OFFSET $3
            "#,
            name,
            page,
        )
        .await
    }

    async fn list_jobs_by_location(
        &self,
        location: &str,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.fetch_jobs(
            "SELECT * FROM jobs WHERE location = $1 ORDER BY id LIMIT $2 OFFSET $3",
            location,
            page,
        )
        .await
    }

    async fn list_jobs_by_salary_range(
        &self,
        range: SalaryRange,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        Ok(sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE salary_min >= $1 AND salary_max <= $2
            ORDER BY id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(range.min)
        .bind(range.max)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_jobs_matching_user_skills(
        &self,
        user_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        Ok(sqlx::query_as::<_, Job>(
            r#"
            SELECT j.* FROM jobs j
            WHERE EXISTS (
                SELECT 1 FROM job_skills js
                JOIN user_skills us ON us.skill = js.skill
                WHERE js.job_id = j.id AND us.user_id = $1
            )
            ORDER BY j.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_job_skill(&self, job_id: i32, skill: &str) -> DbResult<JobSkill> {
        Ok(sqlx::query_as::<_, JobSkill>(
            "INSERT INTO job_skills (job_id, skill) VALUES ($1, $2) RETURNING *",
        )
        .bind(job_id)
        .bind(skill)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_job_skills_by_job_id(
        &self,
        job_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<JobSkill>> {
        Ok(sqlx::query_as::<_, JobSkill>(
            "SELECT * FROM job_skills WHERE job_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
        )
        .bind(job_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_all_job_skills_by_job_id(&self, job_id: i32) -> DbResult<Vec<JobSkill>> {
        Ok(sqlx::query_as::<_, JobSkill>(
            "SELECT * FROM job_skills WHERE job_id = $1 ORDER BY id",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_job_skills_by_job_id(&self, job_id: i32) -> DbResult<()> {
        sqlx::query("DELETE FROM job_skills WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_indexed_job(&self, job_id: i32) -> DbResult<IndexedJob> {
        let sql = format!("{INDEXED_JOB_SELECT} WHERE j.id = $1 GROUP BY j.id, c.name");
        Ok(sqlx::query_as::<_, IndexedJob>(&sql)
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_indexed_jobs(&self) -> DbResult<Vec<IndexedJob>> {
        let sql = format!("{INDEXED_JOB_SELECT} GROUP BY j.id, c.name ORDER BY j.id");
        Ok(sqlx::query_as::<_, IndexedJob>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_job_application(
        &self,
        params: CreateJobApplicationParams,
    ) -> DbResult<JobApplication> {
        Ok(sqlx::query_as::<_, JobApplication>(
            r#"
            INSERT INTO job_applications (user_id, job_id, message, cv)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(params.user_id)
        .bind(params.job_id)
        .bind(params.message)
        .bind(params.cv)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_job_application(&self, id: i32) -> DbResult<JobApplication> {
        Ok(
            sqlx::query_as::<_, JobApplication>("SELECT * FROM job_applications WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn list_job_applications_by_user_id(
        &self,
        user_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<JobApplicationSummary>> {
        let sql = format!(
            "SELECT {APPLICATION_SUMMARY_COLUMNS} FROM job_applications \
             WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3"
        );
        Ok(sqlx::query_as::<_, JobApplicationSummary>(&sql)
            .bind(user_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_job_applications_by_job_id(
        &self,
        job_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<JobApplicationSummary>> {
        let sql = format!(
            "SELECT {APPLICATION_SUMMARY_COLUMNS} FROM job_applications \
             WHERE job_id = $1 ORDER BY id LIMIT $2 OFFSET $3"
        );
        Ok(sqlx::query_as::<_, JobApplicationSummary>(&sql)
            .bind(job_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?)
    }
}

/// Runs the shared contract against a real database. Point `DATABASE_URL` at a scratch
/// database and run with `--ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::contract;
    use crate::db::{create_pool, run_migrations};

    async fn queries() -> (PgQueries, String) {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        (PgQueries::new(pool), uuid::Uuid::new_v4().simple().to_string())
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_company_round_trip() {
        let (q, tag) = queries().await;
        contract::company_round_trip(&q, &tag).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_user_round_trip() {
        let (q, tag) = queries().await;
        contract::user_round_trip(&q, &tag).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_employer_round_trip() {
        let (q, tag) = queries().await;
        contract::employer_round_trip(&q, &tag).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_job_round_trip() {
        let (q, tag) = queries().await;
        contract::job_round_trip(&q, &tag).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_duplicate_application_is_unique_violation() {
        let (q, tag) = queries().await;
        contract::duplicate_application_is_unique_violation(&q, &tag).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_salary_range_returns_contained_jobs() {
        let (q, tag) = queries().await;
        contract::salary_range_returns_contained_jobs(&q, &tag).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_matching_user_skills() {
        let (q, tag) = queries().await;
        contract::matching_user_skills(&q, &tag).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_text_facets() {
        let (q, tag) = queries().await;
        contract::text_facets(&q, &tag).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_indexed_job_projection() {
        let (q, tag) = queries().await;
        contract::indexed_job_projection(&q, &tag).await;
    }

    #[test]
    fn test_expect_affected() {
        assert!(expect_affected(1).is_ok());
        assert!(matches!(expect_affected(0), Err(DbError::NotFound)));
    }
}
