//! In-process row store with the same constraint behaviour as the Postgres schema:
//! unique emails, company names and `(user_id, job_id)` pairs, and foreign keys with
//! the schema's cascade rules. Backs router and store tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::db::models::*;
use crate::db::queries::Queries;
use crate::db::{DbError, DbResult};
use crate::search::IndexedJob;

#[derive(Default)]
struct Tables {
    next_id: i32,
    companies: BTreeMap<i32, Company>,
    employers: BTreeMap<i32, Employer>,
    users: BTreeMap<i32, User>,
    user_skills: BTreeMap<i32, UserSkill>,
    jobs: BTreeMap<i32, Job>,
    job_skills: BTreeMap<i32, JobSkill>,
    applications: BTreeMap<i32, JobApplication>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn indexed_job(&self, job: &Job) -> DbResult<IndexedJob> {
        let company = self
            .companies
            .get(&job.company_id)
            .ok_or(DbError::NotFound)?;
        Ok(IndexedJob {
            id: job.id,
            title: job.title.clone(),
            industry: job.industry.clone(),
            company_name: company.name.clone(),
            description: job.description.clone(),
            location: job.location.clone(),
            salary_min: job.salary_min,
            salary_max: job.salary_max,
            requirements: job.requirements.clone(),
            job_skills: self
                .job_skills
                .values()
                .filter(|s| s.job_id == job.id)
                .map(|s| s.skill.clone())
                .collect(),
        })
    }

    fn jobs_where(&self, page: Pagination, pred: impl Fn(&Job) -> bool) -> Vec<Job> {
        paginate(self.jobs.values().filter(|j| pred(j)).cloned(), page)
    }
}

fn paginate<T>(rows: impl Iterator<Item = T>, page: Pagination) -> Vec<T> {
    rows.skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect()
}

fn unique(constraint: &str) -> DbError {
    DbError::UniqueViolation(constraint.to_string())
}

fn foreign_key(table: &str) -> DbError {
    DbError::Constraint(format!("foreign key violation on {table}"))
}

#[derive(Default)]
pub struct MemoryQueries {
    tables: Mutex<Tables>,
    /// Remaining successful calls per operation before it starts failing.
    faults: Mutex<HashMap<&'static str, usize>>,
}

impl MemoryQueries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `op` succeed `successes` more times, then fails every later call with a
    /// connection-level error. Covers `create_job_skill`, `create_user_skill` and
    /// `delete_job_skills_by_job_id`.
    pub fn fail_after(&self, op: &'static str, successes: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(op, successes);
        }
    }

    fn fault(&self, op: &'static str) -> DbResult<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| DbError::Constraint("memory store poisoned".to_string()))?;
        match faults.get_mut(op) {
            Some(0) => Err(DbError::Database(sqlx::Error::PoolTimedOut)),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> DbResult<T>) -> DbResult<T> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DbError::Constraint("memory store poisoned".to_string()))?;
        f(&mut tables)
    }
}

#[async_trait]
impl Queries for MemoryQueries {
    async fn create_company(&self, params: CreateCompanyParams) -> DbResult<Company> {
        self.with(|t| {
            if t.companies.values().any(|c| c.name == params.name) {
                return Err(unique("companies_name_key"));
            }
            let company = Company {
                id: t.next_id(),
                name: params.name,
                industry: params.industry,
                location: params.location,
            };
            t.companies.insert(company.id, company.clone());
            Ok(company)
        })
    }

    async fn get_company_by_id(&self, id: i32) -> DbResult<Company> {
        self.with(|t| t.companies.get(&id).cloned().ok_or(DbError::NotFound))
    }

    async fn get_company_by_name(&self, name: &str) -> DbResult<Company> {
        self.with(|t| {
            t.companies
                .values()
                .find(|c| c.name == name)
                .cloned()
                .ok_or(DbError::NotFound)
        })
    }

    async fn update_company(&self, params: UpdateCompanyParams) -> DbResult<Company> {
        self.with(|t| {
            if t
                .companies
                .values()
                .any(|c| c.name == params.name && c.id != params.id)
            {
                return Err(unique("companies_name_key"));
            }
            let company = t.companies.get_mut(&params.id).ok_or(DbError::NotFound)?;
            company.name = params.name;
            company.industry = params.industry;
            company.location = params.location;
            Ok(company.clone())
        })
    }

    async fn delete_company(&self, id: i32) -> DbResult<()> {
        self.with(|t| {
            if !t.companies.contains_key(&id) {
                return Err(DbError::NotFound);
            }
            if t.jobs.values().any(|j| j.company_id == id) {
                return Err(foreign_key("jobs"));
            }
            t.employers.retain(|_, e| e.company_id != id);
            t.companies.remove(&id);
            Ok(())
        })
    }

    async fn create_employer(&self, params: CreateEmployerParams) -> DbResult<Employer> {
        self.with(|t| {
            if !t.companies.contains_key(&params.company_id) {
                return Err(foreign_key("employers"));
            }
            if t.employers.values().any(|e| e.email == params.email) {
                return Err(unique("employers_email_key"));
            }
            let employer = Employer {
                id: t.next_id(),
                company_id: params.company_id,
                full_name: params.full_name,
                email: params.email,
                hashed_password: params.hashed_password,
                created_at: Utc::now(),
            };
            t.employers.insert(employer.id, employer.clone());
            Ok(employer)
        })
    }

    async fn get_employer_by_id(&self, id: i32) -> DbResult<Employer> {
        self.with(|t| t.employers.get(&id).cloned().ok_or(DbError::NotFound))
    }

    async fn get_employer_by_email(&self, email: &str) -> DbResult<Employer> {
        self.with(|t| {
            t.employers
                .values()
                .find(|e| e.email == email)
                .cloned()
                .ok_or(DbError::NotFound)
        })
    }

    async fn update_employer(&self, params: UpdateEmployerParams) -> DbResult<Employer> {
        self.with(|t| {
            if t
                .employers
                .values()
                .any(|e| e.email == params.email && e.id != params.id)
            {
                return Err(unique("employers_email_key"));
            }
            let employer = t.employers.get_mut(&params.id).ok_or(DbError::NotFound)?;
            employer.full_name = params.full_name;
            employer.email = params.email;
            Ok(employer.clone())
        })
    }

    async fn update_employer_password(&self, id: i32, hashed_password: &str) -> DbResult<()> {
        self.with(|t| {
            let employer = t.employers.get_mut(&id).ok_or(DbError::NotFound)?;
            employer.hashed_password = hashed_password.to_string();
            Ok(())
        })
    }

    async fn delete_employer(&self, id: i32) -> DbResult<()> {
        self.with(|t| t.employers.remove(&id).map(|_| ()).ok_or(DbError::NotFound))
    }

    async fn create_user(&self, params: CreateUserParams) -> DbResult<User> {
        self.with(|t| {
            if t.users.values().any(|u| u.email == params.email) {
                return Err(unique("users_email_key"));
            }
            let user = User {
                id: t.next_id(),
                email: params.email,
                hashed_password: params.hashed_password,
                full_name: params.full_name,
                location: params.location,
                desired_job_title: params.desired_job_title,
                desired_industry: params.desired_industry,
                desired_salary_min: params.desired_salary_min,
                desired_salary_max: params.desired_salary_max,
                skills: params.skills,
                experience: params.experience,
                created_at: Utc::now(),
            };
            t.users.insert(user.id, user.clone());
            Ok(user)
        })
    }

    async fn get_user_by_id(&self, id: i32) -> DbResult<User> {
        self.with(|t| t.users.get(&id).cloned().ok_or(DbError::NotFound))
    }

    async fn get_user_by_email(&self, email: &str) -> DbResult<User> {
        self.with(|t| {
            t.users
                .values()
                .find(|u| u.email == email)
                .cloned()
                .ok_or(DbError::NotFound)
        })
    }

    async fn update_user(&self, params: UpdateUserParams) -> DbResult<User> {
        self.with(|t| {
            if t
                .users
                .values()
                .any(|u| u.email == params.email && u.id != params.id)
            {
                return Err(unique("users_email_key"));
            }
            let user = t.users.get_mut(&params.id).ok_or(DbError::NotFound)?;
            user.email = params.email;
            user.full_name = params.full_name;
            user.location = params.location;
            user.desired_job_title = params.desired_job_title;
            user.desired_industry = params.desired_industry;
            user.desired_salary_min = params.desired_salary_min;
            user.desired_salary_max = params.desired_salary_max;
            user.skills = params.skills;
            user.experience = params.experience;
            Ok(user.clone())
        })
    }

    async fn update_user_password(&self, id: i32, hashed_password: &str) -> DbResult<()> {
        self.with(|t| {
            let user = t.users.get_mut(&id).ok_or(DbError::NotFound)?;
            user.hashed_password = hashed_password.to_string();
            Ok(())
        })
    }

    async fn delete_user(&self, id: i32) -> DbResult<()> {
        self.with(|t| {
            t.users.remove(&id).ok_or(DbError::NotFound)?;
            t.user_skills.retain(|_, s| s.user_id != id);
            t.applications.retain(|_, a| a.user_id != id);
            Ok(())
        })
    }

    async fn create_user_skill(&self, params: CreateUserSkillParams) -> DbResult<UserSkill> {
        self.fault("create_user_skill")?;
        self.with(|t| {
            if !t.users.contains_key(&params.user_id) {
                return Err(foreign_key("user_skills"));
            }
            let skill = UserSkill {
                id: t.next_id(),
                user_id: params.user_id,
                skill: params.skill,
                experience: params.experience,
            };
            t.user_skills.insert(skill.id, skill.clone());
            Ok(skill)
        })
    }

    async fn get_user_skill_by_id(&self, id: i32) -> DbResult<UserSkill> {
        self.with(|t| t.user_skills.get(&id).cloned().ok_or(DbError::NotFound))
    }

    async fn list_user_skills(&self, user_id: i32, page: Pagination) -> DbResult<Vec<UserSkill>> {
        self.with(|t| {
            Ok(paginate(
                t.user_skills
                    .values()
                    .filter(|s| s.user_id == user_id)
                    .cloned(),
                page,
            ))
        })
    }

    async fn delete_user_skill(&self, id: i32) -> DbResult<()> {
        self.with(|t| t.user_skills.remove(&id).map(|_| ()).ok_or(DbError::NotFound))
    }

    async fn create_job(&self, params: CreateJobParams) -> DbResult<Job> {
        self.with(|t| {
            if !t.companies.contains_key(&params.company_id) {
                return Err(foreign_key("jobs"));
            }
            let job = Job {
                id: t.next_id(),
                title: params.title,
                industry: params.industry,
                company_id: params.company_id,
                description: params.description,
                location: params.location,
                salary_min: params.salary_min,
                salary_max: params.salary_max,
                requirements: params.requirements,
                created_at: Utc::now(),
            };
            t.jobs.insert(job.id, job.clone());
            Ok(job)
        })
    }

    async fn get_job(&self, id: i32) -> DbResult<Job> {
        self.with(|t| t.jobs.get(&id).cloned().ok_or(DbError::NotFound))
    }

    async fn update_job(&self, params: UpdateJobParams) -> DbResult<Job> {
        self.with(|t| {
            let job = t.jobs.get_mut(&params.id).ok_or(DbError::NotFound)?;
            job.title = params.title;
            job.industry = params.industry;
            job.description = params.description;
            job.location = params.location;
            job.salary_min = params.salary_min;
            job.salary_max = params.salary_max;
            job.requirements = params.requirements;
            Ok(job.clone())
        })
    }

    async fn delete_job(&self, id: i32) -> DbResult<()> {
        self.with(|t| {
            if !t.jobs.contains_key(&id) {
                return Err(DbError::NotFound);
            }
            if t.job_skills.values().any(|s| s.job_id == id) {
                return Err(foreign_key("job_skills"));
            }
            t.jobs.remove(&id);
            t.applications.retain(|_, a| a.job_id != id);
            Ok(())
        })
    }

    async fn list_jobs(&self, page: Pagination) -> DbResult<Vec<Job>> {
        self.with(|t| Ok(t.jobs_where(page, |_| true)))
    }

    async fn list_jobs_by_company_id(
        &self,
        company_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.with(|t| Ok(t.jobs_where(page, |j| j.company_id == company_id)))
    }

    async fn list_jobs_by_title(&self, title: &str, page: Pagination) -> DbResult<Vec<Job>> {
        let needle = title.to_lowercase();
        self.with(|t| Ok(t.jobs_where(page, |j| j.title.to_lowercase().contains(&needle))))
    }

    async fn list_jobs_by_industry(
        &self,
        industry: &str,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.with(|t| Ok(t.jobs_where(page, |j| j.industry == industry)))
    }

    async fn list_jobs_by_company_name(
        &self,
        name: &str,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        let needle = name.to_lowercase();
        self.with(|t| {
            let companies = &t.companies;
            Ok(t.jobs_where(page, |j| {
                companies
                    .get(&j.company_id)
                    .is_some_and(|c| c.name.to_lowercase().contains(&needle))
            }))
        })
    }

    async fn list_jobs_by_company_exact_name(
        &self,
        name: &str,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.with(|t| {
            let companies = &t.companies;
            Ok(t.jobs_where(page, |j| {
                companies.get(&j.company_id).is_some_and(|c| c.name == name)
            }))
        })
    }

    async fn list_jobs_by_location(
        &self,
        location: &str,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.with(|t| Ok(t.jobs_where(page, |j| j.location == location)))
    }

    async fn list_jobs_by_salary_range(
        &self,
        range: SalaryRange,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.with(|t| Ok(t.jobs_where(page, |j| range.contains(j.salary_min, j.salary_max))))
    }

    async fn list_jobs_matching_user_skills(
        &self,
        user_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<Job>> {
        self.with(|t| {
            let wanted: Vec<&str> = t
                .user_skills
                .values()
                .filter(|s| s.user_id == user_id)
                .map(|s| s.skill.as_str())
                .collect();
            let job_skills = &t.job_skills;
            Ok(t.jobs_where(page, |j| {
                job_skills
                    .values()
                    .any(|s| s.job_id == j.id && wanted.contains(&s.skill.as_str()))
            }))
        })
    }

    async fn create_job_skill(&self, job_id: i32, skill: &str) -> DbResult<JobSkill> {
        self.fault("create_job_skill")?;
        self.with(|t| {
            if !t.jobs.contains_key(&job_id) {
                return Err(foreign_key("job_skills"));
            }
            let job_skill = JobSkill {
                id: t.next_id(),
                job_id,
                skill: skill.to_string(),
            };
            t.job_skills.insert(job_skill.id, job_skill.clone());
            Ok(job_skill)
        })
    }

    async fn list_job_skills_by_job_id(
        &self,
        job_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<JobSkill>> {
        self.with(|t| {
            Ok(paginate(
                t.job_skills.values().filter(|s| s.job_id == job_id).cloned(),
                page,
            ))
        })
    }

    async fn list_all_job_skills_by_job_id(&self, job_id: i32) -> DbResult<Vec<JobSkill>> {
        self.with(|t| {
            Ok(t
                .job_skills
                .values()
                .filter(|s| s.job_id == job_id)
                .cloned()
                .collect())
        })
    }

    async fn delete_job_skills_by_job_id(&self, job_id: i32) -> DbResult<()> {
        self.fault("delete_job_skills_by_job_id")?;
        self.with(|t| {
            t.job_skills.retain(|_, s| s.job_id != job_id);
            Ok(())
        })
    }

    async fn get_indexed_job(&self, job_id: i32) -> DbResult<IndexedJob> {
        self.with(|t| {
            let job = t.jobs.get(&job_id).ok_or(DbError::NotFound)?;
            t.indexed_job(job)
        })
    }

    async fn list_indexed_jobs(&self) -> DbResult<Vec<IndexedJob>> {
        self.with(|t| t.jobs.values().map(|j| t.indexed_job(j)).collect())
    }

    async fn create_job_application(
        &self,
        params: CreateJobApplicationParams,
    ) -> DbResult<JobApplication> {
        self.with(|t| {
            if !t.users.contains_key(&params.user_id) || !t.jobs.contains_key(&params.job_id) {
                return Err(foreign_key("job_applications"));
            }
            if t
                .applications
                .values()
                .any(|a| a.user_id == params.user_id && a.job_id == params.job_id)
            {
                return Err(unique("job_applications_user_job_key"));
            }
            let application = JobApplication {
                id: t.next_id(),
                user_id: params.user_id,
                job_id: params.job_id,
                message: params.message,
                cv: params.cv,
                status: ApplicationStatus::Applied,
                applied_at: Utc::now(),
            };
            t.applications.insert(application.id, application.clone());
            Ok(application)
        })
    }

    async fn get_job_application(&self, id: i32) -> DbResult<JobApplication> {
        self.with(|t| t.applications.get(&id).cloned().ok_or(DbError::NotFound))
    }

    async fn list_job_applications_by_user_id(
        &self,
        user_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<JobApplicationSummary>> {
        self.with(|t| {
            Ok(paginate(
                t.applications
                    .values()
                    .filter(|a| a.user_id == user_id)
                    .cloned()
                    .map(JobApplicationSummary::from),
                page,
            ))
        })
    }

    async fn list_job_applications_by_job_id(
        &self,
        job_id: i32,
        page: Pagination,
    ) -> DbResult<Vec<JobApplicationSummary>> {
        self.with(|t| {
            Ok(paginate(
                t.applications
                    .values()
                    .filter(|a| a.job_id == job_id)
                    .cloned()
                    .map(JobApplicationSummary::from),
                page,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::contract;

    #[tokio::test]
    async fn test_company_round_trip() {
        contract::company_round_trip(&MemoryQueries::new(), "mem").await;
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        contract::user_round_trip(&MemoryQueries::new(), "mem").await;
    }

    #[tokio::test]
    async fn test_employer_round_trip() {
        contract::employer_round_trip(&MemoryQueries::new(), "mem").await;
    }

    #[tokio::test]
    async fn test_job_round_trip() {
        contract::job_round_trip(&MemoryQueries::new(), "mem").await;
    }

    #[tokio::test]
    async fn test_duplicate_application_is_unique_violation() {
        contract::duplicate_application_is_unique_violation(&MemoryQueries::new(), "mem").await;
    }

    #[tokio::test]
    async fn test_salary_range_returns_contained_jobs() {
        contract::salary_range_returns_contained_jobs(&MemoryQueries::new(), "mem").await;
    }

    #[tokio::test]
    async fn test_matching_user_skills() {
        contract::matching_user_skills(&MemoryQueries::new(), "mem").await;
    }

    #[tokio::test]
    async fn test_text_facets() {
        contract::text_facets(&MemoryQueries::new(), "mem").await;
    }

    #[tokio::test]
    async fn test_indexed_job_projection() {
        contract::indexed_job_projection(&MemoryQueries::new(), "mem").await;
    }

    #[tokio::test]
    async fn test_deleting_company_cascades_to_employer() {
        let q = MemoryQueries::new();
        let company = q
            .create_company(CreateCompanyParams {
                name: "Acme".to_string(),
                industry: "I".to_string(),
                location: "L".to_string(),
            })
            .await
            .unwrap();
        let employer = q
            .create_employer(CreateEmployerParams {
                company_id: company.id,
                full_name: "A".to_string(),
                email: "a@b.c".to_string(),
                hashed_password: "h".to_string(),
            })
            .await
            .unwrap();

        q.delete_company(company.id).await.unwrap();

        assert!(matches!(
            q.get_employer_by_id(employer.id).await,
            Err(DbError::NotFound)
        ));
    }
}
