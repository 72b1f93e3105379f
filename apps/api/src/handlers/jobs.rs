use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::auth::token::Payload;
use crate::auth::{current_user, AuthPayload};
use crate::db::models::{
    Company, CreateJobParams, Job, JobApplicationSummary, JobSkill, Pagination, SalaryRange,
    UpdateJobParams,
};
use crate::db::{DbResult, Store};
use crate::errors::AppError;
use crate::handlers::employers::caller_employer;
use crate::handlers::extract::{AppJson, AppPath, AppQuery};
use crate::handlers::{not_found, pagination, PageQuery};
use crate::search::{refresh_job, JobFilter, SearchHit};
use crate::state::AppState;
use crate::validation::{require_non_empty, validate_salary_range, validate_skills};

const REINDEX_BATCH_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub industry: String,
    pub location: String,
    pub salary_min: i32,
    pub salary_max: i32,
    pub requirements: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

impl CreateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("title", &self.title)?;
        require_non_empty("description", &self.description)?;
        require_non_empty("industry", &self.industry)?;
        require_non_empty("location", &self.location)?;
        require_non_empty("requirements", &self.requirements)?;
        validate_salary_range("salary_min", self.salary_min, "salary_max", self.salary_max)?;
        validate_skills("required_skills", self.required_skills.iter().map(String::as_str))
    }
}

/// Omitted fields keep their stored value. A present `required_skills` replaces the
/// whole skill set.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub requirements: Option<String>,
    pub required_skills: Option<Vec<String>>,
}

impl UpdateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        let text_fields = [
            ("title", &self.title),
            ("description", &self.description),
            ("industry", &self.industry),
            ("location", &self.location),
            ("requirements", &self.requirements),
        ];
        for (field, value) in text_fields {
            if let Some(value) = value {
                require_non_empty(field, value)?;
            }
        }
        if let Some(skills) = &self.required_skills {
            validate_skills("required_skills", skills.iter().map(String::as_str))?;
        }
        Ok(())
    }
}

/// Listing filters. At most one facet may be given; `salary_min` and `salary_max`
/// together count as one.
#[derive(Debug, Default, Deserialize)]
pub struct JobSearchQuery {
    pub title: Option<String>,
    pub industry: Option<String>,
    pub company_name: Option<String>,
    pub exact_company_name: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl JobSearchQuery {
    pub fn filter(&self) -> Result<JobFilter, AppError> {
        let mut filters = Vec::new();
        if let Some(title) = facet(&self.title) {
            filters.push(JobFilter::Title(title));
        }
        if let Some(industry) = facet(&self.industry) {
            filters.push(JobFilter::Industry(industry));
        }
        if let Some(name) = facet(&self.company_name) {
            filters.push(JobFilter::CompanyName(name));
        }
        if let Some(name) = facet(&self.exact_company_name) {
            filters.push(JobFilter::CompanyExactName(name));
        }
        if let Some(location) = facet(&self.location) {
            filters.push(JobFilter::Location(location));
        }
        match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) => {
                validate_salary_range("salary_min", min, "salary_max", max)?;
                filters.push(JobFilter::SalaryRange(SalaryRange { min, max }));
            }
            (None, None) => {}
            _ => {
                return Err(AppError::Validation(
                    "salary_min and salary_max must be given together".into(),
                ))
            }
        }

        match filters.len() {
            0 => Ok(JobFilter::All),
            1 => Ok(filters.remove(0)),
            _ => Err(AppError::Validation(
                "at most one search filter may be given".into(),
            )),
        }
    }

    pub fn pagination(&self) -> Pagination {
        pagination(self.limit, self.offset)
    }
}

/// A blank facet counts as absent; anything else is matched as given.
fn facet(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    #[serde(flatten)]
    pub job: Job,
    pub skills: Vec<JobSkill>,
}

#[derive(Debug, Serialize)]
pub struct JobDetailResponse {
    #[serde(flatten)]
    pub job: Job,
    pub company: Company,
    pub skills: Vec<JobSkill>,
}

#[derive(Debug, Serialize)]
pub struct SearchJobsResponse {
    pub total: u64,
    pub jobs: Vec<SearchHit>,
}

/// Writes the job's current projection to the index. The row-store write is kept
/// even when this fails.
async fn sync_index(state: &AppState, job_id: i32) -> Result<(), AppError> {
    refresh_job(&*state.store, state.index.as_ref(), job_id)
        .await
        .map_err(|err| {
            error!("Failed to index job {job_id}: {err}");
            AppError::Index(err)
        })?;
    Ok(())
}

/// Removes the job's document from the index after its rows are gone.
pub(crate) async fn unindex_job(state: &AppState, job_id: i32) -> Result<(), AppError> {
    state.index.delete(job_id).await.map_err(|err| {
        error!("Failed to remove job {job_id} from the index: {err}");
        AppError::Index(err)
    })
}

/// Re-indexes every job of a company, e.g. after its name changed. Failures are
/// logged and skipped.
pub(crate) async fn reindex_company_jobs(state: &AppState, company_id: i32) {
    let mut offset = 0;
    loop {
        let page = Pagination::new(REINDEX_BATCH_SIZE, offset);
        let jobs = match state.store.list_jobs_by_company_id(company_id, page).await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!("Failed to list jobs of company {company_id} for re-indexing: {err}");
                return;
            }
        };
        if jobs.is_empty() {
            break;
        }
        for job in &jobs {
            if let Err(err) = refresh_job(&*state.store, state.index.as_ref(), job.id).await {
                warn!("Failed to re-index job {}: {err}", job.id);
            }
        }
        offset += jobs.len() as i64;
    }
}

/// The job, provided it belongs to the caller's company.
async fn owned_job(state: &AppState, payload: &Payload, job_id: i32) -> Result<Job, AppError> {
    let (_, company) = caller_employer(state, payload).await?;
    let job = state
        .store
        .get_job(job_id)
        .await
        .map_err(not_found("job"))?;
    if job.company_id != company.id {
        return Err(AppError::Forbidden(
            "job belongs to another company".into(),
        ));
    }
    Ok(job)
}

async fn list_jobs_by_filter(
    store: &Store,
    filter: &JobFilter,
    page: Pagination,
) -> DbResult<Vec<Job>> {
    match filter {
        JobFilter::All => store.list_jobs(page).await,
        JobFilter::Title(title) => store.list_jobs_by_title(title, page).await,
        JobFilter::Industry(industry) => store.list_jobs_by_industry(industry, page).await,
        JobFilter::CompanyName(name) => store.list_jobs_by_company_name(name, page).await,
        JobFilter::CompanyExactName(name) => {
            store.list_jobs_by_company_exact_name(name, page).await
        }
        JobFilter::Location(location) => store.list_jobs_by_location(location, page).await,
        JobFilter::SalaryRange(range) => store.list_jobs_by_salary_range(*range, page).await,
    }
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppJson(req): AppJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    req.validate()?;
    let (_, company) = caller_employer(&state, &payload).await?;

    let job = state
        .store
        .create_job(CreateJobParams {
            title: req.title,
            industry: req.industry,
            company_id: company.id,
            description: req.description,
            location: req.location,
            salary_min: req.salary_min,
            salary_max: req.salary_max,
            requirements: req.requirements,
        })
        .await
        .map_err(AppError::Database)?;

    state
        .store
        .create_multiple_job_skills(job.id, &req.required_skills)
        .await
        .map_err(AppError::Database)?;
    let skills = state
        .store
        .list_job_skills_by_job_id(job.id, Pagination::first_page())
        .await
        .map_err(AppError::Database)?;

    sync_index(&state, job.id).await?;

    info!("Created job {} for company {}", job.id, company.id);
    Ok((StatusCode::CREATED, Json(JobResponse { job, skills })))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    AppPath(job_id): AppPath<i32>,
) -> Result<Json<JobDetailResponse>, AppError> {
    let job = state
        .store
        .get_job(job_id)
        .await
        .map_err(not_found("job"))?;
    job_detail(&state, job).await.map(Json)
}

async fn job_detail(state: &AppState, job: Job) -> Result<JobDetailResponse, AppError> {
    let company = state
        .store
        .get_company_by_id(job.company_id)
        .await
        .map_err(AppError::Database)?;
    let skills = state
        .store
        .list_all_job_skills_by_job_id(job.id)
        .await
        .map_err(AppError::Database)?;
    Ok(JobDetailResponse {
        job,
        company,
        skills,
    })
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppPath(job_id): AppPath<i32>,
    AppJson(req): AppJson<UpdateJobRequest>,
) -> Result<Json<JobDetailResponse>, AppError> {
    req.validate()?;
    let job = owned_job(&state, &payload, job_id).await?;

    let salary_min = req.salary_min.unwrap_or(job.salary_min);
    let salary_max = req.salary_max.unwrap_or(job.salary_max);
    validate_salary_range("salary_min", salary_min, "salary_max", salary_max)?;

    let job = state
        .store
        .update_job(UpdateJobParams {
            id: job.id,
            title: req.title.unwrap_or(job.title),
            industry: req.industry.unwrap_or(job.industry),
            description: req.description.unwrap_or(job.description),
            location: req.location.unwrap_or(job.location),
            salary_min,
            salary_max,
            requirements: req.requirements.unwrap_or(job.requirements),
        })
        .await
        .map_err(AppError::Database)?;

    if let Some(skills) = &req.required_skills {
        state
            .store
            .delete_job_skills_by_job_id(job.id)
            .await
            .map_err(AppError::Database)?;
        state
            .store
            .create_multiple_job_skills(job.id, skills)
            .await
            .map_err(AppError::Database)?;
    }

    sync_index(&state, job.id).await?;
    job_detail(&state, job).await.map(Json)
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppPath(job_id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    let job = owned_job(&state, &payload, job_id).await?;
    state
        .store
        .delete_job_posting(job.id)
        .await
        .map_err(AppError::Database)?;
    unindex_job(&state, job.id).await?;

    info!("Deleted job {}", job.id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/jobs
///
/// Reads straight from the row store.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<JobSearchQuery>,
) -> Result<Json<Vec<Job>>, AppError> {
    let filter = query.filter()?;
    let jobs = list_jobs_by_filter(&state.store, &filter, query.pagination()).await?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/search
///
/// Served from the search index, which may briefly lag the row store.
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<JobSearchQuery>,
) -> Result<Json<SearchJobsResponse>, AppError> {
    let filter = query.filter()?;
    let page = state.index.search(&filter, query.pagination()).await?;
    Ok(Json(SearchJobsResponse {
        total: page.total,
        jobs: page.hits,
    }))
}

/// GET /api/v1/jobs/matching
///
/// Jobs sharing at least one skill with the calling user.
pub async fn handle_list_matching_jobs(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<Vec<Job>>, AppError> {
    let user = current_user(&state.store, &payload).await?;
    let jobs = state
        .store
        .list_jobs_matching_user_skills(user.id, query.pagination())
        .await?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/:id/applications
pub async fn handle_list_job_applications_for_job(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppPath(job_id): AppPath<i32>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<Vec<JobApplicationSummary>>, AppError> {
    let job = owned_job(&state, &payload, job_id).await?;
    let applications = state
        .store
        .list_job_applications_by_job_id(job.id, query.pagination())
        .await?;
    Ok(Json(applications))
}
