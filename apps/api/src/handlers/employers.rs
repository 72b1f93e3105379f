use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::password::{check_password, hash_password, PasswordError};
use crate::auth::token::{Payload, Role};
use crate::auth::{current_employer, AuthPayload};
use crate::db::models::{
    Company, CreateCompanyParams, CreateEmployerParams, Employer, Job, Pagination,
    UpdateCompanyParams, UpdateEmployerParams,
};
use crate::errors::AppError;
use crate::handlers::extract::{AppJson, AppQuery};
use crate::handlers::jobs::{reindex_company_jobs, unindex_job};
use crate::handlers::{
    not_found, LoginRequest, LoginResponse, PageQuery, UpdatePasswordRequest,
    ONLY_EMPLOYERS_ACCESS_ERROR,
};
use crate::state::AppState;
use crate::validation::{require_non_empty, validate_email, validate_password};

/// Jobs are removed in batches of this size when an employer is deleted.
const DELETE_BATCH_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateEmployerRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub company_name: String,
    pub company_industry: String,
    pub company_location: String,
}

impl CreateEmployerRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("full_name", &self.full_name)?;
        validate_email("email", &self.email)?;
        validate_password("password", &self.password)?;
        require_non_empty("company_name", &self.company_name)?;
        require_non_empty("company_industry", &self.company_industry)?;
        require_non_empty("company_location", &self.company_location)
    }
}

/// Every field is optional; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEmployerRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub company_industry: Option<String>,
    pub company_location: Option<String>,
}

impl UpdateEmployerRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(email) = &self.email {
            validate_email("email", email)?;
        }
        let text_fields = [
            ("full_name", &self.full_name),
            ("company_name", &self.company_name),
            ("company_industry", &self.company_industry),
            ("company_location", &self.company_location),
        ];
        for (field, value) in text_fields {
            if let Some(value) = value {
                require_non_empty(field, value)?;
            }
        }
        Ok(())
    }

    fn touches_employer(&self) -> bool {
        self.full_name.is_some() || self.email.is_some()
    }

    fn touches_company(&self) -> bool {
        self.company_name.is_some()
            || self.company_industry.is_some()
            || self.company_location.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct EmployerResponse {
    pub employer: Employer,
    pub company: Company,
}

/// Resolves the employer behind the bearer. Tokens issued to users are rejected
/// outright; any lookup failure is a 500.
pub async fn caller_employer(
    state: &AppState,
    payload: &Payload,
) -> Result<(Employer, Company), AppError> {
    if payload.role != Role::Employer {
        return Err(AppError::Unauthorized(ONLY_EMPLOYERS_ACCESS_ERROR.into()));
    }
    current_employer(&state.store, payload)
        .await
        .map_err(AppError::Database)
}

/// POST /api/v1/employers
///
/// Creates the company first, then the employer. If the employer insert fails the
/// company row is removed again.
pub async fn handle_create_employer(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateEmployerRequest>,
) -> Result<(StatusCode, Json<EmployerResponse>), AppError> {
    req.validate()?;
    let hashed_password = hash_password(&req.password).map_err(AppError::internal)?;

    let company = state
        .store
        .create_company(CreateCompanyParams {
            name: req.company_name,
            industry: req.company_industry,
            location: req.company_location,
        })
        .await?;

    let employer = match state
        .store
        .create_employer(CreateEmployerParams {
            company_id: company.id,
            full_name: req.full_name,
            email: req.email,
            hashed_password,
        })
        .await
    {
        Ok(employer) => employer,
        Err(err) => {
            if let Err(cleanup) = state.store.delete_company(company.id).await {
                warn!(
                    "Failed to remove company {} after employer insert failed: {cleanup}",
                    company.id
                );
            }
            return Err(err.into());
        }
    };

    info!("Created employer {} for company {}", employer.id, company.id);
    Ok((StatusCode::CREATED, Json(EmployerResponse { employer, company })))
}

/// POST /api/v1/employers/login
pub async fn handle_login_employer(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse<EmployerResponse>>, AppError> {
    validate_email("email", &req.email)?;
    validate_password("password", &req.password)?;

    let employer = state
        .store
        .get_employer_by_email(&req.email)
        .await
        .map_err(not_found("employer"))?;
    let company = state
        .store
        .get_company_by_id(employer.company_id)
        .await
        .map_err(not_found("company"))?;

    check_password(&req.password, &employer.hashed_password).map_err(password_error)?;

    let (access_token, payload) = state
        .tokens
        .create_token(
            &employer.email,
            Role::Employer,
            state.config.access_token_duration,
        )
        .map_err(AppError::internal)?;

    Ok(Json(LoginResponse {
        access_token,
        access_token_expires_at: payload.expires_at(),
        account: EmployerResponse { employer, company },
    }))
}

/// GET /api/v1/employers
pub async fn handle_get_employer(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
) -> Result<Json<EmployerResponse>, AppError> {
    let (employer, company) = caller_employer(&state, &payload).await?;
    Ok(Json(EmployerResponse { employer, company }))
}

/// PATCH /api/v1/employers
///
/// Changing the email invalidates the caller's bearer, which is bound to the old
/// address.
pub async fn handle_update_employer(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppJson(req): AppJson<UpdateEmployerRequest>,
) -> Result<Json<EmployerResponse>, AppError> {
    req.validate()?;
    let (mut employer, mut company) = caller_employer(&state, &payload).await?;

    if req.touches_employer() {
        employer = state
            .store
            .update_employer(UpdateEmployerParams {
                id: employer.id,
                full_name: req.full_name.clone().unwrap_or(employer.full_name),
                email: req.email.clone().unwrap_or(employer.email),
            })
            .await
            .map_err(AppError::Database)?;
    }

    if req.touches_company() {
        let renamed = req
            .company_name
            .as_ref()
            .is_some_and(|name| *name != company.name);
        company = state
            .store
            .update_company(UpdateCompanyParams {
                id: company.id,
                name: req.company_name.unwrap_or(company.name),
                industry: req.company_industry.unwrap_or(company.industry),
                location: req.company_location.unwrap_or(company.location),
            })
            .await
            .map_err(AppError::Database)?;

        if renamed {
            reindex_company_jobs(&state, company.id).await;
        }
    }

    Ok(Json(EmployerResponse { employer, company }))
}

/// PATCH /api/v1/employers/password
pub async fn handle_update_employer_password(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppJson(req): AppJson<UpdatePasswordRequest>,
) -> Result<StatusCode, AppError> {
    validate_password("old_password", &req.old_password)?;
    validate_password("new_password", &req.new_password)?;
    let (employer, _) = caller_employer(&state, &payload).await?;

    check_password(&req.old_password, &employer.hashed_password).map_err(password_error)?;
    let hashed_password = hash_password(&req.new_password).map_err(AppError::internal)?;
    state
        .store
        .update_employer_password(employer.id, &hashed_password)
        .await
        .map_err(AppError::Database)?;

    Ok(StatusCode::OK)
}

/// DELETE /api/v1/employers
///
/// Removes every job of the company (rows and index documents), then the employer,
/// then the company.
pub async fn handle_delete_employer(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
) -> Result<StatusCode, AppError> {
    let (employer, company) = caller_employer(&state, &payload).await?;

    loop {
        let jobs = state
            .store
            .list_jobs_by_company_id(company.id, Pagination::new(DELETE_BATCH_SIZE, 0))
            .await
            .map_err(AppError::Database)?;
        if jobs.is_empty() {
            break;
        }
        for job in jobs {
            state
                .store
                .delete_job_posting(job.id)
                .await
                .map_err(AppError::Database)?;
            unindex_job(&state, job.id).await?;
        }
    }

    state
        .store
        .delete_employer(employer.id)
        .await
        .map_err(AppError::Database)?;
    state
        .store
        .delete_company(company.id)
        .await
        .map_err(AppError::Database)?;

    info!("Deleted employer {} and company {}", employer.id, company.id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/employers/jobs
pub async fn handle_list_employer_jobs(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<Vec<Job>>, AppError> {
    let (_, company) = caller_employer(&state, &payload).await?;
    let jobs = state
        .store
        .list_jobs_by_company_id(company.id, query.pagination())
        .await?;
    Ok(Json(jobs))
}

pub(crate) fn password_error(err: PasswordError) -> AppError {
    match err {
        PasswordError::Mismatch => AppError::Unauthorized("incorrect password".into()),
        other => AppError::internal(other),
    }
}
