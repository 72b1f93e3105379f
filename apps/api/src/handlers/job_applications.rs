use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::auth::token::Role;
use crate::auth::{current_user, AuthPayload};
use crate::cv::read_application_form;
use crate::db::models::{CreateJobApplicationParams, JobApplicationSummary};
use crate::errors::AppError;
use crate::handlers::employers::caller_employer;
use crate::handlers::extract::{AppPath, AppQuery};
use crate::handlers::{not_found, PageQuery};
use crate::state::AppState;

/// POST /api/v1/job-applications
///
/// Multipart form with a `cv` file, a positive `job_id` and an optional `message`.
/// The caller is resolved before the body is read.
pub async fn handle_create_job_application(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<JobApplicationSummary>), AppError> {
    let user = current_user(&state.store, &payload).await?;

    let multipart = multipart.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let form = read_application_form(multipart, state.config.max_cv_bytes).await?;

    let application = state
        .store
        .create_job_application(CreateJobApplicationParams {
            user_id: user.id,
            job_id: form.job_id,
            message: form.message,
            cv: form.cv,
        })
        .await?;

    info!(
        "User {} applied to job {} (application {})",
        user.id, application.job_id, application.id
    );
    Ok((StatusCode::CREATED, Json(application.into())))
}

/// GET /api/v1/job-applications
pub async fn handle_list_job_applications(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<Vec<JobApplicationSummary>>, AppError> {
    let user = current_user(&state.store, &payload).await?;
    let applications = state
        .store
        .list_job_applications_by_user_id(user.id, query.pagination())
        .await?;
    Ok(Json(applications))
}

/// GET /api/v1/job-applications/:id
///
/// Visible to the applicant and to the employer that owns the job.
pub async fn handle_get_job_application(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppPath(application_id): AppPath<i32>,
) -> Result<Json<JobApplicationSummary>, AppError> {
    let application = match payload.role {
        Role::User => {
            let user = current_user(&state.store, &payload).await?;
            let application = state
                .store
                .get_job_application(application_id)
                .await
                .map_err(not_found("job application"))?;
            if application.user_id != user.id {
                return Err(AppError::Forbidden(
                    "job application belongs to another user".into(),
                ));
            }
            application
        }
        Role::Employer => {
            let (_, company) = caller_employer(&state, &payload).await?;
            let application = state
                .store
                .get_job_application(application_id)
                .await
                .map_err(not_found("job application"))?;
            let job = state
                .store
                .get_job(application.job_id)
                .await
                .map_err(AppError::Database)?;
            if job.company_id != company.id {
                return Err(AppError::Forbidden(
                    "job application belongs to another company".into(),
                ));
            }
            application
        }
    };
    Ok(Json(application.into()))
}
