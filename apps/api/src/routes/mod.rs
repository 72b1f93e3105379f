pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use crate::handlers::{employers, job_applications, jobs, users};
use crate::state::AppState;

/// Room for the non-file parts of an application form on top of the CV itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let application_body_limit = state.config.max_cv_bytes + FORM_OVERHEAD_BYTES;

    let api = Router::new()
        // Employers
        .route(
            "/employers",
            post(employers::handle_create_employer)
                .get(employers::handle_get_employer)
                .patch(employers::handle_update_employer)
                .delete(employers::handle_delete_employer),
        )
        .route("/employers/login", post(employers::handle_login_employer))
        .route(
            "/employers/password",
            patch(employers::handle_update_employer_password),
        )
        .route("/employers/jobs", get(employers::handle_list_employer_jobs))
        // Users
        .route(
            "/users",
            post(users::handle_create_user)
                .get(users::handle_get_user)
                .patch(users::handle_update_user)
                .delete(users::handle_delete_user),
        )
        .route("/users/login", post(users::handle_login_user))
        .route("/users/password", patch(users::handle_update_user_password))
        .route("/users/skills", post(users::handle_add_user_skills))
        .route("/users/skills/:id", delete(users::handle_delete_user_skill))
        // Jobs
        .route(
            "/jobs",
            post(jobs::handle_create_job).get(jobs::handle_list_jobs),
        )
        .route("/jobs/search", get(jobs::handle_search_jobs))
        .route("/jobs/matching", get(jobs::handle_list_matching_jobs))
        .route(
            "/jobs/:id",
            get(jobs::handle_get_job)
                .patch(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route(
            "/jobs/:id/applications",
            get(jobs::handle_list_job_applications_for_job),
        )
        // Job applications
        .route(
            "/job-applications",
            post(job_applications::handle_create_job_application)
                .layer(DefaultBodyLimit::max(application_body_limit))
                .get(job_applications::handle_list_job_applications),
        )
        .route(
            "/job-applications/:id",
            get(job_applications::handle_get_job_application),
        );

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/v1", api)
        .with_state(state)
}
