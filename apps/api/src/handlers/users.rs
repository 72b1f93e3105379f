use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::password::{check_password, hash_password};
use crate::auth::token::Role;
use crate::auth::{current_user, AuthPayload, ONLY_USERS_ACCESS_ERROR};
use crate::db::models::{CreateUserParams, UpdateUserParams, User, UserSkill, UserSkillInput};
use crate::db::DbError;
use crate::errors::AppError;
use crate::handlers::employers::password_error;
use crate::handlers::extract::{AppJson, AppPath};
use crate::handlers::{not_found, LoginRequest, LoginResponse, UpdatePasswordRequest};
use crate::state::AppState;
use crate::validation::{
    require_non_empty, validate_email, validate_non_negative, validate_password,
    validate_salary_range, validate_skills,
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub location: String,
    pub desired_job_title: String,
    pub desired_industry: String,
    pub desired_salary_min: i32,
    pub desired_salary_max: i32,
    #[serde(default)]
    pub skills: Vec<UserSkillInput>,
    /// Free-text summary stored on the user row.
    #[serde(default)]
    pub skills_summary: String,
    #[serde(default)]
    pub experience: String,
}

impl CreateUserRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_email("email", &self.email)?;
        validate_password("password", &self.password)?;
        require_non_empty("full_name", &self.full_name)?;
        require_non_empty("location", &self.location)?;
        require_non_empty("desired_job_title", &self.desired_job_title)?;
        require_non_empty("desired_industry", &self.desired_industry)?;
        validate_salary_range(
            "desired_salary_min",
            self.desired_salary_min,
            "desired_salary_max",
            self.desired_salary_max,
        )?;
        validate_skill_inputs(&self.skills)
    }
}

fn validate_skill_inputs(skills: &[UserSkillInput]) -> Result<(), AppError> {
    validate_skills("skills", skills.iter().map(|s| s.skill.as_str()))?;
    for skill in skills {
        validate_non_negative("experience", skill.experience)?;
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub location: Option<String>,
    pub desired_job_title: Option<String>,
    pub desired_industry: Option<String>,
    pub desired_salary_min: Option<i32>,
    pub desired_salary_max: Option<i32>,
    pub skills_summary: Option<String>,
    pub experience: Option<String>,
}

impl UpdateUserRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(email) = &self.email {
            validate_email("email", email)?;
        }
        let text_fields = [
            ("full_name", &self.full_name),
            ("location", &self.location),
            ("desired_job_title", &self.desired_job_title),
            ("desired_industry", &self.desired_industry),
        ];
        for (field, value) in text_fields {
            if let Some(value) = value {
                require_non_empty(field, value)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct AddSkillsRequest {
    pub skills: Vec<UserSkillInput>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
    pub skills: Vec<UserSkill>,
}

/// POST /api/v1/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate()?;
    let hashed_password = hash_password(&req.password).map_err(AppError::internal)?;

    let user = state
        .store
        .create_user(CreateUserParams {
            email: req.email,
            hashed_password,
            full_name: req.full_name,
            location: req.location,
            desired_job_title: req.desired_job_title,
            desired_industry: req.desired_industry,
            desired_salary_min: req.desired_salary_min,
            desired_salary_max: req.desired_salary_max,
            skills: req.skills_summary,
            experience: req.experience,
        })
        .await?;

    let skills = state
        .store
        .create_multiple_user_skills(user.id, &req.skills)
        .await
        .map_err(AppError::Database)?;

    info!("Created user {} with {} skills", user.id, skills.len());
    Ok((StatusCode::CREATED, Json(UserResponse { user, skills })))
}

/// POST /api/v1/users/login
pub async fn handle_login_user(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse<UserResponse>>, AppError> {
    validate_email("email", &req.email)?;
    validate_password("password", &req.password)?;

    let (user, skills) = state
        .store
        .get_user_details_by_email(&req.email)
        .await
        .map_err(not_found("user"))?;
    check_password(&req.password, &user.hashed_password).map_err(password_error)?;

    let (access_token, payload) = state
        .tokens
        .create_token(&user.email, Role::User, state.config.access_token_duration)
        .map_err(AppError::internal)?;

    Ok(Json(LoginResponse {
        access_token,
        access_token_expires_at: payload.expires_at(),
        account: UserResponse { user, skills },
    }))
}

/// GET /api/v1/users
pub async fn handle_get_user(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
) -> Result<Json<UserResponse>, AppError> {
    if payload.role != Role::User {
        return Err(AppError::Unauthorized(ONLY_USERS_ACCESS_ERROR.into()));
    }
    let (user, skills) = state
        .store
        .get_user_details_by_email(&payload.email)
        .await
        .map_err(|err| match err {
            DbError::NotFound => AppError::Unauthorized(ONLY_USERS_ACCESS_ERROR.into()),
            other => AppError::Database(other),
        })?;
    Ok(Json(UserResponse { user, skills }))
}

/// PATCH /api/v1/users
pub async fn handle_update_user(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    req.validate()?;
    let user = current_user(&state.store, &payload).await?;

    let desired_salary_min = req.desired_salary_min.unwrap_or(user.desired_salary_min);
    let desired_salary_max = req.desired_salary_max.unwrap_or(user.desired_salary_max);
    validate_salary_range(
        "desired_salary_min",
        desired_salary_min,
        "desired_salary_max",
        desired_salary_max,
    )?;

    let user = state
        .store
        .update_user(UpdateUserParams {
            id: user.id,
            email: req.email.unwrap_or(user.email),
            full_name: req.full_name.unwrap_or(user.full_name),
            location: req.location.unwrap_or(user.location),
            desired_job_title: req.desired_job_title.unwrap_or(user.desired_job_title),
            desired_industry: req.desired_industry.unwrap_or(user.desired_industry),
            desired_salary_min,
            desired_salary_max,
            skills: req.skills_summary.unwrap_or(user.skills),
            experience: req.experience.unwrap_or(user.experience),
        })
        .await?;

    Ok(Json(user))
}

/// PATCH /api/v1/users/password
pub async fn handle_update_user_password(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppJson(req): AppJson<UpdatePasswordRequest>,
) -> Result<StatusCode, AppError> {
    validate_password("old_password", &req.old_password)?;
    validate_password("new_password", &req.new_password)?;
    let user = current_user(&state.store, &payload).await?;

    check_password(&req.old_password, &user.hashed_password).map_err(password_error)?;
    let hashed_password = hash_password(&req.new_password).map_err(AppError::internal)?;
    state
        .store
        .update_user_password(user.id, &hashed_password)
        .await
        .map_err(AppError::Database)?;

    Ok(StatusCode::OK)
}

/// DELETE /api/v1/users
///
/// Skills and applications go with the user row.
pub async fn handle_delete_user(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state.store, &payload).await?;
    state
        .store
        .delete_user(user.id)
        .await
        .map_err(AppError::Database)?;

    info!("Deleted user {}", user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/skills
pub async fn handle_add_user_skills(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppJson(req): AppJson<AddSkillsRequest>,
) -> Result<(StatusCode, Json<Vec<UserSkill>>), AppError> {
    validate_skill_inputs(&req.skills)?;
    let user = current_user(&state.store, &payload).await?;
    let skills = state
        .store
        .create_multiple_user_skills(user.id, &req.skills)
        .await
        .map_err(AppError::Database)?;
    Ok((StatusCode::CREATED, Json(skills)))
}

/// DELETE /api/v1/users/skills/:id
pub async fn handle_delete_user_skill(
    State(state): State<AppState>,
    AuthPayload(payload): AuthPayload,
    AppPath(skill_id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state.store, &payload).await?;
    let skill = state
        .store
        .get_user_skill_by_id(skill_id)
        .await
        .map_err(not_found("skill"))?;
    if skill.user_id != user.id {
        return Err(AppError::Forbidden("skill belongs to another user".into()));
    }
    state
        .store
        .delete_user_skill(skill.id)
        .await
        .map_err(AppError::Database)?;
    Ok(StatusCode::NO_CONTENT)
}
