//! Bearer authentication and caller resolution.
//!
//! The token only proves an email (and the role it was issued for). Handlers resolve
//! that email to an employer or a user row themselves.

pub mod password;
pub mod token;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use crate::db::models::{Company, Employer, User};
use crate::db::{DbError, DbResult, Store};
use crate::errors::AppError;
use crate::state::AppState;

use token::{Payload, Role, TokenError};

pub const ONLY_USERS_ACCESS_ERROR: &str = "only users can access this resource";

const BEARER_PREFIX: &str = "bearer ";

/// Verified claims of the request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthPayload(pub Payload);

#[async_trait]
impl FromRequestParts<AppState> for AuthPayload {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("authorization header is missing".into()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("authorization header is malformed".into()))?;

        let token = bearer_token(header).ok_or_else(|| {
            AppError::Unauthorized("authorization header must use the Bearer scheme".into())
        })?;

        let payload = state.tokens.verify_token(token).map_err(|err| {
            debug!("Rejected bearer token: {err}");
            match err {
                TokenError::Expired => AppError::Unauthorized("token has expired".into()),
                _ => AppError::Unauthorized("token is invalid".into()),
            }
        })?;

        Ok(AuthPayload(payload))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let scheme = header.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = header[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves the caller of an employer endpoint. Errors are returned untranslated so
/// each handler can apply its own status mapping.
pub async fn current_employer(store: &Store, payload: &Payload) -> DbResult<(Employer, Company)> {
    let employer = store.get_employer_by_email(&payload.email).await?;
    let company = store.get_company_by_id(employer.company_id).await?;
    Ok((employer, company))
}

/// Resolves the caller of a user-only endpoint. A token issued to an employer, or an
/// email with no user row, is a role mismatch (401).
pub async fn current_user(store: &Store, payload: &Payload) -> Result<User, AppError> {
    if payload.role == Role::Employer {
        return Err(AppError::Unauthorized(ONLY_USERS_ACCESS_ERROR.into()));
    }
    match store.get_user_by_email(&payload.email).await {
        Ok(user) => Ok(user),
        Err(DbError::NotFound) => Err(AppError::Unauthorized(ONLY_USERS_ACCESS_ERROR.into())),
        Err(err) => Err(AppError::internal(err)),
    }
}
