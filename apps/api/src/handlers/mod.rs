pub mod employers;
pub mod extract;
pub mod job_applications;
pub mod jobs;
pub mod users;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::Pagination;
use crate::db::DbError;
use crate::errors::AppError;

pub const ONLY_EMPLOYERS_ACCESS_ERROR: &str = "only employers can access this resource";

/// `?limit=&offset=` on list endpoints. Negative or non-numeric values are rejected
/// by the query extractor.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        pagination(self.limit, self.offset)
    }
}

pub fn pagination(limit: Option<u32>, offset: Option<u32>) -> Pagination {
    Pagination::new(
        limit.map(i64::from).unwrap_or(Pagination::DEFAULT_LIMIT),
        offset.map(i64::from).unwrap_or(0),
    )
}

/// Maps a missing row to a 404 naming `what`; any other failure is a 500.
pub fn not_found(what: &'static str) -> impl FnOnce(DbError) -> AppError {
    move |err| match err {
        DbError::NotFound => AppError::NotFound(format!("{what} not found")),
        other => AppError::Database(other),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse<T> {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub account: T,
}
