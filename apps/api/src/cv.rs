//! CV intake for job applications.
//!
//! The multipart form carries a required `cv` file part, an optional `message` and a
//! positive `job_id`. The CV is buffered in memory and stored as a single blob.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;

pub const CV_FIELD: &str = "cv";
pub const MESSAGE_FIELD: &str = "message";
pub const JOB_ID_FIELD: &str = "job_id";

pub const ACCEPTED_CV_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/rtf",
    "text/rtf",
    "text/plain",
];

#[derive(Debug, Error)]
pub enum CvError {
    #[error("cv file is required")]
    MissingCv,

    #[error("cv file is empty")]
    EmptyCv,

    #[error("cv file exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("cv file type '{0}' is not accepted")]
    UnsupportedType(String),

    #[error("job_id is required")]
    MissingJobId,

    #[error("job_id must be a positive integer")]
    InvalidJobId,

    #[error("malformed multipart body: {0}")]
    Multipart(String),
}

impl From<MultipartError> for CvError {
    fn from(err: MultipartError) -> Self {
        CvError::Multipart(err.body_text())
    }
}

impl From<CvError> for AppError {
    fn from(err: CvError) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[derive(Debug)]
pub struct ApplicationForm {
    pub job_id: i32,
    pub message: Option<String>,
    pub cv: Vec<u8>,
}

/// Reads the application form, enforcing the CV size limit while streaming.
pub async fn read_application_form(
    mut multipart: Multipart,
    max_cv_bytes: usize,
) -> Result<ApplicationForm, CvError> {
    let mut cv = None;
    let mut message = None;
    let mut job_id = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(CV_FIELD) => cv = Some(read_cv(field, max_cv_bytes).await?),
            Some(MESSAGE_FIELD) => {
                let text = field.text().await?;
                message = Some(text).filter(|m| !m.trim().is_empty());
            }
            Some(JOB_ID_FIELD) => job_id = Some(parse_job_id(&field.text().await?)?),
            other => debug!("Ignoring unexpected form field {other:?}"),
        }
    }

    let cv = cv.ok_or(CvError::MissingCv)?;
    let job_id = job_id.ok_or(CvError::MissingJobId)?;
    Ok(ApplicationForm {
        job_id,
        message,
        cv,
    })
}

async fn read_cv(mut field: Field<'_>, max_cv_bytes: usize) -> Result<Vec<u8>, CvError> {
    let content_type = resolve_content_type(field.content_type(), field.file_name());
    match content_type {
        Some(ct) if ACCEPTED_CV_TYPES.contains(&ct.as_str()) => {}
        Some(ct) => return Err(CvError::UnsupportedType(ct)),
        None => return Err(CvError::UnsupportedType("unknown".to_string())),
    }

    let mut buffer = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if buffer.len() + chunk.len() > max_cv_bytes {
            return Err(CvError::TooLarge {
                limit: max_cv_bytes,
            });
        }
        buffer.extend_from_slice(&chunk);
    }

    if buffer.is_empty() {
        return Err(CvError::EmptyCv);
    }
    Ok(buffer)
}

/// The declared content type without parameters, or a guess from the file name when
/// the client sent none or a generic one.
fn resolve_content_type(declared: Option<&str>, file_name: Option<&str>) -> Option<String> {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    declared.or_else(|| {
        file_name
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .map(str::to_string)
    })
}

fn parse_job_id(raw: &str) -> Result<i32, CvError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CvError::InvalidJobId),
    }
}
