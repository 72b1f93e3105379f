//! Search index over jobs.
//!
//! The index holds one [`IndexedJob`] per job, a projection of the job joined with its
//! company name and skills. It is a cache: the row store stays the source of truth,
//! `load_all` rebuilds the projection at startup and handlers refresh single documents
//! after each committed job mutation.

pub mod elastic;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use tracing::info;

use crate::db::models::{Pagination, SalaryRange};
use crate::db::{DbError, Queries};

pub use elastic::ElasticJobIndex;
pub use memory::MemoryJobIndex;

/// Documents written per bulk request during [`load_all`].
pub const BULK_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IndexedJob {
    pub id: i32,
    pub title: String,
    pub industry: String,
    pub company_name: String,
    pub description: String,
    pub location: String,
    pub salary_min: i32,
    pub salary_max: i32,
    pub requirements: String,
    pub job_skills: Vec<String>,
}

/// The single facet a search is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFilter {
    All,
    /// Case-insensitive substring of the title.
    Title(String),
    Industry(String),
    /// Case-insensitive substring of the company name.
    CompanyName(String),
    CompanyExactName(String),
    Location(String),
    SalaryRange(SalaryRange),
}

impl JobFilter {
    pub fn matches(&self, job: &IndexedJob) -> bool {
        match self {
            JobFilter::All => true,
            JobFilter::Title(title) => contains_ignore_case(&job.title, title),
            JobFilter::Industry(industry) => job.industry == *industry,
            JobFilter::CompanyName(name) => contains_ignore_case(&job.company_name, name),
            JobFilter::CompanyExactName(name) => job.company_name == *name,
            JobFilter::Location(location) => job.location == *location,
            JobFilter::SalaryRange(range) => range.contains(job.salary_min, job.salary_max),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i32,
    pub job: IndexedJob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Matches across all pages.
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("bulk write rejected: {0}")]
    Bulk(String),

    #[error("malformed index response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("reading job projection: {0}")]
    Projection(#[from] DbError),
}

/// A document store keyed by job id with filter-and-paginate search.
///
/// Carried in `AppState` as `Arc<dyn JobIndex>`.
#[async_trait]
pub trait JobIndex: Send + Sync {
    async fn upsert(&self, job: &IndexedJob) -> Result<(), IndexError>;

    async fn bulk_upsert(&self, jobs: &[IndexedJob]) -> Result<(), IndexError>;

    /// Deleting an id that is not indexed succeeds.
    async fn delete(&self, id: i32) -> Result<(), IndexError>;

    async fn get(&self, id: i32) -> Result<Option<IndexedJob>, IndexError>;

    /// Hits are ordered by job id; `page.offset` maps to `from`, `page.limit` to `size`.
    /// A page past the end, or past the backend's result window, has no hits but still
    /// carries the total.
    async fn search(&self, filter: &JobFilter, page: Pagination)
        -> Result<SearchPage, IndexError>;
}

/// Re-indexes every job in the row store. Documents whose job no longer exists are
/// left in place.
pub async fn load_all(queries: &dyn Queries, index: &dyn JobIndex) -> Result<usize, IndexError> {
    let jobs = queries.list_indexed_jobs().await?;
    for chunk in jobs.chunks(BULK_CHUNK_SIZE) {
        index.bulk_upsert(chunk).await?;
    }
    info!("Indexed {} jobs", jobs.len());
    Ok(jobs.len())
}

/// Re-reads one job's projection from the row store and writes it to the index.
pub async fn refresh_job(
    queries: &dyn Queries,
    index: &dyn JobIndex,
    job_id: i32,
) -> Result<IndexedJob, IndexError> {
    let doc = queries.get_indexed_job(job_id).await?;
    index.upsert(&doc).await?;
    Ok(doc)
}
