pub mod models;
pub mod postgres;
pub mod queries;
pub mod store;

#[cfg(test)]
pub mod memory;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

pub use postgres::PgQueries;
pub use queries::Queries;
pub use store::Store;

/// Errors surfaced by the row store.
///
/// Only `NotFound` and `UniqueViolation` carry meaning for callers; every other
/// failure is opaque.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DbError::UniqueViolation(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                DbError::Constraint(db.message().to_string())
            }
            other => DbError::Database(other),
        }
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the bundled schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Builds an `ILIKE` pattern matching `needle` anywhere, with LIKE wildcards in the
/// input matched literally.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
