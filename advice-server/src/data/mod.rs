use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::domain::error::DomainError;

pub mod advice_repository;
pub mod seed;
pub mod snapshot_store;
pub mod user_repository;

/// Runs one storage call under `limit`; expiry surfaces as `BackendUnavailable`.
pub async fn bounded<T, F>(limit: Duration, op: &'static str, fut: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(op, timeout_ms = limit.as_millis() as u64, "storage call timed out");
            Err(DomainError::BackendUnavailable(format!(
                "{op} timed out after {}ms",
                limit.as_millis()
            )))
        }
    }
}

pub(crate) fn map_db_error(op: &str, e: sqlx::Error) -> DomainError {
    error!(op, error = %e, "database error");
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("42P01") => {
            DomainError::SchemaMissing(format!("{op}: {}", db.message()))
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => DomainError::BackendUnavailable(format!("{op}: {e}")),
        _ => DomainError::Internal(format!("{op}: {e}")),
    }
}
