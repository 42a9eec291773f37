//! Cache error types.

pub use sqlx_core::Error as DatabaseError;

/// Errors raised by the query cache.
///
/// The gateway treats every cache error as best-effort: lookup failures
/// degrade to a miss and store failures are only logged.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Encoding a key or (de)serializing a result set failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
