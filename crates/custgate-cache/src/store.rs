//! Persistent query cache backed by SQLite.

use std::str::FromStr;

use async_trait::async_trait;
use custgate_remote::ResultSet;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::CacheError;
use crate::key::CanonicalKey;

/// Point lookup and append for cached result sets.
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Returns the earliest result set stored under `key`.
    ///
    /// `Ok(None)` means no row exists; `Err` is any other store fault.
    async fn lookup(&self, key: &CanonicalKey) -> Result<Option<ResultSet>, CacheError>;

    /// Appends a row. Existing rows under the same key are kept.
    async fn store(&self, key: &CanonicalKey, results: &ResultSet) -> Result<(), CacheError>;

    /// Drops all cached data and releases the backing store.
    async fn teardown(&self) -> Result<(), CacheError>;
}

/// Connection settings for [`SqliteQueryCache`].
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// SQLite URL, e.g. `sqlite://customers.db` or `sqlite::memory:`.
    pub url: String,
    /// Connection pool size. In-memory databases always use one connection.
    pub max_connections: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://customers.db".to_string(),
            max_connections: 5,
        }
    }
}

impl CacheSettings {
    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// [`QueryCache`] over a single SQLite table.
///
/// No uniqueness constraint exists on `search_parameters`; concurrent misses
/// for the same filters each append their own row.
#[derive(Clone)]
pub struct SqliteQueryCache {
    pool: SqlitePool,
}

impl SqliteQueryCache {
    /// Open the pool and create the cache table if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the database cannot be opened,
    /// or the table cannot be created.
    pub async fn connect(settings: &CacheSettings) -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str(&settings.url)?.create_if_missing(true);

        // Every connection to `:memory:` is its own database, so pin one.
        let pool_options = if settings.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(settings.max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        let cache = Self { pool };
        cache.ensure_schema().await?;

        debug!(url = %settings.url, "Query cache ready");
        Ok(cache)
    }

    /// Private in-memory cache, mostly useful in tests.
    pub async fn in_memory() -> Result<Self, CacheError> {
        Self::connect(&CacheSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
    }

    async fn ensure_schema(&self) -> Result<(), CacheError> {
        query(
            r#"
            CREATE TABLE IF NOT EXISTS customer_search_cache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                search_parameters TEXT NOT NULL,
                search_results TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of rows stored under `key`.
    pub async fn entry_count(&self, key: &CanonicalKey) -> Result<i64, CacheError> {
        let (count,): (i64,) = query_as(
            "SELECT COUNT(*) FROM customer_search_cache WHERE search_parameters = ?1",
        )
        .bind(key.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl QueryCache for SqliteQueryCache {
    async fn lookup(&self, key: &CanonicalKey) -> Result<Option<ResultSet>, CacheError> {
        let row: Option<(String,)> = query_as(
            r#"
            SELECT search_results
            FROM customer_search_cache
            WHERE search_parameters = ?1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &CanonicalKey, results: &ResultSet) -> Result<(), CacheError> {
        let json = serde_json::to_string(results)?;
        query(
            "INSERT INTO customer_search_cache (search_parameters, search_results) VALUES (?1, ?2)",
        )
        .bind(key.as_str())
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn teardown(&self) -> Result<(), CacheError> {
        let dropped = query("DROP TABLE IF EXISTS customer_search_cache")
            .execute(&self.pool)
            .await;
        self.pool.close().await;
        dropped?;
        debug!("Query cache table dropped");
        Ok(())
    }
}
