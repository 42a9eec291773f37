//! Cache-aside reads and pass-through writes against the remote service.

use std::sync::Arc;

use custgate_cache::{FilterSet, QueryCache, encode};
use custgate_remote::{RemoteSession, ResultSet, WriteReport};
use tracing::{debug, instrument, warn};

use crate::error::GatewayError;
use crate::metrics;

pub struct QueryEngine {
    cache: Arc<dyn QueryCache>,
}

impl QueryEngine {
    pub fn new(cache: Arc<dyn QueryCache>) -> Self {
        Self { cache }
    }

    /// Answer `filters` from the cache, falling back to `session`.
    ///
    /// A cache that cannot be read is treated as a miss and a result that
    /// cannot be stored is still returned. Only remote failures and reserved
    /// filter names reach the caller.
    #[instrument(skip_all, fields(filters = filters.len()))]
    pub async fn read(
        &self,
        session: &dyn RemoteSession,
        filters: &FilterSet,
    ) -> Result<ResultSet, GatewayError> {
        let key = match encode(filters) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "Could not encode filters, bypassing cache");
                None
            }
        };

        if let Some(key) = &key {
            match self.cache.lookup(key).await {
                Ok(Some(results)) => {
                    debug!(key = %key, records = results.len(), "Cache hit");
                    metrics::record_cache_hit();
                    return Ok(results);
                }
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "Cache lookup failed"),
            }
        }
        metrics::record_cache_miss();

        let results = match session.query(filters.as_filters()).await {
            Ok(results) => {
                metrics::record_remote_call("query", "ok");
                results
            }
            Err(e) => {
                metrics::record_remote_call("query", "error");
                return Err(GatewayError::from_remote(e));
            }
        };

        if let Some(key) = &key
            && let Err(e) = self.cache.store(key, &results).await
        {
            warn!(key = %key, error = %e, "Failed to cache query results");
            metrics::record_cache_write_failure();
        }

        Ok(results)
    }

    /// Forward a write to `session`. The cache is neither read nor updated.
    #[instrument(skip_all, fields(fields = fields.len()))]
    pub async fn write(
        &self,
        session: &dyn RemoteSession,
        fields: &FilterSet,
    ) -> Result<WriteReport, GatewayError> {
        match session.write(fields.as_filters()).await {
            Ok(report) => {
                metrics::record_remote_call("write", "ok");
                Ok(report)
            }
            Err(e) => {
                metrics::record_remote_call("write", "error");
                Err(GatewayError::from_remote(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BrokenCache, MockSession, record};
    use custgate_cache::SqliteQueryCache;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    async fn sqlite_engine() -> (QueryEngine, Arc<SqliteQueryCache>) {
        let cache = Arc::new(SqliteQueryCache::in_memory().await.unwrap());
        (QueryEngine::new(cache.clone()), cache)
    }

    fn filters(pairs: &[(&str, &str)]) -> FilterSet {
        pairs.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let session = MockSession::with_results(vec![
            record(json!({"customerID": 1, "fullName": "Ann"})),
            record(json!({"customerID": 2, "fullName": "Bob"})),
        ]);
        let (engine, cache) = sqlite_engine().await;
        let f = filters(&[("searchName", "Ann")]);

        let first = engine.read(session.as_ref(), &f).await.unwrap();
        let second = engine.read(session.as_ref(), &f).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second[0]["customerID"], json!(1));
        assert_eq!(second[1]["customerID"], json!(2));
        assert_eq!(session.queries.load(Ordering::SeqCst), 1);
        assert_eq!(cache.entry_count(&encode(&f).unwrap()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_filter_order_does_not_split_cache() {
        let session = MockSession::with_results(vec![record(json!({"customerID": 7}))]);
        let (engine, _cache) = sqlite_engine().await;

        engine
            .read(session.as_ref(), &filters(&[("a", "1"), ("b", "2")]))
            .await
            .unwrap();
        engine
            .read(session.as_ref(), &filters(&[("b", "2"), ("a", "1")]))
            .await
            .unwrap();

        assert_eq!(session.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_broken_cache_degrades_to_remote() {
        let session = MockSession::with_results(vec![record(json!({"customerID": 3}))]);
        let cache = Arc::new(BrokenCache::default());
        let engine = QueryEngine::new(cache.clone());
        let f = filters(&[("searchName", "Cy")]);

        for _ in 0..2 {
            let results = engine.read(session.as_ref(), &f).await.unwrap();
            assert_eq!(results.len(), 1);
        }

        assert_eq!(session.queries.load(Ordering::SeqCst), 2);
        assert_eq!(cache.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stores.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remote_failure_is_upstream_and_not_cached() {
        let session = MockSession::new();
        session.fail_queries.store(true, Ordering::SeqCst);
        let (engine, cache) = sqlite_engine().await;
        let f = filters(&[("searchName", "Dee")]);

        let err = engine.read(session.as_ref(), &f).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
        assert_eq!(cache.entry_count(&encode(&f).unwrap()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reserved_filter_is_invalid_and_not_cached() {
        let session = MockSession::new();
        let (engine, cache) = sqlite_engine().await;
        let f = filters(&[("request", "saveCustomer"), ("firstName", "X")]);

        let err = engine.read(session.as_ref(), &f).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidFilter(ref name) if name == "request"));
        assert_eq!(cache.entry_count(&encode(&f).unwrap()).await.unwrap(), 0);

        let err = engine.write(session.as_ref(), &f).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidFilter(_)));
        assert_eq!(session.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_result_is_cached() {
        let session = MockSession::new();
        let (engine, _cache) = sqlite_engine().await;
        let f = filters(&[("searchName", "nobody")]);

        assert!(engine.read(session.as_ref(), &f).await.unwrap().is_empty());
        assert!(engine.read(session.as_ref(), &f).await.unwrap().is_empty());
        assert_eq!(session.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_writes_bypass_cache() {
        let session = MockSession::new();
        let cache = Arc::new(BrokenCache::default());
        let engine = QueryEngine::new(cache.clone());
        let f = filters(&[("firstName", "Eve")]);

        let first = engine.write(session.as_ref(), &f).await.unwrap();
        let second = engine.write(session.as_ref(), &f).await.unwrap();

        assert_eq!(first.customer_id, 1);
        assert_eq!(second.customer_id, 2);
        assert_eq!(session.writes.load(Ordering::SeqCst), 2);
        assert_eq!(cache.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(cache.stores.load(Ordering::SeqCst), 0);
    }
}
