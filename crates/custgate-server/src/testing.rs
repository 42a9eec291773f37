//! Substitute remote and cache implementations for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use custgate_cache::{CacheError, CanonicalKey, DatabaseError, QueryCache};
use custgate_remote::erply::check_filters;
use custgate_remote::{
    Credentials, Filters, Record, RemoteConnector, RemoteError, RemoteSession, ResultSet,
    WriteReport,
};
use parking_lot::Mutex;

pub fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// Remote session that counts calls and answers from canned data.
#[derive(Default)]
pub struct MockSession {
    pub invalid: AtomicBool,
    pub fail_queries: AtomicBool,
    pub probe_delay: Mutex<Option<Duration>>,
    pub results: Mutex<ResultSet>,
    pub probes: AtomicUsize,
    pub queries: AtomicUsize,
    pub writes: AtomicUsize,
}

impl MockSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_results(results: ResultSet) -> Arc<Self> {
        let session = Self::default();
        *session.results.lock() = results;
        Arc::new(session)
    }

    pub fn invalidate(&self) {
        self.invalid.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteSession for MockSession {
    async fn is_valid(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let delay = *self.probe_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        !self.invalid.load(Ordering::SeqCst)
    }

    async fn query(&self, filters: &Filters) -> Result<ResultSet, RemoteError> {
        check_filters(filters)?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(RemoteError::rejected("getCustomers", 1002, "sessionKey"));
        }
        Ok(self.results.lock().clone())
    }

    async fn write(&self, filters: &Filters) -> Result<WriteReport, RemoteError> {
        check_filters(filters)?;
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(WriteReport {
            customer_id: n as i64,
            already_exists: filters.is_empty(),
        })
    }
}

/// Connector handing out a fixed session unless told to reject.
pub struct MockConnector {
    pub session: Arc<MockSession>,
    pub reject: AtomicBool,
    pub unreachable: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockConnector {
    pub fn new(session: Arc<MockSession>) -> Arc<Self> {
        Arc::new(Self {
            session,
            reject: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl RemoteConnector for MockConnector {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn RemoteSession>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        credentials.validate()?;
        if self.reject.load(Ordering::SeqCst) {
            return Err(RemoteError::rejected("verifyUser", 1051, ""));
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::decode("verifyUser: connection reset"));
        }
        Ok(self.session.clone())
    }
}

/// Cache whose every operation fails, counting attempts.
#[derive(Default)]
pub struct BrokenCache {
    pub lookups: AtomicUsize,
    pub stores: AtomicUsize,
}

fn broken() -> CacheError {
    CacheError::Database(DatabaseError::PoolClosed)
}

#[async_trait]
impl QueryCache for BrokenCache {
    async fn lookup(&self, _key: &CanonicalKey) -> Result<Option<ResultSet>, CacheError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Err(broken())
    }

    async fn store(&self, _key: &CanonicalKey, _results: &ResultSet) -> Result<(), CacheError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        Err(broken())
    }

    async fn teardown(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
