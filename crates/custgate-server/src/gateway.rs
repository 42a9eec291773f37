use std::sync::Arc;
use std::time::Duration;

use custgate_cache::QueryCache;
use custgate_remote::RemoteConnector;

use crate::engine::QueryEngine;
use crate::session::{Authenticator, SessionGuard, SessionRegistry};

/// Shared gateway components, one instance per process.
pub struct Gateway {
    registry: Arc<SessionRegistry>,
    authenticator: Authenticator,
    guard: SessionGuard,
    engine: QueryEngine,
    cache: Arc<dyn QueryCache>,
}

impl Gateway {
    pub fn new(
        connector: Arc<dyn RemoteConnector>,
        cache: Arc<dyn QueryCache>,
        validation_timeout: Duration,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        Self {
            authenticator: Authenticator::new(connector, registry.clone()),
            guard: SessionGuard::new(registry.clone(), validation_timeout),
            engine: QueryEngine::new(cache.clone()),
            registry,
            cache,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Discard the query cache and release every session.
    ///
    /// A cache that fails to tear down is logged; sessions are released
    /// regardless.
    pub async fn teardown(&self) {
        if let Err(e) = self.cache.teardown().await {
            tracing::error!(error = %e, "Failed to tear down query cache");
        }
        let released = self.registry.clear();
        tracing::info!(sessions = released, "Gateway torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnector, MockSession};
    use custgate_cache::{FilterSet, SqliteQueryCache};
    use custgate_remote::Credentials;

    #[tokio::test]
    async fn test_teardown_releases_sessions_and_cache() {
        let session = MockSession::new();
        let cache = Arc::new(SqliteQueryCache::in_memory().await.unwrap());
        let gateway = Gateway::new(
            MockConnector::new(session.clone()),
            cache.clone(),
            Duration::from_secs(1),
        );

        let id = gateway
            .authenticator()
            .authenticate(&Credentials::new("alice", "secret", "000111"))
            .await
            .unwrap();
        let live = gateway.guard().validate(Some(id.as_str())).await.ok().unwrap();
        gateway
            .engine()
            .read(live.as_ref(), &FilterSet::new())
            .await
            .unwrap();
        drop(live);

        gateway.teardown().await;

        assert!(gateway.registry().is_empty());
        assert_eq!(Arc::strong_count(&session), 2);
        assert!(cache.lookup(&custgate_cache::encode(&FilterSet::new()).unwrap()).await.is_err());
    }
}
