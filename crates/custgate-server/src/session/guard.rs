//! Per-request session revalidation.
//!
//! Every protected request resolves its session cookie against the
//! [`SessionRegistry`] and asks the remote service whether the session is
//! still live. Both steps run under one deadline. The `/auth` route is never
//! guarded because its handler does not take a [`ValidSession`].

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use custgate_remote::RemoteSession;
use tracing::debug;

use super::cookie::SessionCookie;
use super::registry::{SessionId, SessionRegistry};
use crate::error::{GatewayError, SessionRejection};
use crate::gateway::Gateway;

pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    timeout: Duration,
}

impl SessionGuard {
    pub fn new(registry: Arc<SessionRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Resolve `cookie_value` to a live remote session.
    ///
    /// Nothing is cached between calls: an invalidated session keeps failing
    /// until the caller authenticates again.
    pub async fn validate(
        &self,
        cookie_value: Option<&str>,
    ) -> Result<Arc<dyn RemoteSession>, GatewayError> {
        let rejection = match tokio::time::timeout(self.timeout, self.resolve(cookie_value)).await
        {
            Ok(Ok(session)) => return Ok(session),
            Ok(Err(rejection)) => rejection,
            Err(_) => SessionRejection::TimedOut,
        };
        debug!(reason = rejection.as_str(), "Session rejected");
        Err(GatewayError::Unauthorized(rejection))
    }

    async fn resolve(
        &self,
        cookie_value: Option<&str>,
    ) -> Result<Arc<dyn RemoteSession>, SessionRejection> {
        let id = cookie_value
            .and_then(SessionId::parse)
            .ok_or(SessionRejection::NoSession)?;
        let session = self
            .registry
            .get(&id)
            .ok_or(SessionRejection::UnknownSession)?;
        if session.is_valid().await {
            Ok(session)
        } else {
            Err(SessionRejection::Invalidated)
        }
    }
}

/// Extractor yielding the caller's revalidated remote session.
///
/// # Example
///
/// ```ignore
/// async fn handler(ValidSession(session): ValidSession) -> impl IntoResponse {
///     session.query(&filters).await
/// }
/// ```
pub struct ValidSession(pub Arc<dyn RemoteSession>);

impl<S> FromRequestParts<S> for ValidSession
where
    S: Send + Sync,
    Arc<Gateway>: FromRef<S>,
    SessionCookie: FromRef<S>,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gateway = Arc::<Gateway>::from_ref(state);
        let cookie = SessionCookie::from_ref(state);
        let value = cookie.read(&parts.headers);
        gateway.guard().validate(value.as_deref()).await.map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSession;
    use std::sync::atomic::Ordering;

    fn guard_with(session: Arc<MockSession>) -> (SessionGuard, Arc<SessionRegistry>) {
        let registry = Arc::new(SessionRegistry::new());
        registry.put(SessionId::parse("000111").unwrap(), session);
        (
            SessionGuard::new(registry.clone(), Duration::from_millis(200)),
            registry,
        )
    }

    fn rejection(err: GatewayError) -> SessionRejection {
        match err {
            GatewayError::Unauthorized(r) => r,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_and_unknown_cookies() {
        let (guard, _) = guard_with(MockSession::new());

        let err = guard.validate(None).await.err().unwrap();
        assert_eq!(rejection(err), SessionRejection::NoSession);

        let err = guard.validate(Some("")).await.err().unwrap();
        assert_eq!(rejection(err), SessionRejection::NoSession);

        let err = guard.validate(Some("999")).await.err().unwrap();
        assert_eq!(rejection(err), SessionRejection::UnknownSession);
    }

    #[tokio::test]
    async fn test_live_session_is_returned() {
        let session = MockSession::new();
        let (guard, _) = guard_with(session.clone());

        let resolved = guard.validate(Some("000111")).await;
        tokio_test::assert_ok!(&resolved);
        assert_eq!(session.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidated_session_fails_until_reauth() {
        let session = MockSession::new();
        let (guard, registry) = guard_with(session.clone());
        session.invalidate();

        for _ in 0..3 {
            let err = guard.validate(Some("000111")).await.err().unwrap();
            assert_eq!(rejection(err), SessionRejection::Invalidated);
        }
        assert_eq!(session.probes.load(Ordering::SeqCst), 3);

        registry.put(SessionId::parse("000111").unwrap(), MockSession::new());
        tokio_test::assert_ok!(guard.validate(Some("000111")).await);
    }

    #[tokio::test]
    async fn test_slow_probe_times_out() {
        let session = MockSession::new();
        *session.probe_delay.lock() = Some(Duration::from_secs(5));
        let (guard, _) = guard_with(session);

        let err = guard.validate(Some("000111")).await.err().unwrap();
        assert_eq!(rejection(err), SessionRejection::TimedOut);
    }
}
