//! Credential exchange and session registration.

use std::sync::Arc;

use custgate_remote::{Credentials, RemoteConnector};
use tracing::{info, instrument, warn};

use super::registry::{SessionId, SessionRegistry};
use crate::error::GatewayError;
use crate::metrics;

/// Exchanges credentials for a remote session and registers it.
///
/// The credential `code` doubles as the [`SessionId`], so a second login with
/// the same code replaces the first session.
pub struct Authenticator {
    connector: Arc<dyn RemoteConnector>,
    registry: Arc<SessionRegistry>,
}

impl Authenticator {
    pub fn new(connector: Arc<dyn RemoteConnector>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            connector,
            registry,
        }
    }

    /// # Errors
    ///
    /// - `InvalidCredentials` if any field is empty
    /// - `AuthenticationFailed` if the remote service refuses the exchange
    /// - `Upstream` if the remote service could not be reached or answered
    ///   with something unreadable
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<SessionId, GatewayError> {
        let id = match (credentials.validate(), SessionId::parse(&credentials.code)) {
            (Ok(()), Some(id)) => id,
            _ => {
                metrics::record_auth("invalid");
                return Err(GatewayError::InvalidCredentials);
            }
        };

        let session = match self.connector.authenticate(credentials).await {
            Ok(session) => {
                metrics::record_remote_call("authenticate", "ok");
                session
            }
            Err(e) if e.is_rejection() => {
                warn!(session = %id, error = %e, "Remote authentication rejected");
                metrics::record_remote_call("authenticate", "ok");
                metrics::record_auth("failed");
                return Err(GatewayError::AuthenticationFailed);
            }
            Err(e) => {
                warn!(session = %id, error = %e, "Remote authentication unavailable");
                metrics::record_remote_call("authenticate", "error");
                metrics::record_auth("error");
                return Err(GatewayError::Upstream(e));
            }
        };

        let replaced = self.registry.put(id.clone(), session);
        metrics::record_auth("ok");
        info!(session = %id, replaced, "Authentication successful");
        Ok(id)
    }
}
