//! Capability traits for the remote customer-management API.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{Credentials, Filters, ResultSet, WriteReport};

/// Exchanges credentials for a live remote session.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Authenticate against the remote API.
    ///
    /// Returns `RemoteError::Rejected` when the API refuses the credentials.
    async fn authenticate(&self, credentials: &Credentials)
    -> Result<Arc<dyn RemoteSession>, RemoteError>;
}

/// A live, authenticated handle to the remote API.
///
/// Any mutable state (session keys, expiry) lives behind `&self` so the handle
/// can be shared between concurrent requests.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Probe whether the remote still honours this session.
    async fn is_valid(&self) -> bool;

    /// Fetch customer records matching `filters`.
    async fn query(&self, filters: &Filters) -> Result<ResultSet, RemoteError>;

    /// Save a customer described by `filters`.
    async fn write(&self, filters: &Filters) -> Result<WriteReport, RemoteError>;
}
