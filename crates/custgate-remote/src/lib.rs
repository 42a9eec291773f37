//! Remote customer-management capability for custgate.
//!
//! The gateway treats the upstream API as an opaque capability:
//!
//! - [`RemoteConnector::authenticate`] exchanges [`Credentials`] for a live
//!   [`RemoteSession`]
//! - [`RemoteSession::is_valid`] probes liveness
//! - [`RemoteSession::query`] and [`RemoteSession::write`] read and save
//!   customer records
//!
//! [`erply`] provides the concrete HTTP implementation used in production.
//!
//! # Example
//!
//! ```ignore
//! use custgate_remote::{Credentials, RemoteConnector};
//! use custgate_remote::erply::{ErplyConnector, ErplySettings};
//!
//! let connector = ErplyConnector::new(ErplySettings::default())?;
//! let session = connector
//!     .authenticate(&Credentials::new("alice", "secret", "000111"))
//!     .await?;
//! let customers = session.query(&filters).await?;
//! ```

pub mod erply;
pub mod error;
pub mod traits;
pub mod types;

pub use error::RemoteError;
pub use traits::{RemoteConnector, RemoteSession};
pub use types::{Credentials, Filters, Record, ResultSet, WriteReport};
