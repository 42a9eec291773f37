pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{AppConfig, CacheConfig, LoggingConfig, RemoteConfig, ServerConfig, SessionConfig};
pub use engine::QueryEngine;
pub use error::{GatewayError, SessionRejection};
pub use gateway::Gateway;
pub use observability::init_tracing;
pub use server::{AppState, CustgateServer, ServerBuilder, build_app};
pub use session::{SessionCookie, SessionId, SessionRegistry, ValidSession};
