//! Session lifecycle: authentication, registration and revalidation.

pub mod cookie;
pub mod gate;
pub mod guard;
pub mod registry;

pub use cookie::SessionCookie;
pub use gate::Authenticator;
pub use guard::{SessionGuard, ValidSession};
pub use registry::{SessionId, SessionRegistry};
