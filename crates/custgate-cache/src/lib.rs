//! Canonical filter keys and the persistent query cache.
//!
//! Read requests are cached under a [`CanonicalKey`] derived from their
//! [`FilterSet`]. The store is append-only: repeated misses for the same
//! filters add rows instead of replacing them, and lookups return the
//! earliest row for a key.
//!
//! ```text
//! FilterSet ──encode──▶ CanonicalKey ──lookup──▶ Option<ResultSet>
//!                              └──────store───▶ new row
//! ```

pub mod error;
pub mod key;
pub mod store;

pub use error::{CacheError, DatabaseError};
pub use key::{CanonicalKey, FilterSet, encode};
pub use store::{CacheSettings, QueryCache, SqliteQueryCache};
