//! Values exchanged with the remote API.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Query or write parameters as they cross the remote seam.
pub type Filters = HashMap<String, String>;

/// A single customer record, kept as the JSON object the API returned.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Ordered list of records answering one query.
pub type ResultSet = Vec<Record>;

/// User-supplied credentials for the remote API.
///
/// `code` is the account code the API asks for alongside username and
/// password. The gateway also uses it as the session identifier.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub code: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            code: code.into(),
        }
    }

    /// Fails with the name of the first empty field.
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.username.is_empty() {
            return Err(RemoteError::MissingField("username"));
        }
        if self.password.is_empty() {
            return Err(RemoteError::MissingField("password"));
        }
        if self.code.is_empty() {
            return Err(RemoteError::MissingField("code"));
        }
        Ok(())
    }
}

// Passwords must never reach the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("code", &self.code)
            .finish()
    }
}

/// Outcome of a customer save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReport {
    #[serde(rename = "customerID", default)]
    pub customer_id: i64,
    #[serde(rename = "alreadyExists", default, deserialize_with = "bool_from_int")]
    pub already_exists: bool,
}

/// The API reports booleans as `0`/`1`; accept real booleans too.
fn bool_from_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrBool {
        Int(i64),
        Bool(bool),
    }

    Ok(match IntOrBool::deserialize(deserializer)? {
        IntOrBool::Int(n) => n != 0,
        IntOrBool::Bool(b) => b,
    })
}
