use axum::http::HeaderMap;
use axum_extra::extract::SignedCookieJar;
use cookie::{Cookie, Key, SameSite};

use super::registry::SessionId;
use crate::config::SessionConfig;

/// Signing key and attributes of the session cookie.
#[derive(Clone)]
pub struct SessionCookie {
    name: String,
    secure: bool,
    key: Key,
}

impl SessionCookie {
    /// Uses the configured secret when present, otherwise a key generated for
    /// this process only (cookies do not survive a restart).
    pub fn from_config(config: &SessionConfig) -> Result<Self, cookie::KeyError> {
        let key = match &config.cookie_secret {
            Some(secret) => Key::try_from(secret.as_bytes())?,
            None => {
                tracing::warn!("No session.cookie_secret configured, using an ephemeral key");
                Key::generate()
            }
        };
        Ok(Self {
            name: config.cookie_name.clone(),
            secure: config.secure,
            key,
        })
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    fn build(&self, id: &SessionId) -> Cookie<'static> {
        Cookie::build((self.name.clone(), id.as_str().to_string()))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .build()
    }

    /// Add the signed session cookie for `id` to `jar`.
    pub fn issue(&self, jar: SignedCookieJar, id: &SessionId) -> SignedCookieJar {
        jar.add(self.build(id))
    }

    /// Session identifier carried by a correctly signed cookie, if any.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        SignedCookieJar::from_headers(headers, self.key.clone())
            .get(&self.name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }
}
