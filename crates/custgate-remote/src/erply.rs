//! Erply customer API client.
//!
//! Every call is a form-encoded `POST` to `https://{clientCode}.erply.com/api/`
//! naming the operation in the `request` field. Responses share one envelope:
//!
//! ```text
//! {
//!   "status":  { "request": "...", "responseStatus": "ok", "errorCode": 0 },
//!   "records": [ ... ]
//! }
//! ```
//!
//! A session is opened with `verifyUser`, which yields a `sessionKey` valid for
//! `sessionLength` seconds. Once the key lapses the session re-verifies with
//! the credentials it was opened with.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::RemoteError;
use crate::traits::{RemoteConnector, RemoteSession};
use crate::types::{Credentials, Filters, Record, ResultSet, WriteReport};

/// Session lifetime assumed when `verifyUser` omits `sessionLength`.
pub const DEFAULT_SESSION_LENGTH_SECS: u64 = 3600;

const VERIFY_USER: &str = "verifyUser";
const GET_CUSTOMERS: &str = "getCustomers";
const SAVE_CUSTOMER: &str = "saveCustomer";

/// Form fields the client fills in on every session call. Erply honours the
/// last occurrence of a repeated field, so callers may not supply these.
pub const RESERVED_FIELDS: [&str; 4] = ["request", "clientCode", "sessionKey", "sendContentType"];

/// Reject filters that would override a [`RESERVED_FIELDS`] entry.
pub fn check_filters(filters: &Filters) -> Result<(), RemoteError> {
    match filters
        .keys()
        .find(|name| RESERVED_FIELDS.contains(&name.as_str()))
    {
        Some(name) => Err(RemoteError::ReservedField(name.clone())),
        None => Ok(()),
    }
}

/// Connection settings for the Erply API.
#[derive(Debug, Clone)]
pub struct ErplySettings {
    /// Fixed API endpoint. When unset the endpoint is derived from the
    /// account code.
    pub base_url: Option<String>,
    /// Timeout applied to every HTTP call.
    pub request_timeout: Duration,
}

impl Default for ErplySettings {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: Status,
    #[serde(default)]
    records: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(rename = "responseStatus")]
    response_status: String,
    #[serde(rename = "errorCode", default)]
    error_code: i64,
    #[serde(rename = "errorField", default)]
    error_field: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifiedUser {
    #[serde(rename = "sessionKey")]
    session_key: String,
    #[serde(rename = "sessionLength", default)]
    session_length: Option<u64>,
}

/// Opens [`ErplySession`]s.
#[derive(Clone)]
pub struct ErplyConnector {
    http: reqwest::Client,
    settings: ErplySettings,
}

impl ErplyConnector {
    /// Build a connector with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(settings: ErplySettings) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self, code: &str) -> Result<Url, RemoteError> {
        let raw = match &self.settings.base_url {
            Some(base) => base.clone(),
            None => format!("https://{code}.erply.com/api/"),
        };
        Url::parse(&raw).map_err(|e| RemoteError::InvalidEndpoint(format!("{raw}: {e}")))
    }
}

#[async_trait]
impl RemoteConnector for ErplyConnector {
    #[instrument(skip(self, credentials), fields(username = %credentials.username, code = %credentials.code))]
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn RemoteSession>, RemoteError> {
        credentials.validate()?;
        let endpoint = self.endpoint(&credentials.code)?;
        let key = verify_user(&self.http, &endpoint, credentials).await?;

        debug!("Remote session opened");
        Ok(Arc::new(ErplySession {
            http: self.http.clone(),
            endpoint,
            credentials: credentials.clone(),
            key: Mutex::new(key),
        }))
    }
}

struct SessionKey {
    value: String,
    expires_at: Instant,
}

impl SessionKey {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// A verified Erply session.
pub struct ErplySession {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Credentials,
    key: Mutex<SessionKey>,
}

impl ErplySession {
    async fn session_key(&self) -> String {
        self.key.lock().await.value.clone()
    }

    /// Session parameters for `request` followed by the caller's filters.
    async fn params(
        &self,
        request: &str,
        filters: &Filters,
    ) -> Result<Vec<(String, String)>, RemoteError> {
        check_filters(filters)?;
        let mut params = vec![
            ("request".to_string(), request.to_string()),
            ("clientCode".to_string(), self.credentials.code.clone()),
            ("sessionKey".to_string(), self.session_key().await),
            ("sendContentType".to_string(), "1".to_string()),
        ];
        params.extend(filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(params)
    }
}

#[async_trait]
impl RemoteSession for ErplySession {
    async fn is_valid(&self) -> bool {
        let mut key = self.key.lock().await;
        if key.is_live() {
            return true;
        }

        match verify_user(&self.http, &self.endpoint, &self.credentials).await {
            Ok(fresh) => {
                debug!(code = %self.credentials.code, "Remote session renewed");
                *key = fresh;
                true
            }
            Err(e) => {
                warn!(code = %self.credentials.code, error = %e, "Remote session renewal failed");
                false
            }
        }
    }

    #[instrument(skip(self, filters), fields(code = %self.credentials.code))]
    async fn query(&self, filters: &Filters) -> Result<ResultSet, RemoteError> {
        let params = self.params(GET_CUSTOMERS, filters).await?;

        let records = call(&self.http, &self.endpoint, GET_CUSTOMERS, &params).await?;
        records
            .into_iter()
            .map(|record| match record {
                Value::Object(map) => Ok::<Record, RemoteError>(map),
                other => Err(RemoteError::decode(format!(
                    "customer record is not an object: {other}"
                ))),
            })
            .collect()
    }

    #[instrument(skip(self, filters), fields(code = %self.credentials.code))]
    async fn write(&self, filters: &Filters) -> Result<WriteReport, RemoteError> {
        let params = self.params(SAVE_CUSTOMER, filters).await?;

        let record = call(&self.http, &self.endpoint, SAVE_CUSTOMER, &params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::decode("saveCustomer returned no report"))?;

        serde_json::from_value(record).map_err(|e| RemoteError::decode(e.to_string()))
    }
}

async fn verify_user(
    http: &reqwest::Client,
    endpoint: &Url,
    credentials: &Credentials,
) -> Result<SessionKey, RemoteError> {
    let params = vec![
        ("request".to_string(), VERIFY_USER.to_string()),
        ("clientCode".to_string(), credentials.code.clone()),
        ("username".to_string(), credentials.username.clone()),
        ("password".to_string(), credentials.password.clone()),
        ("sendContentType".to_string(), "1".to_string()),
    ];

    let record = call(http, endpoint, VERIFY_USER, &params)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RemoteError::decode("verifyUser returned no records"))?;

    let user: VerifiedUser =
        serde_json::from_value(record).map_err(|e| RemoteError::decode(e.to_string()))?;

    if user.session_key.is_empty() {
        return Err(RemoteError::decode("verifyUser returned an empty sessionKey"));
    }

    let length = user.session_length.unwrap_or(DEFAULT_SESSION_LENGTH_SECS);
    Ok(SessionKey {
        value: user.session_key,
        expires_at: Instant::now() + Duration::from_secs(length),
    })
}

/// Issue one API call and unwrap its envelope.
async fn call(
    http: &reqwest::Client,
    endpoint: &Url,
    request: &str,
    params: &[(String, String)],
) -> Result<Vec<Value>, RemoteError> {
    let response = http
        .post(endpoint.clone())
        .form(params)
        .send()
        .await?
        .error_for_status()?;

    let envelope: Envelope = response
        .json()
        .await
        .map_err(|e| RemoteError::decode(format!("{request}: {e}")))?;

    if envelope.status.response_status != "ok" || envelope.status.error_code != 0 {
        return Err(RemoteError::rejected(
            request,
            envelope.status.error_code,
            envelope.status.error_field.unwrap_or_default(),
        ));
    }

    Ok(envelope.records.unwrap_or_default())
}
