use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::SignedCookieJar;
use custgate_cache::FilterSet;
use custgate_remote::{Credentials, ResultSet, WriteReport};
use serde::Serialize;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::server::AppState;
use crate::session::ValidSession;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Serialize)]
pub struct AuthResponse {
    status: &'static str,
    session: String,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

pub async fn metrics() -> impl IntoResponse {
    match crate::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `POST /auth`: exchange credentials for a session cookie.
///
/// Fields are read from the form body and then the query string; a
/// non-empty body field wins. Unreadable input counts as empty so that it
/// fails validation like any other missing field.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    query: Result<Query<Credentials>, QueryRejection>,
    form: Result<Form<Credentials>, FormRejection>,
) -> Result<(SignedCookieJar, Json<AuthResponse>), GatewayError> {
    let from_query = match query {
        Ok(Query(credentials)) => credentials,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable credentials query");
            Credentials::default()
        }
    };
    let credentials = match form {
        Ok(Form(credentials)) => merge_credentials(credentials, from_query),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable credentials form");
            from_query
        }
    };

    let id = state.gateway.authenticator().authenticate(&credentials).await?;
    let jar = state.cookie.issue(jar, &id);
    Ok((
        jar,
        Json(AuthResponse {
            status: "authenticated",
            session: id.to_string(),
        }),
    ))
}

fn merge_credentials(body: Credentials, query: Credentials) -> Credentials {
    fn pick(body: String, query: String) -> String {
        if body.is_empty() { query } else { body }
    }
    Credentials {
        username: pick(body.username, query.username),
        password: pick(body.password, query.password),
        code: pick(body.code, query.code),
    }
}

/// `GET /read`: query-string filters answered through the cache.
pub async fn read_customers(
    State(gateway): State<Arc<Gateway>>,
    ValidSession(session): ValidSession,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ResultSet>, GatewayError> {
    let filters = FilterSet::from_query_pairs(pairs);
    let results = gateway.engine().read(session.as_ref(), &filters).await?;
    Ok(Json(results))
}

/// `POST /write`: query-string fields forwarded to the remote service.
pub async fn write_customer(
    State(gateway): State<Arc<Gateway>>,
    ValidSession(session): ValidSession,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<WriteReport>, GatewayError> {
    let fields = FilterSet::from_query_pairs(pairs);
    let report = gateway.engine().write(session.as_ref(), &fields).await?;
    Ok(Json(report))
}
