//! Endpoint handlers.

use axum::extract::{Query, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Json, Response};
use dispatch::DispatchError;
use serde::{Deserialize, Serialize};
use shard::{find_cookie, gsl, Message, SESSION_COOKIE_NAME};
use tracing::{info, warn};

use crate::client::{AuthenticatedSession, ClientInfo};
use crate::error::GatewayError;
use crate::AppState;

#[derive(Debug, Serialize)]
struct SessionBody<'a> {
    sid: &'a str,
}

/// `GET /session`: validates a presented `sid` cookie, or opens a new session.
pub async fn session(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let presented = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookies| find_cookie(cookies, SESSION_COOKIE_NAME));

    if let Some(token) = presented {
        state
            .issuer
            .validate(token)
            .map_err(|_| GatewayError::InvalidSid)?;
        return Ok(Json(SessionBody { sid: token }).into_response());
    }

    let issued = state.issuer.create(client).await?;
    let mut response = Json(SessionBody { sid: &issued.token }).into_response();
    for cookie in &issued.cookies {
        match HeaderValue::from_str(&cookie.header_value()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(err) => warn!(error = %err, cookie = %cookie.name, "Cookie dropped: not a valid header value"),
        }
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    gsl: String,
}

/// `GET /query?gsl=...`: runs a read query in the client's locale.
pub async fn query(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    Query(params): Query<QueryParams>,
) -> Result<Response, GatewayError> {
    if params.gsl.trim().is_empty() {
        return Err(GatewayError::BadRequest("empty query".into()));
    }
    let task = gsl::query_task(&client.locale(), &params.gsl);
    match state.dispatcher.run(&task).await {
        Ok(resolution) => Ok(json_text(resolution.body)),
        Err(DispatchError::Execution(err)) => Err(GatewayError::QueryFailed(err)),
        Err(err) => Err(err.into()),
    }
}

/// `POST /gsl`: runs a raw task for an authenticated client.
pub async fn task(
    State(state): State<AppState>,
    AuthenticatedSession(session): AuthenticatedSession,
    body: String,
) -> Result<Response, GatewayError> {
    if body.trim().is_empty() {
        return Err(GatewayError::BadRequest("empty task".into()));
    }
    let resolution = state.dispatcher.run(&body).await?;
    info!(
        user = session.user_id.as_ref().map(|id| id.as_str()).unwrap_or_default(),
        task_type = %resolution.task_type,
        "Task served"
    );
    Ok(json_text(resolution.body))
}

#[derive(Debug, Deserialize)]
pub struct MessageParams {
    t: String,
    #[serde(default)]
    ctx: String,
}

/// `GET /msg?t=...&ctx=...`: answers one chat message.
pub async fn message(
    State(state): State<AppState>,
    AuthenticatedSession(session): AuthenticatedSession,
    Query(params): Query<MessageParams>,
) -> Result<Response, GatewayError> {
    let reply = state
        .router
        .process(&session, Message::new(params.ctx, params.t))
        .await
        .inspect_err(|err| warn!(error = %err, "Message failed"))?;
    Ok(with_cors(Json(reply).into_response()))
}

/// `OPTIONS /msg`: CORS preflight.
pub async fn message_preflight() -> Response {
    with_cors(().into_response())
}

fn json_text(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}
