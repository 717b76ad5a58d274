//! HTTP surface of the Aide gateway.
//!
//! | Route | Auth | Handler |
//! |-------|------|---------|
//! | `GET /session` | none | validate the `sid` cookie or open a session |
//! | `GET /query?gsl=` | none | read query in the client's locale |
//! | `POST /gsl` | bearer | raw graph task |
//! | `GET /msg?t=&ctx=` | bearer | chat message (CORS enabled) |
//!
//! Every route sits behind its own [`AdmissionController`], so a flood of
//! chat messages cannot starve session creation. Requests carry a
//! [`RequestId`] on their tracing span.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Routing, extraction, status codes and shutdown live
//! here; all behaviour is delegated to the `dispatch` crate.

pub mod client;
pub mod error;
pub mod handlers;

use std::future::{Future, IntoFuture};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::USER_AGENT;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use dispatch::{AdmissionConfig, AdmissionController, MessageRouter, SessionIssuer, TaskDispatcher};
use shard::RequestId;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, info_span, warn, Instrument, Level, Span};

pub use client::{client_ip, AuthenticatedSession, ClientInfo};
pub use error::GatewayError;

/// One admission controller per route.
#[derive(Debug, Clone)]
pub struct RouteAdmission {
    pub session: AdmissionController,
    pub query: AdmissionController,
    pub task: AdmissionController,
    pub message: AdmissionController,
}

impl RouteAdmission {
    /// Gives every route its own slots with the same limits.
    pub fn uniform(config: AdmissionConfig) -> Self {
        Self {
            session: AdmissionController::new(config),
            query: AdmissionController::new(config),
            task: AdmissionController::new(config),
            message: AdmissionController::new(config),
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: TaskDispatcher,
    pub router: MessageRouter,
    pub issuer: SessionIssuer,
    pub admission: RouteAdmission,
}

pub fn build_app(state: AppState) -> Router {
    let admission = state.admission.clone();
    Router::new()
        .route("/session", admitted(get(handlers::session), &admission.session))
        .route("/query", admitted(get(handlers::query), &admission.query))
        .route("/gsl", admitted(post(handlers::task), &admission.task))
        .route(
            "/msg",
            admitted(
                get(handlers::message).options(handlers::message_preflight),
                &admission.message,
            ),
        )
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn admitted(route: MethodRouter<AppState>, controller: &AdmissionController) -> MethodRouter<AppState> {
    route.layer(middleware::from_fn_with_state(controller.clone(), admit))
}

/// Holds an admission slot for the lifetime of the request.
///
/// Admitted requests run on their own task so a client disconnect does not
/// cancel engine or authority calls already in flight. The slot is held by
/// that task and is released only when the work finishes.
async fn admit(State(admission): State<AdmissionController>, request: Request, next: Next) -> Response {
    match admission.admit().await {
        Ok(permit) => {
            let work = tokio::spawn(
                async move {
                    let response = next.run(request).await;
                    drop(permit);
                    response
                }
                .instrument(Span::current()),
            );
            work.await
                .unwrap_or_else(|err| GatewayError::Aborted(err.to_string()).into_response())
        }
        Err(rejected) => {
            warn!(path = %request.uri().path(), "Request rejected: server is busy");
            GatewayError::Busy(rejected).into_response()
        }
    }
}

fn request_span(request: &Request) -> tracing::Span {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    info_span!(
        "request",
        request_id = %RequestId::new_random(),
        method = %request.method(),
        path = %request.uri().path(),
        query = request.uri().query().unwrap_or_default(),
        peer = %peer,
        user_agent = %user_agent,
    )
}

/// Serves `app` until `shutdown` resolves, then drains in-flight requests for
/// at most `grace` before returning.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
    grace: Duration,
) -> io::Result<()> {
    let (stopping_tx, mut stopping_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = stopping_tx.send(true);
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        _ = stopping_rx.wait_for(|stopping| *stopping) => {}
    }

    info!(grace_secs = grace.as_secs(), "Draining in-flight requests");
    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Grace period elapsed; closing remaining connections");
            Ok(())
        }
    }
}
