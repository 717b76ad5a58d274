//! Who is calling: client details and bearer authentication.
//!
//! Both extractors build a [`ChatSession`] that handlers receive as an
//! explicit argument. Nothing is stashed in request extensions for later.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{ACCEPT_LANGUAGE, AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use shard::{parse_accept_language, ChatSession};
use tracing::debug;

use crate::error::GatewayError;
use crate::AppState;

/// Anonymous view of the client, built from request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo(pub ChatSession);

impl ClientInfo {
    pub fn from_parts(parts: &Parts) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let headers = &parts.headers;
        let user_agent = header_str(headers, USER_AGENT.as_str()).unwrap_or_default();
        let langs = header_str(headers, ACCEPT_LANGUAGE.as_str())
            .map(parse_accept_language)
            .unwrap_or_default();
        let ip = client_ip(headers, peer).map(|ip| ip.to_string());
        Self(ChatSession::new(user_agent, ip, langs))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// A client that presented a valid bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession(pub ChatSession);

impl FromRequestParts<AppState> for AuthenticatedSession {
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = header_str(&parts.headers, AUTHORIZATION.as_str())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(GatewayError::Unauthorized("missing bearer token"))?;
        let claims = state
            .issuer
            .validate(token)
            .map_err(|_| GatewayError::Unauthorized("invalid bearer token"))?;
        debug!(user = %claims.user_id, "Authenticated request");

        let ClientInfo(session) = ClientInfo::from_parts(parts);
        Ok(Self(session.with_claims(&claims)))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Resolves the client address: `X-Real-IP`, then the first valid entry of
/// `X-Forwarded-For`, then the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(ip) = header_str(headers, "x-real-ip").and_then(|v| v.trim().parse().ok()) {
        return Some(ip);
    }
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').find_map(|entry| entry.trim().parse().ok()));
    forwarded.or(peer)
}
