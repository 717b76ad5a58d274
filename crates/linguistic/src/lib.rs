//! Linguistic service adapter.
//!
//! Implements [`shard::LinguisticService`] over the service's HTTP API:
//!
//! - `GET {base}/decode?t=<text>&lang=<locale>` returns the graph form of the
//!   text as the body and its discourse classification in the
//!   `GLT-Discourse-Type` header.
//! - `POST {base}/encode?cs=<locale>` takes graph text as the body and returns
//!   natural-language text. Encoding is bounded by [`ENCODE_TIMEOUT`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** The `dispatch` crate sees only
//! [`shard::LinguisticService`]. Failures are never retried here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use shard::{Decoded, LinguisticError, LinguisticService, Locale};
use thiserror::Error;
use tracing::{debug, instrument};

/// Response header carrying the discourse classification of decoded text.
pub const DISCOURSE_TYPE_HEADER: &str = "glt-discourse-type";

pub const ENCODE_TIMEOUT: Duration = Duration::from_secs(10);

/// The HTTP client could not be constructed.
#[derive(Debug, Error)]
#[error("Failed to build linguistic service HTTP client: {0}")]
pub struct ClientBuildError(#[from] reqwest::Error);

/// [`LinguisticService`] speaking HTTP.
#[derive(Debug, Clone)]
pub struct HttpLinguisticService {
    base_url: String,
    http: Client,
}

impl HttpLinguisticService {
    pub fn new(base_url: &str) -> Result<Self, ClientBuildError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::builder().build()?,
        })
    }
}

fn unreachable(err: reqwest::Error) -> LinguisticError {
    LinguisticError::Unreachable {
        message: err.to_string(),
    }
}

/// Returns the response body, or a status error for anything but success.
async fn success_body(response: Response) -> Result<(reqwest::header::HeaderMap, String), LinguisticError> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.map_err(unreachable)?;
    if !status.is_success() {
        return Err(LinguisticError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok((headers, body))
}

#[async_trait]
impl LinguisticService for HttpLinguisticService {
    #[instrument(skip_all, fields(%locale, text_len = text.len()))]
    async fn decode(&self, text: &str, locale: &Locale) -> Result<Decoded, LinguisticError> {
        let response = self
            .http
            .get(format!("{}/decode", self.base_url))
            .query(&[("t", text), ("lang", locale.as_str())])
            .send()
            .await
            .map_err(unreachable)?;
        let (headers, graph) = success_body(response).await?;

        let discourse_type = headers
            .get(DISCOURSE_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        debug!(%discourse_type, "Decoded message");
        Ok(Decoded {
            graph,
            discourse_type,
        })
    }

    #[instrument(skip_all, fields(%locale, graph_len = graph.len()))]
    async fn encode(&self, graph: &str, locale: &Locale) -> Result<String, LinguisticError> {
        let response = self
            .http
            .post(format!("{}/encode", self.base_url))
            .query(&[("cs", locale.as_str())])
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .timeout(ENCODE_TIMEOUT)
            .body(graph.to_string())
            .send()
            .await
            .map_err(unreachable)?;
        let (_, text) = success_body(response).await?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::Router;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct DecodeParams {
        t: String,
        lang: String,
    }

    #[derive(Deserialize)]
    struct EncodeParams {
        cs: String,
    }

    async fn decode(Query(params): Query<DecodeParams>) -> impl IntoResponse {
        if params.t == "fail" {
            return (StatusCode::INTERNAL_SERVER_ERROR, "decoder crashed").into_response();
        }
        let kind = if params.t.ends_with('?') || params.t.starts_with("tell me") {
            "query"
        } else {
            "stm"
        };
        (
            [(DISCOURSE_TYPE_HEADER, kind)],
            format!("{{{} {}}}", params.lang, params.t),
        )
            .into_response()
    }

    async fn encode(Query(params): Query<EncodeParams>, body: String) -> String {
        format!("[{}] {body}", params.cs)
    }

    async fn serve() -> HttpLinguisticService {
        let app = Router::new()
            .route("/decode", get(decode))
            .route("/encode", post(encode));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        HttpLinguisticService::new(&format!("http://{addr}/")).unwrap()
    }

    fn locale(tag: &str) -> Locale {
        Locale::from_tag(tag).unwrap()
    }

    #[tokio::test]
    async fn decode_sends_text_and_locale_and_reads_discourse_header() {
        let service = serve().await;

        let decoded = service.decode("tell me about dolphins", &locale("en")).await.unwrap();

        assert_eq!(decoded.graph, "{en tell me about dolphins}");
        assert_eq!(decoded.discourse_type, "query");
    }

    #[tokio::test]
    async fn decode_escapes_query_parameters() {
        let service = serve().await;

        let decoded = service.decode("a&b=c d", &locale("ru")).await.unwrap();

        assert_eq!(decoded.graph, "{ru a&b=c d}");
        assert_eq!(decoded.discourse_type, "stm");
    }

    #[tokio::test]
    async fn decode_failure_status_is_an_error() {
        let service = serve().await;

        let err = service.decode("fail", &locale("en")).await.unwrap_err();

        assert_eq!(
            err,
            LinguisticError::Status {
                status: 500,
                body: "decoder crashed".into()
            }
        );
    }

    #[tokio::test]
    async fn encode_posts_graph_with_charset_parameter() {
        let service = serve().await;

        let text = service.encode("{fact Sky}", &locale("de")).await.unwrap();

        assert_eq!(text, "[de] {fact Sky}");
    }

    #[tokio::test]
    async fn unreachable_service_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let service = HttpLinguisticService::new(&format!("http://{addr}")).unwrap();

        assert!(matches!(
            service.decode("hi", &locale("en")).await,
            Err(LinguisticError::Unreachable { .. })
        ));
    }
}
