//! Graceful shutdown of the HTTP server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use listener::serve;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};

/// `GET /slow` signals `entered`, then answers `done` after `delay`.
fn slow_app(delay: Duration, entered: Arc<Notify>) -> Router {
    Router::new().route(
        "/slow",
        get(move || {
            let entered = entered.clone();
            async move {
                entered.notify_one();
                tokio::time::sleep(delay).await;
                "done"
            }
        }),
    )
}

struct Running {
    server: tokio::task::JoinHandle<std::io::Result<()>>,
    client: tokio::task::JoinHandle<reqwest::Result<reqwest::Response>>,
    stop: oneshot::Sender<()>,
}

/// Starts `serve` and one in-flight request to `/slow`, returning once the
/// handler is running.
async fn start_with_request_in_flight(delay: Duration, grace: Duration) -> Running {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let entered = Arc::new(Notify::new());
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(serve(
        tcp,
        slow_app(delay, entered.clone()),
        async move {
            let _ = stopped.await;
        },
        grace,
    ));
    let client = tokio::spawn(async move { reqwest::get(format!("http://{addr}/slow")).await });
    entered.notified().await;

    Running { server, client, stop }
}

#[tokio::test]
async fn test_in_flight_request_finishes_within_grace() {
    let running = start_with_request_in_flight(Duration::from_millis(200), Duration::from_secs(5)).await;

    running.stop.send(()).unwrap();

    let response = running.client.await.unwrap().unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "done");
    tokio::time::timeout(Duration::from_secs(5), running.server)
        .await
        .expect("server drained and stopped")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_server_stops_when_grace_elapses() {
    let grace = Duration::from_millis(200);
    let running = start_with_request_in_flight(Duration::from_secs(60), grace).await;

    let stopping = Instant::now();
    running.stop.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), running.server)
        .await
        .expect("server stopped after the grace period")
        .unwrap()
        .unwrap();
    assert!(stopping.elapsed() >= grace);
}
