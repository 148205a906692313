use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use loadrig_rpc::{RpcReply, status};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

mod service;

pub use service::{OP_GET_MESSAGES, OP_LOGIN, OP_REGISTER, OP_SEND_MESSAGE};
use service::{Operation, Store};

pub const PATH_RPC: &str = "/rpc/{operation}";

/// Knobs for shaping the stand-in service.
#[derive(Debug, Clone, Default)]
pub struct TestServerConfig {
    /// Added before every reply.
    pub latency: Duration,
    /// Every n-th request (1-based) answers `UNAVAILABLE`.
    pub fail_every: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    injected_failures: Arc<AtomicU64>,
    authorized_requests: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) -> u64 {
        self.requests_total.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn inc_injected_failures(&self) {
        self.injected_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_authorized_requests(&self) {
        self.authorized_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn injected_failures(&self) -> u64 {
        self.injected_failures.load(Ordering::Relaxed)
    }

    pub fn authorized_requests(&self) -> u64 {
        self.authorized_requests.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
struct AppState {
    config: TestServerConfig,
    stats: TestServerStats,
    store: Arc<Mutex<Store>>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn handle_rpc(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let n = state.stats.inc_requests_total();

    let Some(op) = Operation::parse(&operation) else {
        return (StatusCode::NOT_FOUND, format!("unknown operation: {operation}")).into_response();
    };

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return (StatusCode::BAD_REQUEST, "bad json").into_response(),
    };

    if !state.config.latency.is_zero() {
        tokio::time::sleep(state.config.latency).await;
    }

    if state.config.fail_every.is_some_and(|every| every > 0 && n % every == 0) {
        state.stats.inc_injected_failures();
        let reply = RpcReply::error(status::UNAVAILABLE, "injected failure");
        return (StatusCode::OK, axum::Json(reply)).into_response();
    }

    let bearer = bearer_token(&headers);
    if bearer.is_some() {
        state.stats.inc_authorized_requests();
    }

    let reply = state
        .store
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .handle(op, bearer, payload);

    (StatusCode::OK, axum::Json(reply)).into_response()
}

pub fn router(config: TestServerConfig, stats: TestServerStats) -> Router {
    let state = AppState {
        config,
        stats,
        store: Arc::new(Mutex::new(Store::default())),
    };

    Router::new()
        .route(PATH_RPC, post(handle_rpc))
        .with_state(state)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerConfig::default()).await
    }

    pub async fn start_with(config: TestServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(config, stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
