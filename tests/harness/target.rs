// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stub pull request service.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A request as the stub received it.
#[derive(Debug, Clone)]
pub struct ObservedRequest {
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// How the stub answers.
#[derive(Debug, Clone)]
pub struct TargetBehavior {
    /// Statuses returned in turn, cycling
    pub statuses: Vec<u16>,
    /// Body sent with non-2xx statuses
    pub error_body: Option<String>,
    /// Delay before answering
    pub delay: Duration,
}

impl Default for TargetBehavior {
    fn default() -> Self {
        Self {
            statuses: vec![201],
            error_body: None,
            delay: Duration::ZERO,
        }
    }
}

impl TargetBehavior {
    pub fn status(status: u16) -> Self {
        Self {
            statuses: vec![status],
            ..Default::default()
        }
    }
}

struct TargetState {
    behavior: TargetBehavior,
    counter: AtomicUsize,
    requests: Mutex<Vec<ObservedRequest>>,
}

/// Running stub server. Stops when the test's runtime shuts down.
pub struct StubTarget {
    addr: SocketAddr,
    state: Arc<TargetState>,
}

impl StubTarget {
    pub async fn start(behavior: TargetBehavior) -> Self {
        let state = Arc::new(TargetState {
            behavior,
            counter: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/pullRequest/create", post(create))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn requests(&self) -> Vec<ObservedRequest> {
        self.state.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.requests.lock().await.len()
    }
}

async fn create(
    State(state): State<Arc<TargetState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .requests
        .lock()
        .await
        .push(ObservedRequest { content_type, body });

    let behavior = &state.behavior;
    if !behavior.delay.is_zero() {
        tokio::time::sleep(behavior.delay).await;
    }

    let n = state.counter.fetch_add(1, Ordering::Relaxed);
    let status = behavior.statuses[n % behavior.statuses.len()];
    let status = StatusCode::from_u16(status).unwrap();

    match (&behavior.error_body, status.is_success()) {
        (Some(body), false) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        _ => status.into_response(),
    }
}

/// An address nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// A server that answers every connection with `status` and a body shorter
/// than its `Content-Length`, then hangs up.
pub async fn truncated_body_base_url(status: u16) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!("HTTP/1.1 {status} Stub\r\nContent-Length: 100\r\n\r\nshort");
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}
