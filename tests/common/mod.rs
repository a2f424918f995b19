//! In-process mock backend shared by the integration tests.
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::{json, Value as JsonValue};

#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn json(&self) -> JsonValue {
        serde_json::from_str(&self.body).unwrap_or(JsonValue::Null)
    }
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    status: StatusCode,
    content_type: &'static str,
    body: String,
    delay: Duration,
}

impl MockResponse {
    pub fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
            delay: Duration::from_millis(0),
        }
    }

    pub fn ok(body: JsonValue) -> Self {
        Self::json(StatusCode::OK, body)
    }

    pub fn raw(status: StatusCode, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            delay: Duration::from_millis(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// `{code, msg, data}` success envelope.
pub fn envelope_ok(data: JsonValue) -> JsonValue {
    json!({"code": "0000", "msg": "ok", "data": data})
}

/// `{code, msg, data}` failure envelope.
pub fn envelope_fail(code: &str, msg: &str) -> JsonValue {
    json!({"code": code, "msg": msg, "data": null})
}

type Responder = dyn Fn(&SeenRequest) -> MockResponse + Send + Sync;

#[derive(Clone)]
struct MockState {
    responder: Arc<Responder>,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

async fn handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let request = SeenRequest {
        method,
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        headers,
        body,
    };
    let response = (state.responder)(&request);
    state
        .seen
        .lock()
        .expect("seen mutex must not be poisoned")
        .push(request);

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (
        response.status,
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response()
}

pub struct TestServer {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen
            .lock()
            .expect("seen mutex must not be poisoned")
            .clone()
    }
}

/// Serves `responses` in order, then 500 once exhausted.
pub async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let queue = Mutex::new(VecDeque::from(responses));
    spawn_responder(move |_| {
        queue
            .lock()
            .expect("response queue mutex must not be poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                MockResponse::json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "no mock response available"}),
                )
            })
    })
    .await
}

/// Answers every request with `responder`.
pub async fn spawn_responder<F>(responder: F) -> TestServer
where
    F: Fn(&SeenRequest) -> MockResponse + Send + Sync + 'static,
{
    let state = MockState {
        responder: Arc::new(responder),
        hits: Arc::new(AtomicUsize::new(0)),
        seen: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new().fallback(handler).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        seen: state.seen,
        task,
    }
}

/// Polls `condition` until it holds or a second has passed.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
