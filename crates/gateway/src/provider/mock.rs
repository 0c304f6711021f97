//! In-process stand-in for the completion provider, used by tests.

use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::Value;

/// One canned reply. The last reply repeats once the queue is drained.
#[derive(Clone)]
pub(crate) struct MockReply {
    status: StatusCode,
    body: Value,
}

impl MockReply {
    pub(crate) fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub(crate) fn status(code: u16, body: Value) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap(),
            body,
        }
    }
}

/// A request as seen by the mock provider.
#[derive(Debug, Clone)]
pub(crate) struct Captured {
    pub(crate) body: Vec<u8>,
    pub(crate) authorization: Option<String>,
    pub(crate) referer: Option<String>,
}

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<Vec<MockReply>>>,
    captured: Arc<Mutex<Vec<Captured>>>,
}

pub(crate) struct MockProvider {
    pub(crate) base_url: String,
    state: MockState,
}

impl MockProvider {
    pub(crate) fn requests(&self) -> Vec<Captured> {
        self.state.captured.lock().unwrap().clone()
    }
}

/// Bind a provider on an ephemeral loopback port and serve `replies` in order.
pub(crate) async fn spawn_provider(replies: Vec<MockReply>) -> MockProvider {
    assert!(!replies.is_empty(), "mock provider needs at least one reply");
    let state = MockState {
        replies: Arc::new(Mutex::new(replies)),
        captured: Arc::default(),
    };
    let app = Router::new()
        .route("/chat/completions", post(completions))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockProvider {
        base_url: format!("http://{addr}"),
        state,
    }
}

async fn completions(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    state.captured.lock().unwrap().push(Captured {
        body: body.to_vec(),
        authorization: header("authorization"),
        referer: header("http-referer"),
    });

    let mut replies = state.replies.lock().unwrap();
    let reply = if replies.len() > 1 {
        replies.remove(0)
    } else {
        replies[0].clone()
    };
    (reply.status, Json(reply.body))
}
