//! In-process fake backend for transport tests
//!
//! Serves the same routes as the real backend (`/api/upload`,
//! `/api/ask_question` and the `/ws` push channel), records what it receives
//! and lets tests push frames to connected clients.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
enum Push {
    Frame(String),
    Close,
}

#[derive(Clone)]
struct BackendState {
    upload_response: Arc<Mutex<(StatusCode, Value)>>,
    uploads: Arc<Mutex<Vec<Value>>>,
    questions: Arc<Mutex<Vec<Value>>>,
    pushes: broadcast::Sender<Push>,
    connections: Arc<watch::Sender<usize>>,
    frames: Arc<watch::Sender<Vec<Value>>>,
}

/// A running fake backend bound to an ephemeral local port
pub struct FakeBackend {
    addr: SocketAddr,
    state: BackendState,
    server: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        let (pushes, _) = broadcast::channel(64);
        let (connections, _) = watch::channel(0);
        let (frames, _) = watch::channel(Vec::new());
        let state = BackendState {
            upload_response: Arc::new(Mutex::new((
                StatusCode::OK,
                json!({ "summary": "fake summary", "chunk_summaries": [] }),
            ))),
            uploads: Arc::new(Mutex::new(Vec::new())),
            questions: Arc::new(Mutex::new(Vec::new())),
            pushes,
            connections: Arc::new(connections),
            frames: Arc::new(frames),
        };

        let app = Router::new()
            .route("/api/upload", post(upload))
            .route("/api/ask_question", post(ask_question))
            .route("/ws", get(ws_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn set_upload_response(&self, status: StatusCode, body: Value) {
        *self.state.upload_response.lock().unwrap() = (status, body);
    }

    pub fn uploads(&self) -> Vec<Value> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn questions(&self) -> Vec<Value> {
        self.state.questions.lock().unwrap().clone()
    }

    /// Send a raw frame to every connected client
    pub fn push(&self, frame: Value) {
        let _ = self.state.pushes.send(Push::Frame(frame.to_string()));
    }

    /// Close every open push connection from the server side
    pub fn close_connections(&self) {
        let _ = self.state.pushes.send(Push::Close);
    }

    pub fn connection_count(&self) -> usize {
        *self.state.connections.borrow()
    }

    pub async fn wait_for_connections(&self, count: usize) {
        let mut rx = self.state.connections.subscribe();
        tokio::time::timeout(WAIT, rx.wait_for(|n| *n >= count))
            .await
            .expect("timed out waiting for push connection")
            .expect("connection counter dropped");
    }

    /// Wait until at least `count` client frames arrived and return them all
    pub async fn wait_for_frames(&self, count: usize) -> Vec<Value> {
        let mut rx = self.state.frames.subscribe();
        let frames = tokio::time::timeout(WAIT, rx.wait_for(|f| f.len() >= count))
            .await
            .expect("timed out waiting for client frames")
            .expect("frame log dropped");
        frames.clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn upload(State(state): State<BackendState>, Json(body): Json<Value>) -> impl IntoResponse {
    state.uploads.lock().unwrap().push(body);
    let (status, response) = state.upload_response.lock().unwrap().clone();
    (status, Json(response))
}

async fn ask_question(State(state): State<BackendState>, Json(body): Json<Value>) -> Json<Value> {
    state.questions.lock().unwrap().push(body);
    Json(json!({ "answer": "delivered over the push channel" }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<BackendState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: BackendState) {
    let mut pushes = state.pushes.subscribe();
    state.connections.send_modify(|n| *n += 1);
    let (mut tx, mut rx) = socket.split();

    loop {
        tokio::select! {
            push = pushes.recv() => match push {
                Ok(Push::Frame(text)) => {
                    if tx.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Close) | Err(_) => {
                    let _ = tx.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(frame) = serde_json::from_str::<Value>(&text) {
                        state.frames.send_modify(|f| f.push(frame));
                    }
                }
                Some(Ok(_)) => {}
                _ => break,
            }
        }
    }
}
