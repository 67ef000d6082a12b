// Minimal PostgREST stand-in: one table, `file_path=eq.` filters, upsert on POST.
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone)]
struct RestState {
    service_key: String,
    rows: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl RestState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("apikey")
            .and_then(|v| v.to_str().ok())
            .map_or(false, |key| key == self.service_key)
    }
}

fn path_filter(query: &HashMap<String, String>) -> Option<String> {
    query
        .get("file_path")
        .and_then(|f| f.strip_prefix("eq."))
        .map(str::to_string)
}

async fn upsert_rows(
    State(state): State<RestState>,
    Path(_table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, r#"{"message":"Invalid API key"}"#).into_response();
    }
    let rows = match body {
        Value::Array(rows) => rows,
        row => vec![row],
    };
    let mut stored = state.rows.lock().unwrap();
    for row in rows {
        match row.get("file_path").and_then(Value::as_str) {
            Some(path) => {
                stored.insert(path.to_string(), row.clone());
            }
            None => return StatusCode::BAD_REQUEST.into_response(),
        }
    }
    StatusCode::CREATED.into_response()
}

async fn select_rows(
    State(state): State<RestState>,
    Path(_table): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let stored = state.rows.lock().unwrap();
    let rows: Vec<Value> = match path_filter(&query) {
        Some(path) => stored.get(&path).cloned().into_iter().collect(),
        None => stored.values().cloned().collect(),
    };
    Json(rows).into_response()
}

async fn delete_rows(
    State(state): State<RestState>,
    Path(_table): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match path_filter(&query) {
        Some(path) => {
            state.rows.lock().unwrap().remove(&path);
            StatusCode::NO_CONTENT.into_response()
        }
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

pub struct MockRestServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl MockRestServer {
    pub async fn start(service_key: &str) -> Self {
        let state = RestState {
            service_key: service_key.to_string(),
            rows: Arc::new(Mutex::new(BTreeMap::new())),
        };

        let app = Router::new()
            .route(
                "/rest/v1/{table}",
                get(select_rows).post(upsert_rows).delete(delete_rows),
            )
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| log::error!("Mock REST server error: {}", e));
        });

        MockRestServer { addr, shutdown_tx }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }
}
