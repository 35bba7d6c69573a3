use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::info;

/// The latest published snapshot. Every update replaces it wholesale.
#[derive(Clone, Default)]
pub struct StatusStore {
    snapshot: Arc<RwLock<Vec<Value>>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<Value> {
        self.snapshot.read().await.clone()
    }

    pub async fn replace(&self, batch: Vec<Value>) {
        *self.snapshot.write().await = batch;
    }
}

pub async fn get_status(State(store): State<StatusStore>) -> Json<Vec<Value>> {
    Json(store.snapshot().await)
}

pub async fn update_status(
    State(store): State<StatusStore>,
    Json(batch): Json<Vec<Value>>,
) -> Json<Value> {
    info!(entries = batch.len(), "Status snapshot replaced");
    store.replace(batch).await;
    Json(json!({ "message": "Status updated" }))
}

pub fn create_router(store: StatusStore) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/update_status", post(update_status))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

pub async fn start_server(port: u16, store: StatusStore) -> std::io::Result<()> {
    let app = create_router(store);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Status endpoint: http://localhost:{}/api/status", addr.port());
    axum::serve(listener, app).await
}
