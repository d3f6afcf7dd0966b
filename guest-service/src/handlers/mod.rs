pub mod guest_handlers;
pub mod notification_handlers;

use axum::Json;
use log::info;
use serde_json::{json, Value};

// GET /health
pub async fn health() -> Json<Value> {
    info!("Health check");
    Json(json!({ "message": "Server is healthy" }))
}
