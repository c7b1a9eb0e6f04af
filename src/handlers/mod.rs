pub mod analyze;
pub mod chat;
pub mod generate;
pub mod recommend;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "message": "GruhaBuddy AI Engine is running!" }))
}
