use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::recommend::recommend_products;

#[derive(Debug, Deserialize)]
pub struct RecommendBody {
    pub style: Option<String>,
    pub budget: Option<f64>,
}

/// POST /recommend: budget-proportional product stub.
pub async fn recommend(Json(body): Json<RecommendBody>) -> Json<Value> {
    let style = body.style.unwrap_or_else(|| "Modern".to_string());
    let budget = body.budget.unwrap_or(10000.0);
    let products = recommend_products(&style, budget);

    Json(json!({
        "status": "success",
        "recommendations": products,
    }))
}
