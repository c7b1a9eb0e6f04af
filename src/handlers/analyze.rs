use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::analysis;
use crate::config::CONFIG;
use crate::generation::resolver;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBody {
    pub image_path: Option<String>,
}

/// POST /analyze-room: stateless dimension/feature inspection of a photo.
pub async fn analyze_room(Json(body): Json<AnalyzeBody>) -> (StatusCode, Json<Value>) {
    let roots = [
        CONFIG.project_root.clone(),
        CONFIG.project_root.join("server"),
    ];
    let resolved = body
        .image_path
        .as_deref()
        .and_then(|reference| resolver::resolve_image(reference, &roots));
    let Some(path) = resolved else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Image not found" })),
        );
    };

    let analysis = match tokio::task::spawn_blocking(move || analysis::analyze_room(&path)).await {
        Ok(Ok(analysis)) => analysis,
        Ok(Err(err)) => {
            error!("Room analysis failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            );
        }
        Err(err) => {
            error!("Room analysis task failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            );
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "dimensions": { "width": analysis.width, "height": analysis.height },
            "detectedType": analysis.detected_type,
            "features": analysis.features,
        })),
    )
}
