// POST /similarity: normalized string similarity between two lines.
//
// Unknown method names are a client error (400) naming the input.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::text::similarity::calculate_similarity;
use crate::web::api_error;

#[derive(Deserialize)]
pub struct SimilarityRequest {
    pub method: String,
    pub line1: String,
    pub line2: String,
}

#[derive(Serialize)]
pub struct SimilarityResponse {
    pub method: String,
    pub line1: String,
    pub line2: String,
    pub similarity: f64,
}

pub async fn similarity(Json(request): Json<SimilarityRequest>) -> Response {
    match calculate_similarity(&request.method, &request.line1, &request.line2) {
        Ok(similarity) => Json(SimilarityResponse {
            method: request.method,
            line1: request.line1,
            line2: request.line2,
            similarity,
        })
        .into_response(),
        Err(e) => {
            warn!("Rejected similarity request: {e}");
            api_error(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}
