// Versioned ML routes, mounted under API_V1_STR.
//
// POST {prefix}/predict                  score a text in [0, 1]
// POST {prefix}/preprocess?method=nltk   normalized token list (nltk | spacy)

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::text::{normalize_with, NormalizeMethod};
use crate::web::{api_error, AppState};

#[derive(Deserialize)]
pub struct PredictRequest {
    pub input_text: String,
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub result: f64,
}

#[derive(Serialize)]
pub struct PreprocessResponse {
    pub processed_text: Vec<String>,
}

#[derive(Deserialize, Default)]
pub struct PreprocessQuery {
    /// `nltk` (default) or `spacy`; anything else falls back to nltk
    pub method: Option<String>,
}

pub async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<PredictRequest>,
) -> Response {
    match state.predictor.predict(&payload.input_text).await {
        Ok(result) => Json(PredictResponse { result }).into_response(),
        Err(e) => {
            error!(backend = state.predictor.name(), "Error while predicting: {e:#}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, &format!("{e:#}"))
        }
    }
}

pub async fn preprocess(
    Query(params): Query<PreprocessQuery>,
    Json(payload): Json<PredictRequest>,
) -> impl IntoResponse {
    let method = NormalizeMethod::from_param(params.method.as_deref());
    Json(PreprocessResponse {
        processed_text: normalize_with(&payload.input_text, method),
    })
}
