// POST /mistral/query/: instruct-model completion for a prompt.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::web::{api_error, AppState};

pub const DEFAULT_MAX_NEW_TOKENS: u32 = 64;

fn default_max_new_tokens() -> u32 {
    DEFAULT_MAX_NEW_TOKENS
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub response: String,
}

pub async fn query(State(state): State<AppState>, Json(request): Json<QueryRequest>) -> Response {
    match state
        .generator
        .generate(&request.prompt, request.max_new_tokens)
        .await
    {
        Ok(response) => Json(QueryResponse { response }).into_response(),
        Err(e) => {
            error!("Error while generating text: {e:#}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, &format!("{e:#}"))
        }
    }
}
