// Sentiment classification and topic grouping.
//
// POST /classification/classify          label one text
// POST /classification/train             retrain from the sentiment corpus
// POST /classification/group_sentences   group sentences by topic label
//
// Retraining happens off the runtime and outside the classifier lock; the new
// pipeline is swapped in only after it has been fitted and persisted. Retrains
// are serialized so the artifact on disk and the live pipeline always come
// from the same fit.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::models::classifier::train_classifier;
use crate::models::{ArtifactKind, ArtifactStore};
use crate::web::{api_error, AppState};

#[derive(Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct TextResponse {
    pub text: String,
    pub label: String,
}

#[derive(Serialize)]
pub struct TrainResponse {
    pub accuracy: f64,
}

#[derive(Deserialize)]
pub struct SentencesRequest {
    pub sentences: Vec<String>,
}

#[derive(Serialize)]
pub struct GroupsResponse {
    pub groups: IndexMap<String, Vec<String>>,
}

pub async fn classify(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> impl IntoResponse {
    let pipeline = state.classifier.current().await;
    let label = pipeline.predict(&request.text);
    Json(TextResponse {
        text: request.text,
        label,
    })
}

pub async fn train(State(state): State<AppState>) -> Response {
    let _guard = state.train_lock.lock().await;
    let corpus = state.config.sentiment_corpus.clone();
    let out = ArtifactStore::new(&state.config.artifact_dir).path_of(ArtifactKind::Classifier);

    let result = tokio::task::spawn_blocking(move || train_classifier(&corpus, &out)).await;
    match result {
        Ok(Ok((pipeline, report))) => {
            state.classifier.replace(pipeline).await;
            let accuracy = report.metric.map(|m| m.value).unwrap_or(0.0);
            info!("Classifier retrained, accuracy: {accuracy:.2}");
            Json(TrainResponse { accuracy }).into_response()
        }
        Ok(Err(e)) => {
            error!("Error while training model: {e:#}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, &format!("{e:#}"))
        }
        Err(e) => {
            error!("Training task failed: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Training task failed")
        }
    }
}

pub async fn group_sentences(
    State(state): State<AppState>,
    Json(request): Json<SentencesRequest>,
) -> Response {
    let grouper = state.grouper.clone();
    let result = tokio::task::spawn_blocking(move || grouper.group(&request.sentences)).await;
    match result {
        Ok(grouping) => Json(GroupsResponse {
            groups: grouping.groups,
        })
        .into_response(),
        Err(e) => {
            error!("Error while grouping sentences: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Grouping task failed")
        }
    }
}
