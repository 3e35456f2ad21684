// HTTP server: Axum JSON API over the loaded models.
//
// Every route is stateless apart from the live classifier, which
// `/classification/train` can swap out. CPU-heavy work (grouping, training)
// is pushed onto the blocking pool so the runtime keeps serving requests.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::generate::{HuggingFaceGenerator, NoopGenerator, TextGenerator};
use crate::models::bootstrap::LoadedModels;
use crate::models::classifier::SharedClassifier;
use crate::predict::onnx::OnnxPredictor;
use crate::predict::sentiment::SentimentScorePredictor;
use crate::predict::Predictor;
use crate::topics::TopicGrouper;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub classifier: SharedClassifier,
    pub grouper: Arc<TopicGrouper>,
    pub predictor: Arc<dyn Predictor>,
    pub generator: Arc<dyn TextGenerator>,
    /// Held for the whole fit, persist and swap of a retrain, so overlapping
    /// `/classification/train` calls run one after the other.
    pub train_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Wire the loaded models into handler state, picking the predictor and
    /// generator backends from config.
    pub fn from_models(config: Config, models: LoadedModels) -> Result<Self> {
        let classifier = SharedClassifier::new(models.classifier);
        let grouper = Arc::new(TopicGrouper::new(models.embeddings, models.topics));

        let predictor: Arc<dyn Predictor> = if config.predict_model_present() {
            Arc::new(OnnxPredictor::load(&config.model_path)?)
        } else {
            info!(
                path = %config.model_path.display(),
                "No ONNX model found, /predict uses the sentiment classifier"
            );
            Arc::new(SentimentScorePredictor::new(classifier.clone()))
        };

        let generator: Arc<dyn TextGenerator> = if config.huggingface_token.is_empty() {
            info!("HUGGINGFACE_TOKEN not set, text generation disabled");
            Arc::new(NoopGenerator)
        } else {
            Arc::new(HuggingFaceGenerator::new(
                config.generator_url.clone(),
                config.huggingface_token.clone(),
            ))
        };

        Ok(Self {
            config: Arc::new(config),
            classifier,
            grouper,
            predictor,
            generator,
            train_lock: Arc::new(Mutex::new(())),
        })
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(state: AppState, port: u16, bind: &str) -> Result<()> {
    let name = state.config.project_name.clone();
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("{name} listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let prefix = state.config.api_v1_str.trim_end_matches('/').to_string();

    Router::new()
        .route("/healthz", get(health))
        .route(&format!("{prefix}/predict"), post(handlers::api::predict))
        .route(&format!("{prefix}/preprocess"), post(handlers::api::preprocess))
        .route(
            "/classification/classify",
            post(handlers::classification::classify),
        )
        .route("/classification/train", post(handlers::classification::train))
        .route(
            "/classification/group_sentences",
            post(handlers::classification::group_sentences),
        )
        .route("/similarity", post(handlers::similarity::similarity))
        .route("/mistral/query/", post(handlers::mistral::query))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe: always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
