use anyhow::{Context, Result};
use axum::async_trait;
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::extractors::{validate_url, MediaInfo};
use crate::transcribe::engine::WhisperEngine;
use crate::transcribe::model::{ensure_model, ModelKind};
use crate::transcribe::{TranscriptSegment, TranscriptionPipeline, TranscriptionResult};

/// Error responses are JSON bodies with an HTTP status
type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, err: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": err.to_string() })))
}

/// Json extractor whose rejections use the API error shape instead of
/// axum's plain-text bodies.
struct ApiJson<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(api_error(rejection.status(), rejection.body_text())),
        }
    }
}

/// Shared state behind the web handlers.
///
/// The loaded engine is cached so repeated requests reuse the model. The
/// mutex also serializes inference, which keeps a small machine from
/// loading several whisper runs at once.
pub struct AppState {
    config: Config,
    engine: Mutex<Option<Arc<WhisperEngine>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            engine: Mutex::new(None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    url: String,
    language: Option<String>,
    model: Option<String>,
}

/// Flat body returned by the transcribe endpoint
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
    pub title: String,
    pub duration_seconds: Option<f64>,
    pub model: String,
    pub language: String,
    pub elapsed_seconds: f64,
    pub segments: Vec<TranscriptSegment>,
}

impl From<TranscriptionResult> for TranscribeResponse {
    fn from(result: TranscriptionResult) -> Self {
        Self {
            transcript: result.transcript,
            title: result.media.title,
            // The duration measured from the decoded samples beats the
            // probe metadata when both are known
            duration_seconds: result
                .metadata
                .audio_duration
                .or(result.media.duration_seconds),
            model: result.metadata.model,
            language: result.metadata.language,
            elapsed_seconds: result.metadata.processing_duration,
            segments: result.segments,
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .route("/api/transcribe", post(transcribe_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn info_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InfoQuery>,
) -> std::result::Result<Json<MediaInfo>, ApiError> {
    validate_url(&query.url).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let pipeline = TranscriptionPipeline::new(state.config.clone())
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let media = pipeline
        .probe(&query.url)
        .await
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e))?;

    Ok(Json(media))
}

async fn transcribe_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TranscribeRequest>,
) -> std::result::Result<Json<TranscribeResponse>, ApiError> {
    validate_url(&request.url).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let model_name = request
        .model
        .as_deref()
        .unwrap_or(&state.config.whisper.model);
    let model = ModelKind::from_str(model_name)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    // Held for the whole request so only one transcription runs at a time
    let mut engine_slot = state.engine.lock().await;

    let engine = match engine_slot.as_ref() {
        Some(engine) if engine.model() == model => Arc::clone(engine),
        _ => {
            let engine = load_engine(&state.config, model)
                .await
                .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
            *engine_slot = Some(Arc::clone(&engine));
            engine
        }
    };

    let pipeline = TranscriptionPipeline::new(state.config.clone())
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let language = request
        .language
        .as_deref()
        .unwrap_or(&state.config.whisper.language);

    info!("Web request to transcribe: {}", request.url);

    let result = pipeline
        .transcribe_url(&request.url, engine, language, None)
        .await
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e))?;

    Ok(Json(result.into()))
}

/// Download the model if needed and load it off the async runtime
async fn load_engine(config: &Config, model: ModelKind) -> Result<Arc<WhisperEngine>> {
    let model_dir = config.model_dir()?;
    let model_path = ensure_model(model, &model_dir).await?;

    let device = config.whisper.device;
    let threads = config.whisper.threads;

    let engine = tokio::task::spawn_blocking(move || {
        WhisperEngine::load(&model_path, model, device, threads)
    })
    .await
    .context("Model loading task panicked")??;

    Ok(Arc::new(engine))
}

/// The web server wrapping the router
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn start(self) -> Result<()> {
        let bind_addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let state = Arc::new(AppState::new(self.config));
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", bind_addr))?;

        info!("Web UI listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app.into_make_service())
            .await
            .context("Web server exited")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::TranscriptionMetadata;

    fn sample_result() -> TranscriptionResult {
        TranscriptionResult {
            transcript: "Hello there.".to_string(),
            segments: vec![TranscriptSegment {
                start_time: 0.0,
                end_time: 1.5,
                text: "Hello there.".to_string(),
            }],
            media: MediaInfo {
                title: "Greeting".to_string(),
                duration_seconds: Some(2.0),
                thumbnail_url: None,
                format: None,
                original_url: "https://example.com/v".to_string(),
            },
            audio_path: None,
            metadata: TranscriptionMetadata {
                model: "base".to_string(),
                language: "en".to_string(),
                audio_duration: Some(1.6),
                processing_duration: 0.4,
                completed_at: chrono::Utc::now(),
            },
        }
    }

    #[test]
    fn test_transcribe_response_is_flat() {
        let response = TranscribeResponse::from(sample_result());
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["transcript"], "Hello there.");
        assert_eq!(value["title"], "Greeting");
        assert_eq!(value["duration_seconds"], 1.6);
        assert_eq!(value["model"], "base");
        assert_eq!(value["language"], "en");
        assert_eq!(value["elapsed_seconds"], 0.4);
        assert_eq!(value["segments"][0]["text"], "Hello there.");
        assert!(value.get("media").is_none());
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_transcribe_response_falls_back_to_probed_duration() {
        let mut result = sample_result();
        result.metadata.audio_duration = None;

        let response = TranscribeResponse::from(result);

        assert_eq!(response.duration_seconds, Some(2.0));
    }
}
