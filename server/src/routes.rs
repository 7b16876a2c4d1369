//! OpenAI-compatible HTTP surface over the synthesis engine.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use tts_core::{SynthesisRequest, TtsEngine, TtsError};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::validation::{validate_response_format, validate_speech_text, validate_speed};

/// Sentences dropped during phonemization are reported out-of-band so
/// the audio body stays a plain WAV file.
pub const WARNINGS_HEADER: &str = "x-synthesis-warnings";

/// OpenAI voice aliases mapped onto native voice names.
const VOICE_ALIASES: &[(&str, &str)] = &[
    ("alloy", "expr-voice-2-m"),
    ("echo", "expr-voice-3-m"),
    ("fable", "expr-voice-2-f"),
    ("onyx", "expr-voice-4-m"),
    ("nova", "expr-voice-3-f"),
    ("shimmer", "expr-voice-4-f"),
];

#[derive(Clone)]
pub struct AppState {
    /// `None` when model loading failed at startup; requests then get
    /// a service-unavailable response instead of a crash.
    pub engine: Option<Arc<TtsEngine>>,
    pub config: ServerConfig,
}

#[derive(Deserialize)]
pub struct SpeechRequest {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(alias = "text")]
    pub input: String,
    /// Falls back to the configured default voice when omitted.
    pub voice: Option<String>,
    #[serde(default = "default_format")]
    pub response_format: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_model() -> String {
    "tts-1".to_string()
}

fn default_format() -> String {
    "wav".to_string()
}

fn default_speed() -> f32 {
    1.0
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub ready: bool,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/v1/models", get(list_models))
        .route("/v1/audio/voices", get(list_voices))
        .route("/v1/audio/speech", post(audio_speech))
        .with_state(state)
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.config.model_id.clone(),
        ready: state.engine.is_some(),
    })
}

pub async fn list_models() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "object": "list",
        "data": [
            { "id": "tts-1", "object": "model" },
            { "id": "tts-1-hd", "object": "model" },
        ],
    }))
}

pub async fn list_voices(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let engine = require_engine(&state)?;
    Ok(Json(serde_json::json!({ "voices": engine.voices() })))
}

pub async fn audio_speech(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = require_engine(&state)?;

    validate_speech_text(&req.input, state.config.max_text_length)?;
    validate_response_format(&req.response_format)?;
    validate_speed(req.speed)?;

    let requested = req
        .voice
        .as_deref()
        .unwrap_or(&state.config.default_voice);
    let voice = resolve_voice(requested);
    if !engine.has_voice(&voice) {
        return Err(ApiError::InvalidInput(format!(
            "Unknown voice: {requested}"
        )));
    }
    let speed = req.speed.clamp(0.25, 4.0);

    let request = SynthesisRequest {
        text: req.input,
        voice: Some(voice),
        speed,
    };
    let timeout = state.config.synthesis_timeout();
    let result = tokio::time::timeout(timeout, engine.synthesize(&request))
        .await
        .map_err(|_| TtsError::Timeout(timeout.as_millis() as u64))??;

    info!(
        duration_ms = result.duration_ms,
        warnings = result.warnings,
        sample_rate = result.sample_rate,
        "synthesized speech"
    );

    let wav = tts_core::encode_wav_pcm16(&result.samples, result.sample_rate)?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("audio/wav")),
            (
                HeaderName::from_static(WARNINGS_HEADER),
                HeaderValue::from(result.warnings as u64),
            ),
        ],
        wav,
    ))
}

fn require_engine(state: &AppState) -> Result<&Arc<TtsEngine>, ApiError> {
    state
        .engine
        .as_ref()
        .ok_or_else(|| ApiError::Tts(TtsError::ModelUnavailable("model not loaded".to_string())))
}

/// Map an OpenAI alias to its native voice; unknown names pass through
/// unchanged and are checked against the loaded voice list.
pub fn resolve_voice(requested: &str) -> String {
    let lower = requested.to_lowercase();
    VOICE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, native)| native.to_string())
        .unwrap_or(lower)
}
