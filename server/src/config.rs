// Configuration constants for the server

use std::time::Duration;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub model_id: String,
    pub model_path: String,
    pub voices_path: String,
    pub lexicon_path: String,
    pub sample_rate: u32,
    pub default_voice: String,
    pub crossfade_ms: u32,
    pub max_text_length: usize,
    pub max_chunk_symbols: usize,
    pub synthesis_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub rate_limit_per_minute: u32,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            model_id: "kitten-tts-mini-0.8".to_string(),
            model_path: "models/kitten_tts.onnx".to_string(),
            voices_path: "models/voices.npz".to_string(),
            lexicon_path: "models/lexicon.txt".to_string(),
            sample_rate: 24000,
            default_voice: "alloy".to_string(),
            crossfade_ms: 20,
            max_text_length: 5000,
            max_chunk_symbols: 400,
            synthesis_timeout_secs: 30,
            request_timeout_secs: 60,
            rate_limit_per_minute: 60,
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let model_id = std::env::var("TTS_MODEL_ID").unwrap_or(defaults.model_id);
        let model_path = std::env::var("TTS_MODEL_PATH").unwrap_or(defaults.model_path);
        let voices_path = std::env::var("TTS_VOICES_PATH").unwrap_or(defaults.voices_path);
        let lexicon_path = std::env::var("TTS_LEXICON_PATH").unwrap_or(defaults.lexicon_path);

        let sample_rate = std::env::var("TTS_SAMPLE_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.sample_rate);

        let default_voice = std::env::var("DEFAULT_VOICE").unwrap_or(defaults.default_voice);

        let crossfade_ms = std::env::var("CROSSFADE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.crossfade_ms);

        let max_text_length = std::env::var("MAX_TEXT_LENGTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_text_length);

        let max_chunk_symbols = std::env::var("MAX_CHUNK_SYMBOLS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_chunk_symbols);

        let synthesis_timeout_secs = std::env::var("SYNTHESIS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.synthesis_timeout_secs);

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let rate_limit_per_minute = std::env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_per_minute);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| origins.split(',').map(|s| s.trim().to_string()).collect());

        Self {
            port,
            model_id,
            model_path,
            voices_path,
            lexicon_path,
            sample_rate,
            default_voice,
            crossfade_ms,
            max_text_length,
            max_chunk_symbols,
            synthesis_timeout_secs,
            request_timeout_secs,
            rate_limit_per_minute,
            cors_allowed_origins,
        }
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
