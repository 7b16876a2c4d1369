//! Common utilities for integration tests

use std::sync::Arc;

use axum::Router;
use server::config::ServerConfig;
use server::routes::{app, AppState};
use tts_core::{
    AudioSegment, EngineConfig, GraphemeBackend, InferenceBackend, LexiconBackend, PhonemeChunk,
    Phonemizer, TtsEngine, TtsError, TtsResult,
};

/// Deterministic inference backend: a short constant-amplitude tone per
/// phoneme symbol, with the full native voice set.
pub struct MockBackend;

const NATIVE_VOICES: &[&str] = &[
    "expr-voice-2-m",
    "expr-voice-2-f",
    "expr-voice-3-m",
    "expr-voice-3-f",
    "expr-voice-4-m",
    "expr-voice-4-f",
    "expr-voice-5-m",
    "expr-voice-5-f",
];

impl InferenceBackend for MockBackend {
    fn sample_rate(&self) -> u32 {
        24000
    }

    fn voices(&self) -> Vec<String> {
        NATIVE_VOICES.iter().map(|v| v.to_string()).collect()
    }

    fn synthesize_chunk(
        &mut self,
        chunk: &PhonemeChunk,
        _voice: &str,
        _speed: f32,
    ) -> TtsResult<AudioSegment> {
        if chunk.symbols.is_empty() {
            return Err(TtsError::Inference("empty phoneme chunk".to_string()));
        }
        Ok(AudioSegment {
            samples: vec![0.25; chunk.symbols.len() * 100],
            sample_rate: 24000,
        })
    }
}

fn test_phonemizer() -> Phonemizer {
    let lexicon = LexiconBackend::from_entries(&[
        ("hello", "həlˈoʊ"),
        ("this", "ðɪs"),
        ("is", "ɪz"),
        ("a", "ɐ"),
        ("test", "tˈɛst"),
        ("i", "aɪ"),
        ("have", "hæv"),
        ("three", "θɹiː"),
        ("apples", "æpəlz"),
    ]);
    Phonemizer::new(Box::new(lexicon), Box::new(GraphemeBackend::for_model()))
}

/// Create a test app instance backed by the mock model
pub fn create_test_app() -> Router {
    create_test_app_with(ServerConfig::default())
}

/// Create a test app instance with the pipeline knobs taken from the
/// given configuration, as the binary wires them at startup
pub fn create_test_app_with(config: ServerConfig) -> Router {
    let engine = TtsEngine::new(
        Box::new(MockBackend),
        test_phonemizer(),
        EngineConfig {
            max_chunk_symbols: config.max_chunk_symbols,
            crossfade_ms: config.crossfade_ms,
            default_voice: server::routes::resolve_voice(&config.default_voice),
        },
    );
    app(AppState {
        engine: Some(Arc::new(engine)),
        config,
    })
}

/// Inference backend that takes longer than any test deadline.
pub struct StallingBackend;

impl InferenceBackend for StallingBackend {
    fn sample_rate(&self) -> u32 {
        24000
    }

    fn voices(&self) -> Vec<String> {
        NATIVE_VOICES.iter().map(|v| v.to_string()).collect()
    }

    fn synthesize_chunk(
        &mut self,
        chunk: &PhonemeChunk,
        _voice: &str,
        _speed: f32,
    ) -> TtsResult<AudioSegment> {
        std::thread::sleep(std::time::Duration::from_secs(5));
        Ok(AudioSegment {
            samples: vec![0.25; chunk.symbols.len().max(1) * 100],
            sample_rate: 24000,
        })
    }
}

/// Create a test app whose synthesis deadline always expires
pub fn create_stalling_app() -> Router {
    let engine = TtsEngine::new(
        Box::new(StallingBackend),
        test_phonemizer(),
        EngineConfig::default(),
    );
    app(AppState {
        engine: Some(Arc::new(engine)),
        config: ServerConfig {
            synthesis_timeout_secs: 1,
            ..ServerConfig::default()
        },
    })
}

/// Create a test app instance where model loading failed at startup
pub fn create_unready_app() -> Router {
    app(AppState {
        engine: None,
        config: ServerConfig::default(),
    })
}
