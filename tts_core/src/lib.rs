//! Core text-to-speech pipeline.
//!
//! A request flows through fixed stages: text normalization,
//! phonemization, chunking, serialized model inference and audio
//! assembly. [`TtsEngine`] owns the whole pipeline; the server crate
//! wraps it in an HTTP surface.

pub mod audio;
pub mod chunk;
pub mod model;
pub mod normalize;
pub mod phonemize;
pub mod session;
pub mod wav;

use thiserror::Error;
use tracing::debug;

pub use model::{token_map, InferenceBackend, OrtBackend, STYLE_DIM};
pub use phonemize::{GraphemeBackend, LexiconBackend, PhonemeBackend, Phonemizer};
pub use session::SessionHandle;
pub use wav::encode_wav_pcm16;

/// One synthesis request after server-side validation.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: Option<String>,
    pub speed: f32,
}

/// A bounded run of phoneme symbols, the unit of model inference.
#[derive(Debug, Clone)]
pub struct PhonemeChunk {
    /// Position within the request, starting at 0.
    pub index: usize,
    pub symbols: Vec<String>,
    /// Source text the symbols came from; empty for continuation
    /// pieces of a split sentence.
    pub span: String,
}

/// Raw audio produced for one chunk.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Final output of the pipeline for one request.
#[derive(Debug)]
pub struct SynthesisResult {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_ms: u64,
    /// Sentences dropped because no phonemization backend could map
    /// them. Zero for a fully clean request.
    pub warnings: usize,
}

#[derive(Debug, Clone, Error)]
pub enum TtsError {
    #[error("normalization failed: {0}")]
    Normalization(String),
    #[error("phonemization failed: {0}")]
    Phonemization(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("audio assembly failed: {0}")]
    Assembly(String),
    #[error("synthesis timed out after {0} ms")]
    Timeout(u64),
}

pub type TtsResult<T> = Result<T, TtsError>;

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on phoneme symbols per inference chunk.
    pub max_chunk_symbols: usize,
    /// Linear cross-fade between adjacent chunk waveforms.
    pub crossfade_ms: u32,
    /// Voice used when a request does not name one.
    pub default_voice: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chunk_symbols: 400,
            crossfade_ms: 20,
            default_voice: "expr-voice-5-m".to_string(),
        }
    }
}

/// The assembled pipeline: shared by all requests, cheap to clone
/// behind an `Arc` at the server layer.
pub struct TtsEngine {
    phonemizer: Phonemizer,
    session: SessionHandle,
    voices: Vec<String>,
    sample_rate: u32,
    config: EngineConfig,
}

impl TtsEngine {
    pub fn new(
        backend: Box<dyn InferenceBackend>,
        phonemizer: Phonemizer,
        config: EngineConfig,
    ) -> Self {
        let voices = backend.voices();
        let sample_rate = backend.sample_rate();
        let session = SessionHandle::spawn(backend);
        Self {
            phonemizer,
            session,
            voices,
            sample_rate,
            config,
        }
    }

    pub fn voices(&self) -> &[String] {
        &self.voices
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn has_voice(&self, voice: &str) -> bool {
        self.voices.iter().any(|v| v == voice)
    }

    /// Run one request through the whole pipeline. Chunks of the same
    /// request are submitted in order and their results awaited in
    /// order, so concurrent requests interleave at chunk granularity
    /// without ever reordering within a request.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> TtsResult<SynthesisResult> {
        let voice = request
            .voice
            .clone()
            .unwrap_or_else(|| self.config.default_voice.clone());

        let normalized = normalize::normalize_text(&request.text)?;
        let phonemized = self.phonemizer.phonemize(&normalized)?;
        let chunks = chunk::chunk_sentences(&phonemized.sentences, self.config.max_chunk_symbols);
        debug!(
            sentences = phonemized.sentences.len(),
            dropped = phonemized.dropped_sentences,
            chunks = chunks.len(),
            voice = %voice,
            "pipeline front half complete"
        );

        let mut receivers = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            receivers.push(
                self.session
                    .submit(chunk, voice.clone(), request.speed)
                    .await?,
            );
        }

        let mut segments = Vec::with_capacity(receivers.len());
        for receiver in receivers {
            let segment = receiver.await.map_err(|_| {
                TtsError::ModelUnavailable("inference worker dropped a chunk".to_string())
            })??;
            segments.push(segment);
        }

        let samples = audio::assemble(&segments, self.sample_rate, self.config.crossfade_ms)?;
        let duration_ms = samples.len() as u64 * 1000 / self.sample_rate as u64;
        Ok(SynthesisResult {
            samples,
            sample_rate: self.sample_rate,
            duration_ms,
            warnings: phonemized.dropped_sentences,
        })
    }
}
