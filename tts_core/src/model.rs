//! Model handle: the loaded ONNX session, voice style embeddings and
//! the model token alphabet.
//!
//! The model is loaded once at process start and owned by the inference
//! session worker for the life of the process. Everything that executes
//! a chunk goes through [`InferenceBackend`], so tests can substitute a
//! deterministic backend without model weights.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use ndarray::{s, Array1, Array2, Axis};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use crate::{AudioSegment, PhonemeChunk, TtsError, TtsResult};

/// Width of one voice style embedding row.
pub const STYLE_DIM: usize = 256;

/// Executes one phoneme chunk against the loaded model.
///
/// Implementations are not required to be thread-safe; the inference
/// session serializes all calls.
pub trait InferenceBackend: Send {
    fn sample_rate(&self) -> u32;
    fn voices(&self) -> Vec<String>;
    fn synthesize_chunk(
        &mut self,
        chunk: &PhonemeChunk,
        voice: &str,
        speed: f32,
    ) -> TtsResult<AudioSegment>;
}

/// The model's input alphabet: phoneme and punctuation characters to
/// token ids. Characters outside this table cannot be spoken.
pub fn token_map() -> HashMap<char, i64> {
    let mut map = HashMap::new();
    for (id, c) in TOKEN_ALPHABET.chars().enumerate() {
        map.insert(c, id as i64);
    }
    map
}

pub fn model_alphabet() -> HashSet<char> {
    TOKEN_ALPHABET.chars().collect()
}

/// Token id equals the character's position in this string. Index 0 is
/// the pad token wrapped around every sequence.
const TOKEN_ALPHABET: &str = "$;:,.!?¡¿—…\"«»“” \
ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz\
ɑɐɒæɓʙβɔɕçɗɖðʤəɘɚɛɜɝɞɟʄɡɠɢʛɦɧħɥʜɨɪʝɭɬɫɮʟɱɯɰŋɳɲɴøɵɸθœɶʘɹɺɾɻʀʁɽʂʃʈʧʉʊʋⱱʌɣɤʍχʎʏʑʐʒʔʡʕʢǀǁǂǃˈˌːˑʼʴʰʱʲʷˠˤ˞↓↑→↗↘'̩'ᵻ";

/// ONNX inference backend for the neural TTS model.
pub struct OrtBackend {
    session: Session,
    voices: HashMap<String, Array2<f32>>,
    tokens: HashMap<char, i64>,
    sample_rate: u32,
}

impl OrtBackend {
    /// Load the model and voice archive. Called exactly once at process
    /// startup; errors here surface as a service-unavailable condition.
    pub fn load<P: AsRef<Path>>(model_path: P, voices_path: P, sample_rate: u32) -> TtsResult<Self> {
        let model_path = model_path.as_ref();
        let session = Session::builder()
            .map_err(load_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_err)?
            .commit_from_file(model_path)
            .map_err(|e| {
                TtsError::ModelUnavailable(format!(
                    "failed to load model {}: {e}",
                    model_path.display()
                ))
            })?;
        let voices = load_voice_styles(voices_path.as_ref())?;
        info!(
            model = %model_path.display(),
            voices = voices.len(),
            sample_rate,
            "loaded TTS model"
        );
        Ok(Self {
            session,
            voices,
            tokens: token_map(),
            sample_rate,
        })
    }

    fn style_for(&self, voice: &str, chunk: &PhonemeChunk) -> TtsResult<Array2<f32>> {
        let table = self
            .voices
            .get(voice)
            .ok_or_else(|| TtsError::Inference(format!("unknown voice '{voice}'")))?;
        // Style rows are indexed by source text length, clamped to the
        // embedding table.
        let text_len = if chunk.span.is_empty() {
            chunk.symbols.len()
        } else {
            chunk.span.chars().count()
        };
        let row = text_len.min(table.nrows().saturating_sub(1));
        Ok(table.slice(s![row..=row, ..]).to_owned())
    }
}

impl InferenceBackend for OrtBackend {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn voices(&self) -> Vec<String> {
        let mut names: Vec<String> = self.voices.keys().cloned().collect();
        names.sort();
        names
    }

    fn synthesize_chunk(
        &mut self,
        chunk: &PhonemeChunk,
        voice: &str,
        speed: f32,
    ) -> TtsResult<AudioSegment> {
        if chunk.symbols.is_empty() {
            return Err(TtsError::Inference(format!(
                "chunk {} has no phoneme symbols",
                chunk.index
            )));
        }

        let mut token_ids: Vec<i64> = Vec::with_capacity(chunk.symbols.len() + 2);
        for symbol in &chunk.symbols {
            for c in symbol.chars() {
                if let Some(id) = self.tokens.get(&c) {
                    token_ids.push(*id);
                }
            }
        }
        if token_ids.is_empty() {
            return Err(TtsError::Inference(format!(
                "chunk {} mapped to zero model tokens",
                chunk.index
            )));
        }
        // The model expects the pad token around the sequence.
        token_ids.insert(0, 0);
        token_ids.push(0);

        let style = self.style_for(voice, chunk)?;
        let input_ids: Array2<i64> = Array1::from(token_ids).insert_axis(Axis(0));

        let input_tensor = Tensor::from_array(input_ids).map_err(infer_err)?;
        let style_tensor = Tensor::from_array(style).map_err(infer_err)?;
        let speed_tensor =
            Tensor::from_array(Array1::from_vec(vec![speed.max(0.01)])).map_err(infer_err)?;

        let outputs = self
            .session
            .run(
                ort::inputs![
                    "input_ids" => input_tensor,
                    "style" => style_tensor,
                    "speed" => speed_tensor,
                ]
                .map_err(infer_err)?,
            )
            .map_err(infer_err)?;

        let waveform = outputs["waveform"]
            .try_extract_tensor::<f32>()
            .map_err(infer_err)?;
        let samples: Vec<f32> = waveform.iter().copied().collect();

        if samples.is_empty() {
            return Err(TtsError::Inference(format!(
                "model produced an empty waveform for chunk {}",
                chunk.index
            )));
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(TtsError::Inference(format!(
                "model produced non-finite samples for chunk {}",
                chunk.index
            )));
        }

        Ok(AudioSegment {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}

fn load_voice_styles(path: &Path) -> TtsResult<HashMap<String, Array2<f32>>> {
    let mut archive = npyz::npz::NpzArchive::open(path).map_err(|e| {
        TtsError::ModelUnavailable(format!(
            "failed to open voice archive {}: {e}",
            path.display()
        ))
    })?;
    let names: Vec<String> = archive.array_names().map(str::to_string).collect();

    let mut voices = HashMap::with_capacity(names.len());
    for name in names {
        let npy = archive
            .by_name(&name)
            .map_err(|e| TtsError::ModelUnavailable(format!("voice '{name}' unreadable: {e}")))?
            .ok_or_else(|| TtsError::ModelUnavailable(format!("voice '{name}' missing")))?;
        let values: Vec<f32> = npy
            .data::<f32>()
            .map_err(|e| TtsError::ModelUnavailable(format!("voice '{name}' has bad dtype: {e}")))?
            .collect::<Result<_, _>>()
            .map_err(|e| TtsError::ModelUnavailable(format!("voice '{name}' truncated: {e}")))?;

        if values.is_empty() || values.len() % STYLE_DIM != 0 {
            return Err(TtsError::ModelUnavailable(format!(
                "voice '{name}' embedding has invalid shape, expected rows of {STYLE_DIM}"
            )));
        }
        let rows = values.len() / STYLE_DIM;
        let table = Array2::from_shape_vec((rows, STYLE_DIM), values)
            .map_err(|e| TtsError::ModelUnavailable(e.to_string()))?;
        voices.insert(name, table);
    }

    if voices.is_empty() {
        return Err(TtsError::ModelUnavailable(format!(
            "voice archive {} contains no voices",
            path.display()
        )));
    }
    Ok(voices)
}

fn load_err<E: std::fmt::Display>(e: E) -> TtsError {
    TtsError::ModelUnavailable(e.to_string())
}

fn infer_err<E: std::fmt::Display>(e: E) -> TtsError {
    TtsError::Inference(e.to_string())
}
