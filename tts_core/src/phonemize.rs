//! Phonemization: normalized text to per-sentence phoneme symbol
//! sequences.
//!
//! Two backends satisfy the same contract. The primary backend is a
//! pronunciation lexicon lookup; the fallback passes graphemes that
//! exist in the model alphabet straight through. Fallback is scoped
//! per-sentence: one unsupported sentence does not push the whole
//! request onto the fallback path. A sentence neither backend can map
//! is dropped with a warning; the request only fails outright when no
//! sentence survives.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::{TtsError, TtsResult};

/// Phoneme symbols for one sentence, plus the source text span the
/// symbols were derived from.
#[derive(Debug, Clone)]
pub struct SentencePhonemes {
    pub symbols: Vec<String>,
    pub span: String,
}

/// Output of [`Phonemizer::phonemize`]: surviving sentences in input
/// order and the number of sentences dropped on the way.
#[derive(Debug)]
pub struct PhonemizedText {
    pub sentences: Vec<SentencePhonemes>,
    pub dropped_sentences: usize,
}

/// A linguistic backend: maps one sentence to phoneme symbols, or
/// reports the sentence as unsupported by returning `None`.
pub trait PhonemeBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn phonemize_sentence(&self, sentence: &str) -> Option<Vec<String>>;
}

pub struct Phonemizer {
    primary: Box<dyn PhonemeBackend>,
    fallback: Box<dyn PhonemeBackend>,
}

impl Phonemizer {
    pub fn new(primary: Box<dyn PhonemeBackend>, fallback: Box<dyn PhonemeBackend>) -> Self {
        Self { primary, fallback }
    }

    pub fn phonemize(&self, text: &str) -> TtsResult<PhonemizedText> {
        let spans = split_sentences(text);
        if spans.is_empty() {
            return Err(TtsError::Phonemization(
                "input contains no sentences".to_string(),
            ));
        }

        let mut sentences = Vec::with_capacity(spans.len());
        let mut dropped = 0usize;
        for span in spans {
            match select_backend(self.primary.as_ref(), self.fallback.as_ref(), &span) {
                Some(symbols) => sentences.push(SentencePhonemes { symbols, span }),
                None => {
                    warn!(
                        primary = self.primary.name(),
                        fallback = self.fallback.name(),
                        sentence = %span,
                        "no backend could phonemize sentence, dropping it"
                    );
                    dropped += 1;
                }
            }
        }

        if sentences.is_empty() {
            return Err(TtsError::Phonemization(format!(
                "all {dropped} sentences failed to phonemize"
            )));
        }
        Ok(PhonemizedText {
            sentences,
            dropped_sentences: dropped,
        })
    }
}

/// Pure backend selection: the primary's answer wins, the fallback is
/// consulted only for sentences the primary reports as unsupported.
fn select_backend(
    primary: &dyn PhonemeBackend,
    fallback: &dyn PhonemeBackend,
    sentence: &str,
) -> Option<Vec<String>> {
    primary
        .phonemize_sentence(sentence)
        .or_else(|| fallback.phonemize_sentence(sentence))
}

/// Split text at sentence/clause boundaries, keeping the terminal
/// punctuation with its sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | ';') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

enum Token {
    Word(String),
    Punct(char),
}

fn tokenize(sentence: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in sentence.chars() {
        if c.is_alphabetic() || c == '\'' {
            word.push(c);
        } else {
            if !word.is_empty() {
                tokens.push(Token::Word(std::mem::take(&mut word)));
            }
            if !c.is_whitespace() {
                tokens.push(Token::Punct(c));
            }
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}

/// Primary backend: word-by-word lookup in a pronunciation lexicon
/// (word to IPA). A sentence containing any word the lexicon does not
/// know is unsupported as a whole.
pub struct LexiconBackend {
    entries: HashMap<String, String>,
}

impl LexiconBackend {
    pub fn from_file<P: AsRef<Path>>(path: P) -> TtsResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            TtsError::ModelUnavailable(format!("failed to read lexicon {}: {e}", path.display()))
        })?;
        let backend = Self::parse(&raw);
        if backend.entries.is_empty() {
            return Err(TtsError::ModelUnavailable(format!(
                "lexicon {} contains no entries",
                path.display()
            )));
        }
        Ok(backend)
    }

    pub fn from_entries(pairs: &[(&str, &str)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(word, phones)| (word.to_lowercase(), phones.to_string()))
                .collect(),
        }
    }

    /// One entry per line: `word<ws>phones`. Lines starting with `;` or
    /// `#` are comments.
    fn parse(raw: &str) -> Self {
        let mut entries = HashMap::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some((word, phones)) = line.split_once(char::is_whitespace) {
                let phones = phones.trim();
                if !phones.is_empty() {
                    entries.insert(word.to_lowercase(), phones.to_string());
                }
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PhonemeBackend for LexiconBackend {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn phonemize_sentence(&self, sentence: &str) -> Option<Vec<String>> {
        let mut symbols: Vec<String> = Vec::new();
        for token in tokenize(sentence) {
            match token {
                Token::Word(word) => {
                    let phones = self.entries.get(&word.to_lowercase())?;
                    if symbols.last().is_some_and(|s| s != " ") {
                        symbols.push(" ".to_string());
                    }
                    symbols.extend(phones.chars().map(|c| c.to_string()));
                }
                Token::Punct(c) => symbols.push(c.to_string()),
            }
        }
        if symbols.is_empty() {
            return None;
        }
        Some(symbols)
    }
}

/// Fallback backend: pass characters of the model alphabet through as
/// symbols. Unsupported when the sentence has no mappable letters at
/// all (e.g. a script the model was never trained on).
pub struct GraphemeBackend {
    alphabet: HashSet<char>,
}

impl GraphemeBackend {
    pub fn new(alphabet: HashSet<char>) -> Self {
        Self { alphabet }
    }

    /// Alphabet of the bundled model.
    pub fn for_model() -> Self {
        Self::new(crate::model::model_alphabet())
    }
}

impl PhonemeBackend for GraphemeBackend {
    fn name(&self) -> &'static str {
        "grapheme"
    }

    fn phonemize_sentence(&self, sentence: &str) -> Option<Vec<String>> {
        let mut symbols: Vec<String> = Vec::new();
        let mut mapped_letters = 0usize;
        for c in sentence.chars() {
            if c.is_whitespace() {
                if symbols.last().is_some_and(|s| s != " ") {
                    symbols.push(" ".to_string());
                }
                continue;
            }
            let candidate = if self.alphabet.contains(&c) {
                Some(c)
            } else {
                let lower = c.to_lowercase().next().unwrap_or(c);
                self.alphabet.contains(&lower).then_some(lower)
            };
            if let Some(mapped) = candidate {
                if mapped.is_alphabetic() {
                    mapped_letters += 1;
                }
                symbols.push(mapped.to_string());
            }
        }
        if mapped_letters == 0 {
            return None;
        }
        Some(symbols)
    }
}
