//! Chunking: pack per-sentence phoneme sequences into bounded-length
//! chunks that fit the model context window.
//!
//! Whole sentences are accumulated greedily. A single sentence longer
//! than the bound is split at phoneme-symbol boundaries; the resulting
//! prosody discontinuity at the split point is accepted. Output is
//! deterministic for a given input and bound.

use crate::phonemize::SentencePhonemes;
use crate::PhonemeChunk;

/// Symbol inserted between sentences that share a chunk.
const SENTENCE_SEPARATOR: &str = " ";

pub fn chunk_sentences(sentences: &[SentencePhonemes], max_symbols: usize) -> Vec<PhonemeChunk> {
    let max_symbols = max_symbols.max(1);
    let mut chunks: Vec<PhonemeChunk> = Vec::new();
    let mut symbols: Vec<String> = Vec::new();
    let mut spans: Vec<&str> = Vec::new();

    let mut flush = |symbols: &mut Vec<String>, spans: &mut Vec<&str>, chunks: &mut Vec<PhonemeChunk>| {
        if symbols.is_empty() {
            return;
        }
        chunks.push(PhonemeChunk {
            index: chunks.len(),
            symbols: std::mem::take(symbols),
            span: spans.join(" "),
        });
        spans.clear();
    };

    for sentence in sentences {
        if sentence.symbols.len() > max_symbols {
            flush(&mut symbols, &mut spans, &mut chunks);
            // Continuation chunks carry an empty span so that span
            // concatenation still reconstructs the sentence order.
            let mut first = true;
            for piece in sentence.symbols.chunks(max_symbols) {
                chunks.push(PhonemeChunk {
                    index: chunks.len(),
                    symbols: piece.to_vec(),
                    span: if first {
                        sentence.span.clone()
                    } else {
                        String::new()
                    },
                });
                first = false;
            }
            continue;
        }

        let needed = if symbols.is_empty() {
            sentence.symbols.len()
        } else {
            sentence.symbols.len() + 1
        };
        if !symbols.is_empty() && symbols.len() + needed > max_symbols {
            flush(&mut symbols, &mut spans, &mut chunks);
        }
        if !symbols.is_empty() {
            symbols.push(SENTENCE_SEPARATOR.to_string());
        }
        symbols.extend(sentence.symbols.iter().cloned());
        spans.push(&sentence.span);
    }
    flush(&mut symbols, &mut spans, &mut chunks);

    chunks
}
