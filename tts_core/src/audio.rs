//! Audio assembly: merge per-chunk segments into one continuous
//! waveform.
//!
//! Adjacent segments are blended with a short linear cross-fade to mask
//! model-induced splice artifacts. Silence is trimmed from the edges of
//! the final buffer only; interior chunk boundaries keep their natural
//! pauses.

use crate::{AudioSegment, TtsError, TtsResult};

/// Amplitude below which a sample counts as silence for edge trimming.
const SILENCE_FLOOR: f32 = 1e-4;

pub fn assemble(
    segments: &[AudioSegment],
    sample_rate: u32,
    crossfade_ms: u32,
) -> TtsResult<Vec<f32>> {
    if segments.is_empty() {
        return Err(TtsError::Assembly("no audio segments to merge".to_string()));
    }
    for (index, segment) in segments.iter().enumerate() {
        if segment.samples.is_empty() {
            return Err(TtsError::Assembly(format!(
                "segment {index} has zero samples"
            )));
        }
        if segment.sample_rate != sample_rate {
            return Err(TtsError::Assembly(format!(
                "segment {index} has sample rate {} but the output rate is {sample_rate}",
                segment.sample_rate
            )));
        }
    }

    let fade_samples = (sample_rate as usize * crossfade_ms as usize) / 1000;
    let mut merged = segments[0].samples.clone();
    for segment in &segments[1..] {
        crossfade_append(&mut merged, &segment.samples, fade_samples);
    }

    // Peak-limit rather than rescale quiet audio upward.
    let peak = merged.iter().fold(0.0f32, |max, s| max.max(s.abs()));
    if peak > 1.0 {
        for sample in &mut merged {
            *sample /= peak;
        }
    }

    trim_edge_silence(&mut merged);
    Ok(merged)
}

/// Append `next` to `merged`, linearly blending the last `fade` samples
/// of `merged` with the first `fade` samples of `next`.
fn crossfade_append(merged: &mut Vec<f32>, next: &[f32], fade: usize) {
    let fade = fade.min(merged.len()).min(next.len());
    let base = merged.len() - fade;
    for i in 0..fade {
        let t = (i + 1) as f32 / (fade + 1) as f32;
        merged[base + i] = merged[base + i] * (1.0 - t) + next[i] * t;
    }
    merged.extend_from_slice(&next[fade..]);
}

fn trim_edge_silence(samples: &mut Vec<f32>) {
    let Some(first) = samples.iter().position(|s| s.abs() > SILENCE_FLOOR) else {
        // All-silent output stays as-is; an empty result would look
        // like a missing response.
        return;
    };
    let last = samples
        .iter()
        .rposition(|s| s.abs() > SILENCE_FLOOR)
        .unwrap_or(samples.len() - 1);
    samples.drain(last + 1..);
    samples.drain(..first);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(samples: Vec<f32>) -> AudioSegment {
        AudioSegment {
            samples,
            sample_rate: 1000,
        }
    }

    #[test]
    fn test_single_segment_passes_through() {
        let merged = assemble(&[segment(vec![0.5; 100])], 1000, 20).unwrap();
        assert_eq!(merged.len(), 100);
    }

    #[test]
    fn test_crossfade_shortens_by_overlap() {
        // 20 ms at 1 kHz = 20 samples of overlap per boundary.
        let segments = vec![
            segment(vec![0.5; 100]),
            segment(vec![0.5; 100]),
            segment(vec![0.5; 100]),
        ];
        let merged = assemble(&segments, 1000, 20).unwrap();
        assert_eq!(merged.len(), 300 - 2 * 20);
    }

    #[test]
    fn test_crossfade_blends_linearly() {
        let mut merged = vec![1.0; 10];
        crossfade_append(&mut merged, &vec![0.0; 10], 4);
        // Blend region ramps from mostly-first to mostly-second.
        assert_eq!(merged.len(), 16);
        assert!(merged[6] > merged[7]);
        assert!(merged[7] > merged[8]);
        assert!(merged[8] > merged[9]);
        assert_eq!(merged[10], 0.0);
    }

    #[test]
    fn test_trims_edges_but_not_interior() {
        let mut first = vec![0.0; 30];
        first.extend(vec![0.5; 50]);
        let mut second = vec![0.5; 20];
        // Interior pause that must survive.
        second.extend(vec![0.0; 40]);
        second.extend(vec![0.5; 20]);
        second.extend(vec![0.0; 30]);
        let merged = assemble(&[segment(first), segment(second)], 1000, 0).unwrap();
        assert!(merged.first().is_some_and(|s| s.abs() > SILENCE_FLOOR));
        assert!(merged.last().is_some_and(|s| s.abs() > SILENCE_FLOOR));
        assert!(merged.iter().any(|s| s.abs() <= SILENCE_FLOOR));
    }

    #[test]
    fn test_peak_limiting() {
        let merged = assemble(&[segment(vec![2.0, -2.0, 1.0])], 1000, 0).unwrap();
        let peak = merged.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= 1.0 + f32::EPSILON);
    }

    #[test]
    fn test_duration_monotonicity() {
        let base = vec![
            segment(vec![0.5; 90]),
            segment(vec![0.5; 70]),
        ];
        let extended = {
            let mut v = base.clone();
            v.push(segment(vec![0.5; 40]));
            v
        };
        let short = assemble(&base, 1000, 20).unwrap();
        let long = assemble(&extended, 1000, 20).unwrap();
        assert!(long.len() >= short.len());
    }

    #[test]
    fn test_zero_length_segment_is_an_error() {
        let err = assemble(&[segment(vec![])], 1000, 20).unwrap_err();
        assert!(matches!(err, TtsError::Assembly(_)));
    }

    #[test]
    fn test_sample_rate_mismatch_is_an_error() {
        let odd = AudioSegment {
            samples: vec![0.5; 10],
            sample_rate: 8000,
        };
        let err = assemble(&[segment(vec![0.5; 10]), odd], 1000, 20).unwrap_err();
        assert!(matches!(err, TtsError::Assembly(_)));
    }

    #[test]
    fn test_no_segments_is_an_error() {
        assert!(assemble(&[], 1000, 20).is_err());
    }
}
