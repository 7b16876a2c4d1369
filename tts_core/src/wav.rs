//! WAV container encoding for the final waveform.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{TtsError, TtsResult};

/// Encode mono f32 samples as a 16-bit PCM WAV file in memory.
pub fn encode_wav_pcm16(samples: &[f32], sample_rate: u32) -> TtsResult<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(wav_err)?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer
                .write_sample((clamped * i16::MAX as f32) as i16)
                .map_err(wav_err)?;
        }
        writer.finalize().map_err(wav_err)?;
    }
    Ok(cursor.into_inner())
}

fn wav_err(e: hound::Error) -> TtsError {
    TtsError::Assembly(format!("WAV encoding failed: {e}"))
}
