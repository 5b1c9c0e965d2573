use std::io::Cursor;

use hound::{WavSpec, WavWriter};

use crate::AudioError;

/// Wrap mono 16-bit PCM samples in an in-memory WAV container, per the
/// transcription service's wire contract (16-bit PCM LE, mono, WAV-wrapped).
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| AudioError::WavEncodeError(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| AudioError::WavEncodeError(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::WavEncodeError(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_valid_riff_header() {
        let samples = vec![0i16, 100, -100, 32000];
        let bytes = encode_wav(&samples, 16000).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }
}
