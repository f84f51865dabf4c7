// Chunk encoders turn a run of PCM samples into the opaque payload sent to
// the transcription endpoint. Support can be queried before use; when the
// requested encoding is unavailable the factory falls back to the default
// exactly once before giving up.

use std::io::Cursor;
use tracing::warn;

use crate::error::EncodeError;

/// Raw little-endian 16-bit PCM; payloads are concatenation-safe
pub const PCM_ENCODING: &str = "audio/pcm;codec=s16le";
/// RIFF/WAV with a 16-bit PCM payload
pub const WAV_ENCODING: &str = "audio/wav";
/// Encoding used when the requested one is unsupported
pub const FALLBACK_ENCODING: &str = WAV_ENCODING;

/// Encoder facility boundary
pub trait ChunkEncoder: Send + Sync {
    /// Media encoding identifier declared on produced chunks
    fn encoding(&self) -> &'static str;

    fn encode(
        &self,
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
    ) -> Result<Vec<u8>, EncodeError>;
}

/// Raw PCM encoder
pub struct PcmChunkEncoder;

impl ChunkEncoder for PcmChunkEncoder {
    fn encoding(&self) -> &'static str {
        PCM_ENCODING
    }

    fn encode(
        &self,
        samples: &[i16],
        _sample_rate: u32,
        _channels: u16,
    ) -> Result<Vec<u8>, EncodeError> {
        Ok(samples.iter().flat_map(|s| s.to_le_bytes()).collect())
    }
}

/// WAV encoder backed by hound
pub struct WavChunkEncoder;

impl ChunkEncoder for WavChunkEncoder {
    fn encoding(&self) -> &'static str {
        WAV_ENCODING
    }

    fn encode(
        &self,
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
    ) -> Result<Vec<u8>, EncodeError> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }
}

/// Chunk encoder factory
pub struct ChunkEncoderFactory;

impl ChunkEncoderFactory {
    pub fn is_supported(encoding: &str) -> bool {
        matches!(encoding, PCM_ENCODING | WAV_ENCODING)
    }

    pub fn create(encoding: &str) -> Option<Box<dyn ChunkEncoder>> {
        match encoding {
            PCM_ENCODING => Some(Box::new(PcmChunkEncoder)),
            WAV_ENCODING => Some(Box::new(WavChunkEncoder)),
            _ => None,
        }
    }

    /// Resolve the requested encoding, falling back once to the default
    pub fn negotiate(requested: &str) -> Result<Box<dyn ChunkEncoder>, EncodeError> {
        if let Some(encoder) = Self::create(requested) {
            return Ok(encoder);
        }

        warn!(
            "Chunk encoding {} unsupported, falling back to {}",
            requested, FALLBACK_ENCODING
        );

        Self::create(FALLBACK_ENCODING).ok_or_else(|| EncodeError::Unsupported {
            requested: requested.to_string(),
            fallback: FALLBACK_ENCODING.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_pcm_encode_little_endian() {
        let encoder = PcmChunkEncoder;
        let bytes = encoder.encode(&[1, -1, 256], 16000, 1).unwrap();

        assert_eq!(bytes, vec![1, 0, 255, 255, 0, 1]);
    }

    #[test]
    fn test_wav_encode_roundtrip() {
        let encoder = WavChunkEncoder;
        let samples: Vec<i16> = (0..1600).map(|i| (i % 100) as i16).collect();
        let bytes = encoder.encode(&samples, 16000, 1).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);

        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_negotiate_supported_encoding() {
        let encoder = ChunkEncoderFactory::negotiate(PCM_ENCODING).unwrap();
        assert_eq!(encoder.encoding(), PCM_ENCODING);
    }

    #[test]
    fn test_negotiate_falls_back_to_default() {
        let encoder = ChunkEncoderFactory::negotiate("audio/webm;codecs=opus").unwrap();
        assert_eq!(encoder.encoding(), FALLBACK_ENCODING);
    }

    #[test]
    fn test_is_supported() {
        assert!(ChunkEncoderFactory::is_supported(PCM_ENCODING));
        assert!(ChunkEncoderFactory::is_supported(WAV_ENCODING));
        assert!(!ChunkEncoderFactory::is_supported("audio/ogg"));
    }
}
