use thiserror::Error;
use tracing::debug;

use crate::pipeline::{OpusDecoder, Resampler, read_opus_packets};
use crate::wav::encode_pcm16_wav;

/// Inputs smaller than this cannot hold a playable voice note.
pub const MIN_AUDIO_BYTES: usize = 100;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Audio buffer too small: {0} bytes")]
    TooSmall(usize),
    #[error("Unsupported container: {0}")]
    Container(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Audio contains no samples")]
    Empty,
}

impl TranscodeError {
    /// Whether retrying the same input could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TranscodeError::Encode(_))
    }
}

/// Converts provider audio into recogniser-ready WAV (16 kHz, mono, 16-bit PCM).
pub trait Transcoder: Send + Sync + 'static {
    fn transcode(&self, input: Vec<u8>) -> Result<Vec<u8>, TranscodeError>;
}

/// Fails fast on buffers that cannot be audio.
pub fn validate_input(input: &[u8]) -> Result<(), TranscodeError> {
    if input.len() < MIN_AUDIO_BYTES {
        return Err(TranscodeError::TooSmall(input.len()));
    }
    Ok(())
}

/// OGG/Opus → WAV transcoder built on symphonia, libopus and rubato.
#[derive(Debug, Default, Clone, Copy)]
pub struct OggOpusTranscoder;

impl Transcoder for OggOpusTranscoder {
    fn transcode(&self, input: Vec<u8>) -> Result<Vec<u8>, TranscodeError> {
        validate_input(&input)?;
        let input_len = input.len();

        let stream =
            read_opus_packets(input).map_err(|e| TranscodeError::Container(e.to_string()))?;

        let mut decoder =
            OpusDecoder::new(stream.channels).map_err(|e| TranscodeError::Decode(e.to_string()))?;
        let mut pcm_48k = Vec::new();
        for packet in &stream.packets {
            let frame = decoder
                .decode_to_mono(packet)
                .map_err(|e| TranscodeError::Decode(e.to_string()))?;
            pcm_48k.extend(frame);
        }
        if pcm_48k.is_empty() {
            return Err(TranscodeError::Empty);
        }

        let pcm_16k =
            Resampler::resample_clip(&pcm_48k).map_err(|e| TranscodeError::Decode(e.to_string()))?;
        let wav = encode_pcm16_wav(&pcm_16k).map_err(|e| TranscodeError::Encode(e.to_string()))?;

        debug!(
            input_bytes = input_len,
            samples = pcm_16k.len(),
            wav_bytes = wav.len(),
            "Transcoded voice note"
        );
        Ok(wav)
    }
}
