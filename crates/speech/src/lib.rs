pub mod asr;
pub mod config;
pub mod pipeline;
pub mod transcode;
pub mod wav;

pub use asr::{AsrBackend, AsrError, AsrRequest, TranscriptionResult};
pub use config::SpeechConfig;
pub use transcode::{OggOpusTranscoder, TranscodeError, Transcoder, MIN_AUDIO_BYTES};

/// Sample rate the recogniser expects.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
