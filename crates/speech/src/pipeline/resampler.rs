use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async as AsyncResampler, FixedAsync, Resampler as RubatoResampler,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::TARGET_SAMPLE_RATE;

/// Input rate of every Opus stream.
pub const OPUS_SAMPLE_RATE: u32 = 48_000;

/// 20ms of 48kHz audio, one Opus frame.
const CHUNK_FRAMES: usize = 960;

/// Mono 48kHz to 16kHz sinc resampler for complete voice clips.
pub struct Resampler {
    inner: AsyncResampler<f32>,
}

impl Resampler {
    pub fn new() -> anyhow::Result<Self> {
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let ratio = TARGET_SAMPLE_RATE as f64 / OPUS_SAMPLE_RATE as f64;
        let inner =
            AsyncResampler::<f32>::new_sinc(ratio, 1.0, &params, CHUNK_FRAMES, 1, FixedAsync::Input)
                .map_err(|e| anyhow::anyhow!("Failed to create resampler: {e}"))?;
        Ok(Self { inner })
    }

    /// Runs the whole clip through in fixed chunks. The last chunk is
    /// zero-padded.
    pub fn run(&mut self, clip: &[f32]) -> anyhow::Result<Vec<f32>> {
        let mut output = Vec::with_capacity(clip.len() / 3 + CHUNK_FRAMES);
        let mut tail = Vec::new();

        for chunk in clip.chunks(CHUNK_FRAMES) {
            let frames = if chunk.len() == CHUNK_FRAMES {
                chunk
            } else {
                tail.extend_from_slice(chunk);
                tail.resize(CHUNK_FRAMES, 0.0);
                tail.as_slice()
            };
            let adapter = InterleavedSlice::new(frames, 1, CHUNK_FRAMES)
                .map_err(|e| anyhow::anyhow!("Input adapter error: {e}"))?;
            let resampled = self
                .inner
                .process(&adapter, 0, None)
                .map_err(|e| anyhow::anyhow!("Resample error: {e}"))?;
            output.extend(resampled.take_data());
        }

        Ok(output)
    }

    pub fn resample_clip(samples: &[f32]) -> anyhow::Result<Vec<f32>> {
        Self::new()?.run(samples)
    }
}
