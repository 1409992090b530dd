use std::convert::TryFrom;

use audiopus::coder::Decoder;
use audiopus::packet::Packet;
use audiopus::{Channels, MutSignals, SampleRate};

/// Wraps libopus. Decodes voice-note packets into mono f32 PCM at 48kHz.
pub struct OpusDecoder {
    decoder: Decoder,
    channels: usize,
    /// Interleaved output buffer sized for the largest Opus frame.
    decode_buf: Vec<f32>,
}

/// Maximum Opus frame: 120ms at 48kHz = 5760 samples per channel.
const MAX_FRAME_SAMPLES: usize = 5760;

impl OpusDecoder {
    /// Creates a decoder for a stream with the given channel count (1 or 2).
    pub fn new(channels: usize) -> anyhow::Result<Self> {
        let (opus_channels, channels) = if channels >= 2 {
            (Channels::Stereo, 2)
        } else {
            (Channels::Mono, 1)
        };
        let decoder = Decoder::new(SampleRate::Hz48000, opus_channels)
            .map_err(|e| anyhow::anyhow!("Failed to create Opus decoder: {:?}", e))?;
        Ok(Self {
            decoder,
            channels,
            decode_buf: vec![0.0f32; MAX_FRAME_SAMPLES * channels],
        })
    }

    /// Decodes one Opus packet. Stereo input is down-mixed to mono.
    pub fn decode_to_mono(&mut self, opus_data: &[u8]) -> anyhow::Result<Vec<f32>> {
        let output = MutSignals::try_from(&mut self.decode_buf[..])
            .map_err(|e| anyhow::anyhow!("MutSignals error: {:?}", e))?;

        let packet = Packet::try_from(opus_data)
            .map_err(|e| anyhow::anyhow!("Packet error: {:?}", e))?;

        let samples_per_channel = self
            .decoder
            .decode_float(Some(packet), output, false)
            .map_err(|e| anyhow::anyhow!("Opus decode error: {:?}", e))?;

        Ok(downmix(&self.decode_buf, samples_per_channel, self.channels))
    }
}

fn downmix(interleaved: &[f32], frames: usize, channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved[..frames].to_vec();
    }
    let mut mono = Vec::with_capacity(frames);
    for i in 0..frames {
        let left = interleaved[i * 2];
        let right = interleaved[i * 2 + 1];
        mono.push((left + right) * 0.5);
    }
    mono
}
