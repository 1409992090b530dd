use std::io::Cursor;

use symphonia::core::codecs::CODEC_TYPE_OPUS;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Opus packets of the first Opus track in an OGG container.
pub struct OpusStream {
    pub channels: usize,
    pub packets: Vec<Vec<u8>>,
}

/// Demuxes an OGG/Opus voice note into raw Opus packets.
pub fn read_opus_packets(bytes: Vec<u8>) -> anyhow::Result<OpusStream> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("ogg");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| anyhow::anyhow!("Unrecognised container: {}", e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec == CODEC_TYPE_OPUS)
        .ok_or_else(|| anyhow::anyhow!("No Opus track in container"))?;
    let track_id = track.id;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let mut packets = Vec::new();
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }
                let data = packet.data.to_vec();
                if data.starts_with(b"OpusHead") || data.starts_with(b"OpusTags") {
                    continue;
                }
                packets.push(data);
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(anyhow::anyhow!("Demux error: {}", e)),
        }
    }

    debug!(packets = packets.len(), channels, "Demuxed Opus stream");
    Ok(OpusStream { channels, packets })
}
