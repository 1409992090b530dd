pub mod ogg_reader;
pub mod opus_decoder;
pub mod resampler;

pub use ogg_reader::read_opus_packets;
pub use opus_decoder::OpusDecoder;
pub use resampler::Resampler;
