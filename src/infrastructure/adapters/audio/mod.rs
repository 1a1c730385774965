//! Audio Adapter - PCM 读写与解码

mod decode;
mod wav_store;

pub use decode::{decode_audio, decode_to_mono, downmix, resample, DecodedAudio};
pub use wav_store::{WavPcmSink, WavPcmStore};
