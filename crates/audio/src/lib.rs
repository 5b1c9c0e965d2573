mod chunk;
mod ring;
mod source;
mod wav;

pub use chunk::AudioChunk;
pub use ring::{AudioRing, RingRead};
pub use source::{AudioSource, FixedAudioSource};
#[cfg(feature = "cpal-source")]
pub use source::CpalAudioSource;
pub use wav::encode_wav;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("stream error: {0}")]
    StreamError(String),
    #[error("wav encode error: {0}")]
    WavEncodeError(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;
