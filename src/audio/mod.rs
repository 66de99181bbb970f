pub mod decode;
pub mod waveform;

pub use waveform::Waveform;
