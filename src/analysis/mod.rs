pub mod chroma;
pub mod envelope;
pub mod fft;
pub mod key;
pub mod result;
pub mod spectrum;
pub mod tempo;

pub use key::{Key, KeyEstimate, Mode};
pub use result::AnalysisResult;
pub use tempo::TempoEstimate;
