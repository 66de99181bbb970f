//! Offline tempo (BPM) and musical key estimation for single-channel audio.
//!
//! The tempo stage measures the spacing of amplitude-envelope peaks; the key stage
//! folds a windowed FFT into a chroma vector and correlates it against major and
//! minor key profiles. [`AnalysisWorker`] runs both off the calling thread and
//! streams progress back over a channel.

pub mod analysis;
pub mod audio;
pub mod cancel;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod worker;

pub use analysis::{AnalysisResult, Key, Mode};
pub use audio::Waveform;
pub use cancel::CancelToken;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use pipeline::{analyze_waveform, AnalysisSource, Progress, Stage};
pub use worker::{AnalysisHandle, AnalysisWorker, WorkerMessage};
