use serde::{Deserialize, Serialize};

use super::key::KeyEstimate;
use super::tempo::TempoEstimate;

/// Final record of one analysis. Undetected keys serialize as empty strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// BPM, always within the configured band
    pub tempo: f32,
    /// "<note> major|minor", or empty
    pub key: String,
    /// Camelot wheel code such as "8B", or empty
    pub camelot: String,
    pub tempo_detected: bool,
    pub key_detected: bool,
}

impl AnalysisResult {
    pub fn new(tempo: TempoEstimate, key: Option<KeyEstimate>) -> Self {
        let (label, camelot) = match key {
            Some(est) => (est.key.label(), est.key.camelot().to_string()),
            None => (String::new(), String::new()),
        };
        Self {
            tempo: tempo.bpm,
            key: label,
            camelot,
            tempo_detected: tempo.detected,
            key_detected: key.is_some(),
        }
    }
}
