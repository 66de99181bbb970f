use crate::error::{AnalysisError, Result};

/// Single-channel samples in [-1, 1] at a fixed sample rate.
///
/// Handed to a worker by value; the caller keeps no alias to the buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AnalysisError::MissingInput(
                "sample rate must be greater than 0".into(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Fails on NaN or infinite samples, which would poison every later stage.
    pub fn check_finite(&self) -> Result<()> {
        match self.samples.iter().position(|s| !s.is_finite()) {
            Some(idx) => Err(AnalysisError::Analysis(format!(
                "non-finite sample at index {}",
                idx
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sample_rate_is_missing_input() {
        let err = Waveform::new(vec![0.0; 16], 0).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingInput(_)));
    }

    #[test]
    fn empty_samples_are_accepted() {
        let wf = Waveform::new(Vec::new(), 44100).unwrap();
        assert!(wf.is_empty());
        assert_eq!(wf.duration(), 0.0);
    }

    #[test]
    fn detects_nan() {
        let wf = Waveform::new(vec![0.0, f32::NAN, 0.5], 8000).unwrap();
        assert!(matches!(wf.check_finite(), Err(AnalysisError::Analysis(_))));
    }
}
