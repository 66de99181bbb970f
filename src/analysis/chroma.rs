use rayon::prelude::*;

use super::spectrum::{SpectralAnalyzer, SpectralFrame};
use crate::cancel::CancelToken;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Unnormalized energy per pitch class, index 0 = C.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChromaVector(pub [f32; 12]);

impl ChromaVector {
    pub fn total(&self) -> f32 {
        self.0.iter().sum()
    }

    pub fn is_silent(&self) -> bool {
        self.total() <= 0.0
    }

    /// Pitch class holding the most energy, `None` for a silent vector.
    pub fn dominant(&self) -> Option<usize> {
        if self.is_silent() {
            return None;
        }
        self.0
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }

    /// Shift every pitch class up by `semitones`.
    pub fn transpose(&self, semitones: usize) -> Self {
        let mut out = [0.0f32; 12];
        for (i, &v) in self.0.iter().enumerate() {
            out[(i + semitones) % 12] = v;
        }
        ChromaVector(out)
    }

    fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += b;
        }
        self
    }
}

/// Nearest equal-tempered pitch class of `freq` (A4 = 440 Hz).
pub fn pitch_class(freq: f32) -> usize {
    let semitone = 12.0 * (freq as f64 / 440.0).log2() + 69.0;
    (semitone.round() as i64).rem_euclid(12) as usize
}

/// Folds spectral frames into a chroma vector using a precomputed bin-to-pitch-class map.
pub struct ChromaAggregator {
    bins: Vec<(usize, usize)>,
}

impl ChromaAggregator {
    pub fn new(analyzer: &SpectralAnalyzer) -> Self {
        let bins = analyzer
            .band_bins()
            .map(|bin| (bin, pitch_class(analyzer.bin_frequency(bin))))
            .collect();
        Self { bins }
    }

    pub fn accumulate(&self, chroma: &mut ChromaVector, frame: &SpectralFrame) {
        for &(bin, pc) in &self.bins {
            if let Some(&mag) = frame.magnitudes.get(bin) {
                chroma.0[pc] += mag;
            }
        }
    }
}

/// Chroma of the first `config.max_key_seconds` of `samples`.
///
/// Frames are transformed in parallel; the cancel token is polled before each frame.
pub fn compute_chroma(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<ChromaVector> {
    let analyzer = SpectralAnalyzer::new(sample_rate, config);
    let aggregator = ChromaAggregator::new(&analyzer);
    let prefix = &samples[..analyzer.prefix_len(samples.len(), config.max_key_seconds)];
    let frames = analyzer.frame_count(prefix.len());

    log::debug!(
        "Key: {} samples, {} frames of {}, bins {:?}",
        prefix.len(),
        frames,
        analyzer.fft_size(),
        analyzer.band_bins()
    );

    (0..frames)
        .into_par_iter()
        .try_fold(ChromaVector::default, |mut chroma, idx| {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            let frame = analyzer.analyze_frame(prefix, idx);
            aggregator.accumulate(&mut chroma, &frame);
            Ok(chroma)
        })
        .try_reduce(ChromaVector::default, |a, b| Ok(a.merge(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.8
            })
            .collect()
    }

    fn chroma_of(samples: &[f32], sample_rate: u32) -> ChromaVector {
        compute_chroma(samples, sample_rate, &AnalysisConfig::default(), &CancelToken::new())
            .unwrap()
    }

    #[test]
    fn pitch_classes_of_reference_tones() {
        assert_eq!(pitch_class(440.0), 9);
        assert_eq!(pitch_class(261.63), 0);
        assert_eq!(pitch_class(65.41), 0);
        assert_eq!(pitch_class(392.0), 7);
        assert_eq!(pitch_class(1975.5), 11);
    }

    #[test]
    fn a440_single_frame_is_a() {
        let chroma = chroma_of(&sine(440.0, 44100, 4096), 44100);
        assert_eq!(chroma.dominant(), Some(9));
    }

    #[test]
    fn sine_maps_to_nearest_semitone() {
        for &(freq, expected) in &[(261.63f32, 0usize), (329.63, 4), (185.0, 6), (987.77, 11)] {
            let chroma = chroma_of(&sine(freq, 22050, 22050), 22050);
            assert_eq!(chroma.dominant(), Some(expected), "freq {}", freq);
        }
    }

    #[test]
    fn silence_yields_silent_chroma() {
        let chroma = chroma_of(&vec![0.0; 20_000], 44100);
        assert!(chroma.is_silent());
        assert_eq!(chroma.dominant(), None);
        assert!(chroma_of(&[], 44100).is_silent());
    }

    #[test]
    fn cancelled_token_aborts() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = compute_chroma(
            &sine(440.0, 44100, 44100),
            44100,
            &AnalysisConfig::default(),
            &cancel,
        )
        .unwrap_err();
        assert_eq!(err, AnalysisError::Cancelled);
    }

    #[test]
    fn transpose_wraps() {
        let mut v = [0.0f32; 12];
        v[11] = 1.0;
        let t = ChromaVector(v).transpose(2);
        assert_eq!(t.dominant(), Some(1));
    }
}
