use std::ops::Range;

use super::fft;
use crate::config::AnalysisConfig;

/// Magnitudes of the first half of the bins of one windowed frame.
#[derive(Clone, Debug)]
pub struct SpectralFrame {
    pub magnitudes: Vec<f32>,
}

/// Frames a bounded prefix of a waveform with 50% overlap and transforms each frame.
pub struct SpectralAnalyzer {
    fft_size: usize,
    hop_size: usize,
    sample_rate: u32,
    window: Vec<f32>,
    band: Range<usize>,
}

impl SpectralAnalyzer {
    /// `config.fft_size` must be a power of two.
    pub fn new(sample_rate: u32, config: &AnalysisConfig) -> Self {
        let fft_size = config.fft_size;
        let bin_hz = sample_rate as f32 / fft_size as f32;
        // Bin 0 is DC and never reaches the chroma stage.
        let lo = ((config.min_freq / bin_hz).ceil() as usize).max(1);
        let hi = ((config.max_freq / bin_hz).floor() as usize + 1).min(fft_size / 2);

        Self {
            fft_size,
            hop_size: fft_size / 2,
            sample_rate,
            window: fft::hann_window(fft_size),
            band: lo..hi.max(lo),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of samples analyzed, capped at `max_seconds` of audio.
    pub fn prefix_len(&self, total: usize, max_seconds: f32) -> usize {
        let cap = (self.sample_rate as f64 * max_seconds as f64) as usize;
        total.min(cap)
    }

    /// Frames covering `len` samples; a prefix shorter than one frame yields one padded frame.
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.fft_size {
            1
        } else {
            (len - self.fft_size) / self.hop_size + 1
        }
    }

    /// Bins whose center frequency lies inside the musical band.
    pub fn band_bins(&self) -> Range<usize> {
        self.band.clone()
    }

    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.fft_size as f32
    }

    pub fn analyze_frame(&self, samples: &[f32], index: usize) -> SpectralFrame {
        let start = index * self.hop_size;
        let end = (start + self.fft_size).min(samples.len());
        let mut frame = vec![0.0f32; self.fft_size];
        if start < end {
            frame[..end - start].copy_from_slice(&samples[start..end]);
        }
        SpectralFrame {
            magnitudes: fft::magnitude_spectrum(&frame, &self.window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer(sample_rate: u32) -> SpectralAnalyzer {
        SpectralAnalyzer::new(sample_rate, &AnalysisConfig::default())
    }

    #[test]
    fn frame_count_uses_half_overlap() {
        let a = analyzer(44100);
        assert_eq!(a.frame_count(0), 0);
        assert_eq!(a.frame_count(100), 1);
        assert_eq!(a.frame_count(4096), 1);
        assert_eq!(a.frame_count(4096 + 2047), 1);
        assert_eq!(a.frame_count(4096 + 2048), 2);
        assert_eq!(a.frame_count(44100), 20);
    }

    #[test]
    fn band_excludes_out_of_range_bins() {
        let a = analyzer(44100);
        let band = a.band_bins();
        assert!(band.start >= 1);
        assert!(a.bin_frequency(band.start) >= 60.0);
        assert!(a.bin_frequency(band.start - 1) < 60.0);
        assert!(a.bin_frequency(band.end - 1) <= 2000.0);
        assert!(a.bin_frequency(band.end) > 2000.0);
    }

    #[test]
    fn prefix_is_capped() {
        let a = analyzer(1000);
        assert_eq!(a.prefix_len(100_000, 30.0), 30_000);
        assert_eq!(a.prefix_len(500, 30.0), 500);
    }

    #[test]
    fn short_frame_is_zero_padded() {
        let a = analyzer(8000);
        let frame = a.analyze_frame(&[0.5; 10], 0);
        assert_eq!(frame.magnitudes.len(), a.fft_size() / 2);
        assert!(frame.magnitudes.iter().all(|m| m.is_finite()));
    }
}
