//! Tempo estimation from envelope peak spacing.
//!
//! Peaks are strict local maxima above a percentile threshold. The spacing between
//! consecutive peaks is bucketed, the most frequent bucket is taken as the beat
//! period, and the resulting BPM is folded by octaves into the configured band.

use super::envelope::{self, Envelope};
use crate::config::AnalysisConfig;

/// Outcome of the tempo stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoEstimate {
    pub bpm: f32,
    /// False when `bpm` is the configured default
    pub detected: bool,
}

/// Counts of quantized peak intervals, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct IntervalHistogram {
    buckets: Vec<(usize, usize)>,
}

impl IntervalHistogram {
    pub fn from_peaks(peaks: &[usize], tolerance: usize) -> Self {
        let mut hist = Self::default();
        for w in peaks.windows(2) {
            hist.add(quantize(w[1] - w[0], tolerance));
        }
        hist
    }

    fn add(&mut self, interval: usize) {
        match self.buckets.iter_mut().find(|(i, _)| *i == interval) {
            Some((_, count)) => *count += 1,
            None => self.buckets.push((interval, 1)),
        }
    }

    pub fn count(&self, interval: usize) -> usize {
        self.buckets
            .iter()
            .find(|(i, _)| *i == interval)
            .map_or(0, |(_, c)| *c)
    }

    /// Most frequent interval; ties go to the bucket seen first.
    pub fn dominant(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for &(interval, count) in &self.buckets {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((interval, count));
            }
        }
        best.map(|(interval, _)| interval)
    }
}

/// Round `interval` to the nearest multiple of `tolerance`.
pub fn quantize(interval: usize, tolerance: usize) -> usize {
    let tol = tolerance.max(1);
    ((interval as f64 / tol as f64).round() as usize) * tol
}

/// Value at `percentile` (0.0-1.0) of the sorted envelope.
pub fn percentile_threshold(values: &[f32], percentile: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((sorted.len() as f32 * percentile).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Indices that exceed `threshold` and both of their neighbours.
pub fn pick_peaks(values: &[f32], threshold: f32) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    (1..values.len() - 1)
        .filter(|&i| {
            values[i] > threshold && values[i] > values[i - 1] && values[i] > values[i + 1]
        })
        .collect()
}

/// Fold `bpm` by octaves into `[min_bpm, max_bpm]` and round to a whole BPM.
///
/// Rounding may step past a fractional band edge, so the result is held to the
/// whole numbers inside the band.
pub fn normalize_bpm(mut bpm: f32, min_bpm: f32, max_bpm: f32) -> f32 {
    while bpm < min_bpm {
        bpm *= 2.0;
    }
    while bpm > max_bpm {
        bpm /= 2.0;
    }
    bpm.round().max(min_bpm.ceil()).min(max_bpm.floor())
}

pub fn estimate_from_envelope(
    env: &Envelope,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> TempoEstimate {
    let fallback = TempoEstimate {
        bpm: config.default_bpm,
        detected: false,
    };

    let threshold = percentile_threshold(&env.values, config.peak_percentile);
    let peaks = pick_peaks(&env.values, threshold);
    log::debug!(
        "Tempo: {} envelope frames (factor {}), threshold={:.5}, {} peaks",
        env.values.len(),
        env.factor,
        threshold,
        peaks.len()
    );

    if peaks.len() < 2 || sample_rate == 0 {
        return fallback;
    }

    let hist = IntervalHistogram::from_peaks(&peaks, config.interval_tolerance);
    let dominant = match hist.dominant() {
        Some(i) if i > 0 => i,
        _ => return fallback,
    };

    let seconds_per_beat = (dominant * env.factor) as f64 / sample_rate as f64;
    let raw_bpm = (60.0 / seconds_per_beat).round() as f32;
    if !raw_bpm.is_finite() || raw_bpm <= 0.0 {
        return fallback;
    }

    let bpm = normalize_bpm(raw_bpm, config.min_bpm, config.max_bpm);
    log::debug!(
        "Tempo: dominant interval {} frames ({} hits), raw {} BPM -> {} BPM",
        dominant,
        hist.count(dominant),
        raw_bpm,
        bpm
    );

    TempoEstimate {
        bpm,
        detected: true,
    }
}

/// Run the full tempo stage on raw samples.
pub fn estimate(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> TempoEstimate {
    let env = envelope::extract(samples, sample_rate, config.target_rate);
    estimate_from_envelope(&env, sample_rate, config)
}
