use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, Result};

/// Top-level layout of `tempokey.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Tunable constants of the tempo and key stages.
///
/// The defaults are empirical values; nothing musical depends on them being exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Envelope rate the waveform is reduced to before peak picking (Hz)
    #[serde(default = "default_target_rate")]
    pub target_rate: u32,
    /// Envelope percentile used as the peak threshold (0.0-1.0)
    #[serde(default = "default_peak_percentile")]
    pub peak_percentile: f32,
    /// Interval bucket width, in envelope frames
    #[serde(default = "default_interval_tolerance")]
    pub interval_tolerance: usize,
    #[serde(default = "default_min_bpm")]
    pub min_bpm: f32,
    #[serde(default = "default_max_bpm")]
    pub max_bpm: f32,
    /// Returned when no beat period can be measured
    #[serde(default = "default_bpm")]
    pub default_bpm: f32,
    /// Spectral frame size, must be a power of two
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Length of the waveform prefix used for key detection (seconds)
    #[serde(default = "default_max_key_seconds")]
    pub max_key_seconds: f32,
    /// Lowest bin center frequency folded into the chroma vector (Hz)
    #[serde(default = "default_min_freq")]
    pub min_freq: f32,
    /// Highest bin center frequency folded into the chroma vector (Hz)
    #[serde(default = "default_max_freq")]
    pub max_freq: f32,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_rate: default_target_rate(),
            peak_percentile: default_peak_percentile(),
            interval_tolerance: default_interval_tolerance(),
            min_bpm: default_min_bpm(),
            max_bpm: default_max_bpm(),
            default_bpm: default_bpm(),
            fft_size: default_fft_size(),
            max_key_seconds: default_max_key_seconds(),
            min_freq: default_min_freq(),
            max_freq: default_max_freq(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

impl AnalysisConfig {
    /// Reject parameter sets the tempo and key stages cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.target_rate == 0 {
            return Err(invalid("target_rate must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.peak_percentile) {
            return Err(invalid("peak_percentile must lie within 0.0-1.0"));
        }
        if self.interval_tolerance == 0 {
            return Err(invalid("interval_tolerance must be at least 1"));
        }
        // Halving/doubling only converges when the band spans at least one octave.
        if !(self.min_bpm > 0.0 && self.max_bpm >= self.min_bpm * 2.0) {
            return Err(invalid(format!(
                "BPM band {}-{} must be positive and span at least one octave",
                self.min_bpm, self.max_bpm
            )));
        }
        // Tempos are reported as whole BPM, so the band must hold one.
        if self.min_bpm.ceil() > self.max_bpm.floor() {
            return Err(invalid(format!(
                "BPM band {}-{} contains no whole BPM",
                self.min_bpm, self.max_bpm
            )));
        }
        if !(self.min_bpm..=self.max_bpm).contains(&self.default_bpm) {
            return Err(invalid(format!(
                "default_bpm {} lies outside {}-{}",
                self.default_bpm, self.min_bpm, self.max_bpm
            )));
        }
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(invalid(format!(
                "fft_size {} is not a power of two",
                self.fft_size
            )));
        }
        if !(self.max_key_seconds > 0.0) {
            return Err(invalid("max_key_seconds must be positive"));
        }
        if !(self.min_freq > 0.0 && self.max_freq > self.min_freq) {
            return Err(invalid(format!(
                "frequency band {}-{} Hz is empty",
                self.min_freq, self.max_freq
            )));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> AnalysisError {
    AnalysisError::InvalidConfig(msg.into())
}

fn default_target_rate() -> u32 { 4410 }
fn default_peak_percentile() -> f32 { 0.85 }
fn default_interval_tolerance() -> usize { 5 }
fn default_min_bpm() -> f32 { 70.0 }
fn default_max_bpm() -> f32 { 180.0 }
fn default_bpm() -> f32 { 120.0 }
fn default_fft_size() -> usize { 4096 }
fn default_max_key_seconds() -> f32 { 30.0 }
fn default_min_freq() -> f32 { 60.0 }
fn default_max_freq() -> f32 { 2000.0 }
fn default_format() -> String { "text".into() }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path first, then `./tempokey.toml`, then the per-user config locations.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("tempokey.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("tempokey").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("tempokey").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_fft() {
        let cfg = AnalysisConfig {
            fft_size: 3000,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_band_narrower_than_an_octave() {
        let cfg = AnalysisConfig {
            min_bpm: 100.0,
            max_bpm: 150.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_band_without_whole_bpm() {
        let cfg = AnalysisConfig {
            min_bpm: 0.3,
            max_bpm: 0.6,
            default_bpm: 0.5,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [analysis]
            fft_size = 8192
            min_bpm = 80

            [output]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.fft_size, 8192);
        assert_eq!(cfg.analysis.min_bpm, 80.0);
        assert_eq!(cfg.analysis.max_bpm, 180.0);
        assert_eq!(cfg.analysis.target_rate, 4410);
        assert_eq!(cfg.output.format, "json");
    }
}
