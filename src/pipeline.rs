//! Stage sequencing for one analysis: decode, then tempo and key side by side.
//!
//! Stage completions are funnelled through the calling thread, which is the only
//! place progress is reported from, so the reported values never go backwards.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use crate::analysis::{chroma, key, tempo, AnalysisResult, KeyEstimate, TempoEstimate};
use crate::audio::{decode, Waveform};
use crate::cancel::CancelToken;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Where the samples of an analysis come from.
#[derive(Debug)]
pub enum AnalysisSource {
    Waveform(Waveform),
    File(PathBuf),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Decoding,
    Decoded,
    Tempo,
    Key,
    Complete,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Decoding => "Decoding",
            Stage::Decoded => "Decoded",
            Stage::Tempo => "BPM Detection",
            Stage::Key => "Key Detection",
            Stage::Complete => "Complete",
        }
    }
}

/// A progress milestone, `percent` in 0-100.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub stage: Stage,
}

const DECODE_START: u8 = 0;
const DECODE_DONE: u8 = 20;
/// Percent reached after the first and second analysis stage finish, in completion order
const STAGE_DONE: [u8; 2] = [60, 90];
const COMPLETE: u8 = 100;

enum StageOutput {
    Tempo(TempoEstimate),
    Key(Result<Option<KeyEstimate>>),
}

/// Decode (for file sources) and analyze, reporting milestones to `on_progress`.
pub fn analyze_source(
    source: AnalysisSource,
    config: &AnalysisConfig,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<AnalysisResult> {
    config.validate()?;

    on_progress(Progress {
        percent: DECODE_START,
        stage: Stage::Decoding,
    });
    let waveform = match source {
        AnalysisSource::Waveform(wf) => wf,
        AnalysisSource::File(path) => {
            log::info!("Decoding {}", path.display());
            decode::decode_audio(&path)?
        }
    };
    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    on_progress(Progress {
        percent: DECODE_DONE,
        stage: Stage::Decoded,
    });

    let result = run_stages(&waveform, config, cancel, on_progress)?;

    on_progress(Progress {
        percent: COMPLETE,
        stage: Stage::Complete,
    });
    Ok(result)
}

/// Analyze an in-memory waveform without the decode milestones.
pub fn analyze_waveform(
    waveform: &Waveform,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<AnalysisResult> {
    config.validate()?;
    run_stages(waveform, config, cancel, &mut |_| {})
}

fn run_stages(
    waveform: &Waveform,
    config: &AnalysisConfig,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<AnalysisResult> {
    waveform.check_finite()?;

    let samples = waveform.samples();
    let sample_rate = waveform.sample_rate();
    log::info!(
        "Analyzing {} samples @ {}Hz ({:.1}s)",
        samples.len(),
        sample_rate,
        waveform.duration()
    );

    let (tx, rx) = mpsc::channel();

    let (tempo_est, key_est) = thread::scope(|s| {
        let tempo_tx = tx.clone();
        let tempo_handle = s.spawn(move || {
            let est = tempo::estimate(samples, sample_rate, config);
            tempo_tx.send(StageOutput::Tempo(est)).ok();
        });
        let key_tx = tx;
        let key_handle = s.spawn(move || {
            let est = key_stage(samples, sample_rate, config, cancel);
            key_tx.send(StageOutput::Key(est)).ok();
        });

        let mut tempo_est = None;
        let mut key_est = None;
        for (done, output) in rx.iter().enumerate() {
            let stage = match output {
                StageOutput::Tempo(est) => {
                    log::info!("BPM stage done: {} BPM (detected={})", est.bpm, est.detected);
                    tempo_est = Some(est);
                    Stage::Tempo
                }
                StageOutput::Key(est) => {
                    key_est = Some(est);
                    Stage::Key
                }
            };
            if let Some(&percent) = STAGE_DONE.get(done) {
                on_progress(Progress { percent, stage });
            }
        }

        let mut panicked = false;
        for handle in [tempo_handle, key_handle] {
            panicked |= handle.join().is_err();
        }
        if panicked {
            return Err(AnalysisError::Analysis("analysis stage panicked".into()));
        }
        Ok((tempo_est, key_est))
    })?;

    let tempo_est = tempo_est
        .ok_or_else(|| AnalysisError::Analysis("tempo stage produced no estimate".into()))?;
    let key_est = key_est
        .ok_or_else(|| AnalysisError::Analysis("key stage produced no estimate".into()))??;

    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }

    let result = AnalysisResult::new(tempo_est, key_est);
    log::info!(
        "Result: {} BPM, key={:?}, camelot={:?}",
        result.tempo,
        result.key,
        result.camelot
    );
    Ok(result)
}

/// Chroma then template matching; `None` when the analyzed prefix holds no energy.
fn key_stage(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<Option<KeyEstimate>> {
    let chroma = chroma::compute_chroma(samples, sample_rate, config, cancel)?;
    if chroma.is_silent() {
        log::info!("Key stage done: no tonal energy");
        return Ok(None);
    }
    let est = key::estimate(&chroma);
    log::info!(
        "Key stage done: {} ({}), r={:.3}",
        est.key,
        est.key.camelot(),
        est.correlation
    );
    Ok(Some(est))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Key;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| {
                (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5
            })
            .collect()
    }

    fn run(source: AnalysisSource) -> (Result<AnalysisResult>, Vec<Progress>) {
        let mut seen = Vec::new();
        let result = analyze_source(
            source,
            &AnalysisConfig::default(),
            &CancelToken::new(),
            &mut |p| seen.push(p),
        );
        (result, seen)
    }

    #[test]
    fn silence_gives_default_tempo_and_no_key() {
        let wf = Waveform::new(vec![0.0; 44100 * 2], 44100).unwrap();
        let (result, _) = run(AnalysisSource::Waveform(wf));
        let result = result.unwrap();
        assert_eq!(result.tempo, 120.0);
        assert!(!result.tempo_detected);
        assert_eq!(result.key, "");
        assert_eq!(result.camelot, "");
        assert!(!result.key_detected);
    }

    #[test]
    fn empty_waveform_is_not_an_error() {
        let wf = Waveform::new(Vec::new(), 22050).unwrap();
        let result =
            analyze_waveform(&wf, &AnalysisConfig::default(), &CancelToken::new()).unwrap();
        assert_eq!(result.tempo, 120.0);
        assert_eq!(result.key, "");
    }

    #[test]
    fn progress_is_monotonic_and_complete() {
        let wf = Waveform::new(sine(440.0, 22050, 3.0), 22050).unwrap();
        let (result, seen) = run(AnalysisSource::Waveform(wf));
        assert!(result.is_ok());

        let percents: Vec<u8> = seen.iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![0, 20, 60, 90, 100]);
        assert_eq!(seen.last().map(|p| p.stage), Some(Stage::Complete));
        let stages: Vec<Stage> = seen[2..4].iter().map(|p| p.stage).collect();
        assert!(stages.contains(&Stage::Tempo) && stages.contains(&Stage::Key));
    }

    #[test]
    fn tonal_input_detects_a_key() {
        let mut samples = sine(440.0, 22050, 4.0);
        for (s, t) in samples.iter_mut().zip(sine(554.37, 22050, 4.0)) {
            *s += t;
        }
        for (s, t) in samples.iter_mut().zip(sine(659.25, 22050, 4.0)) {
            *s += t;
        }
        let wf = Waveform::new(samples, 22050).unwrap();
        let result =
            analyze_waveform(&wf, &AnalysisConfig::default(), &CancelToken::new()).unwrap();
        assert!(result.key_detected);
        assert!(Key::from_label(&result.key).is_some());
        assert_eq!(
            Key::from_label(&result.key).map(|k| k.camelot()),
            Some(result.camelot.as_str())
        );
        assert!(result.tempo >= 70.0 && result.tempo <= 180.0);
    }

    #[test]
    fn non_finite_samples_fail_without_result() {
        let wf = Waveform::new(vec![0.0, f32::INFINITY, 0.0], 8000).unwrap();
        let (result, seen) = run(AnalysisSource::Waveform(wf));
        assert!(matches!(result, Err(AnalysisError::Analysis(_))));
        assert!(seen.iter().all(|p| p.stage != Stage::Complete));
    }

    #[test]
    fn invalid_config_is_rejected_before_work() {
        let wf = Waveform::new(vec![0.0; 100], 8000).unwrap();
        let cfg = AnalysisConfig {
            fft_size: 1000,
            ..Default::default()
        };
        let mut seen = Vec::new();
        let result = analyze_source(
            AnalysisSource::Waveform(wf),
            &cfg,
            &CancelToken::new(),
            &mut |p| seen.push(p),
        );
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
        assert!(seen.is_empty());
    }

    #[test]
    fn missing_file_is_missing_input() {
        let (result, _) = run(AnalysisSource::File(PathBuf::from("/no/such/file.wav")));
        assert!(matches!(result, Err(AnalysisError::MissingInput(_))));
    }

    #[test]
    fn cancelled_before_start_returns_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let wf = Waveform::new(sine(440.0, 22050, 1.0), 22050).unwrap();
        let result = analyze_source(
            AnalysisSource::Waveform(wf),
            &AnalysisConfig::default(),
            &cancel,
            &mut |_| {},
        );
        assert_eq!(result, Err(AnalysisError::Cancelled));
    }
}
