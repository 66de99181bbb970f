mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;

use cli::Cli;
use tempokey::config::{self, AnalysisConfig};
use tempokey::{AnalysisResult, AnalysisSource, AnalysisWorker};

#[derive(Serialize)]
struct FileReport {
    file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let mut analysis = AnalysisConfig::default();
    if let Some(path) = config::find_config(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            // Config values apply only when the CLI flag is at its default
            if cli.target_rate == 4410 { cli.target_rate = cfg.analysis.target_rate; }
            if cli.min_bpm == 70.0 { cli.min_bpm = cfg.analysis.min_bpm; }
            if cli.max_bpm == 180.0 { cli.max_bpm = cfg.analysis.max_bpm; }
            if cli.fft_size == 4096 { cli.fft_size = cfg.analysis.fft_size; }
            if cli.max_key_seconds == 30.0 { cli.max_key_seconds = cfg.analysis.max_key_seconds; }
            if !cli.json && cfg.output.format == "json" {
                cli.json = true;
            }
            analysis = cfg.analysis;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    analysis.target_rate = cli.target_rate;
    analysis.min_bpm = cli.min_bpm;
    analysis.max_bpm = cli.max_bpm;
    analysis.fft_size = cli.fft_size;
    analysis.max_key_seconds = cli.max_key_seconds;
    analysis.validate().context("Invalid analysis settings")?;

    log::info!("tempokey - analyzing {} file(s)", cli.inputs.len());

    let multi = MultiProgress::new();
    if cli.quiet {
        multi.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    let style = ProgressStyle::default_bar()
        .template("{prefix:.bold} {bar:30.cyan/blue} {pos:>3}% {msg}")
        .context("Invalid progress bar template")?
        .progress_chars("=>-");

    // Every file gets its own worker; all of them run at once.
    let jobs: Vec<_> = cli
        .inputs
        .iter()
        .map(|path| {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(style.clone());
            bar.set_prefix(display_name(path));
            let handle =
                AnalysisWorker::spawn(AnalysisSource::File(path.clone()), analysis.clone());
            (path.clone(), handle, bar)
        })
        .collect();

    let reports: Vec<FileReport> = thread::scope(|s| {
        let drivers: Vec<_> = jobs
            .into_iter()
            .map(|(path, handle, bar)| {
                s.spawn(move || {
                    let outcome = handle.wait(|p| {
                        bar.set_position(p.percent as u64);
                        bar.set_message(p.stage.label());
                    });
                    match outcome {
                        Ok(result) => {
                            bar.finish_with_message("done");
                            FileReport {
                                file: path,
                                result: Some(result),
                                error: None,
                            }
                        }
                        Err(err) => {
                            bar.abandon_with_message("failed");
                            log::warn!("{}: {}", path.display(), err);
                            FileReport {
                                file: path,
                                result: None,
                                error: Some(err.to_string()),
                            }
                        }
                    }
                })
            })
            .collect();

        drivers
            .into_iter()
            .filter_map(|d| d.join().ok())
            .collect()
    });

    if cli.json {
        let json = serde_json::to_string_pretty(&reports).context("Failed to serialize results")?;
        println!("{}", json);
    } else {
        for report in &reports {
            println!("{}", format_report(report));
        }
    }

    Ok(())
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// One line per file; failures and undetected values read "not detected".
fn format_report(report: &FileReport) -> String {
    let name = report.file.display();
    match &report.result {
        Some(r) => {
            let tempo = if r.tempo_detected {
                format!("{} BPM", r.tempo)
            } else {
                "BPM not detected".to_string()
            };
            let key = if r.key_detected {
                format!("{} ({})", r.key, r.camelot)
            } else {
                "key not detected".to_string()
            };
            format!("{}: {}, {}", name, tempo, key)
        }
        None => format!("{}: BPM not detected, key not detected", name),
    }
}
