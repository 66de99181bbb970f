use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tempokey", about = "Estimate tempo (BPM) and musical key of audio files")]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG, AAC)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Config file (defaults to tempokey.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Envelope rate for tempo detection (Hz)
    #[arg(long, default_value_t = 4410)]
    pub target_rate: u32,

    /// Lower bound of the BPM band
    #[arg(long, default_value_t = 70.0)]
    pub min_bpm: f32,

    /// Upper bound of the BPM band
    #[arg(long, default_value_t = 180.0)]
    pub max_bpm: f32,

    /// FFT frame size for key detection (power of two)
    #[arg(long, default_value_t = 4096)]
    pub fft_size: usize,

    /// Seconds of audio used for key detection
    #[arg(long, default_value_t = 30.0)]
    pub max_key_seconds: f32,

    /// Hide progress bars
    #[arg(short, long)]
    pub quiet: bool,
}
