/// Block-averaged amplitude envelope of a waveform.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub values: Vec<f32>,
    /// Source samples per envelope value
    pub factor: usize,
}

/// Integer decimation factor for reaching `target_rate`, never below 1.
pub fn downsample_factor(sample_rate: u32, target_rate: u32) -> usize {
    if target_rate == 0 {
        return 1;
    }
    ((sample_rate / target_rate) as usize).max(1)
}

/// Mean absolute amplitude over consecutive blocks of `factor` samples.
///
/// A trailing partial block is dropped, so the result holds `len / factor` values.
pub fn extract(samples: &[f32], sample_rate: u32, target_rate: u32) -> Envelope {
    let factor = downsample_factor(sample_rate, target_rate);
    let values = samples
        .chunks_exact(factor)
        .map(|block| block.iter().map(|s| s.abs()).sum::<f32>() / factor as f32)
        .collect();

    Envelope { values, factor }
}
