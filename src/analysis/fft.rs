//! In-place radix-2 Cooley-Tukey FFT and the Hann window.

use rustfft::num_complex::Complex;
use std::f64::consts::PI;

/// Symmetric Hann window of `size` points.
pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

/// Forward transform of `buffer` in place. The length must be a power of two.
pub fn fft_in_place(buffer: &mut [Complex<f32>]) {
    let n = buffer.len();
    debug_assert!(n.is_power_of_two(), "FFT size {} is not a power of two", n);
    if n < 2 {
        return;
    }

    bit_reverse(buffer);

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        // Twiddles advance by the recurrence w <- w * e^{-i*pi/half}
        let arg = PI / half as f64;
        let (step_re, step_im) = (arg.cos(), -arg.sin());

        let mut w_re = 1.0f64;
        let mut w_im = 0.0f64;
        for j in 0..half {
            let w = Complex::new(w_re as f32, w_im as f32);
            let mut i = j;
            while i < n {
                let ip = i + half;
                let t = buffer[ip] * w;
                buffer[ip] = buffer[i] - t;
                buffer[i] += t;
                i += len;
            }
            let prev_re = w_re;
            w_re = prev_re * step_re - w_im * step_im;
            w_im = prev_re * step_im + w_im * step_re;
        }
        len <<= 1;
    }
}

fn bit_reverse(buffer: &mut [Complex<f32>]) {
    let n = buffer.len();
    let mut j = 0;
    for i in 0..n - 1 {
        if i < j {
            buffer.swap(i, j);
        }
        let mut k = n >> 1;
        while k <= j {
            j -= k;
            k >>= 1;
        }
        j += k;
    }
}

/// Window `frame`, transform it, and return the magnitudes of the first `N/2` bins.
pub fn magnitude_spectrum(frame: &[f32], window: &[f32]) -> Vec<f32> {
    let mut buffer: Vec<Complex<f32>> = frame
        .iter()
        .zip(window.iter())
        .map(|(&s, &w)| Complex::new(s * w, 0.0))
        .collect();
    fft_in_place(&mut buffer);
    buffer[..buffer.len() / 2].iter().map(|c| c.norm()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    fn signal(n: usize) -> Vec<Complex<f32>> {
        (0..n)
            .map(|i| {
                let t = i as f32;
                Complex::new(
                    (0.3 * t).sin() + 0.5 * (1.7 * t).cos() + 0.1 * ((i * 7 % 13) as f32 - 6.0),
                    0.0,
                )
            })
            .collect()
    }

    #[test]
    fn matches_rustfft() {
        for &n in &[2usize, 8, 64, 1024, 4096] {
            let mut ours = signal(n);
            let mut reference = ours.clone();

            fft_in_place(&mut ours);
            FftPlanner::<f32>::new().plan_fft_forward(n).process(&mut reference);

            let scale = reference.iter().map(|c| c.norm()).fold(1.0f32, f32::max);
            for (k, (a, b)) in ours.iter().zip(reference.iter()).enumerate() {
                assert!(
                    (a - b).norm() / scale < 1e-4,
                    "n={} bin={} ours={} rustfft={}",
                    n,
                    k,
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn impulse_has_flat_spectrum() {
        let mut buf = vec![Complex::new(0.0f32, 0.0); 16];
        buf[0] = Complex::new(1.0, 0.0);
        fft_in_place(&mut buf);
        for c in &buf {
            assert!((c.re - 1.0).abs() < 1e-6 && c.im.abs() < 1e-6);
        }
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let n = 256;
        let frame: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 16.0 * i as f32 / n as f32).sin())
            .collect();
        let mags = magnitude_spectrum(&frame, &hann_window(n));
        assert_eq!(mags.len(), n / 2);
        let peak = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(16));
    }

    #[test]
    fn hann_endpoints_are_zero() {
        let w = hann_window(4096);
        assert!(w[0].abs() < 1e-6);
        assert!(w[4095].abs() < 1e-6);
        assert!(w.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }
}
