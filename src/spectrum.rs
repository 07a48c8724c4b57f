//! Welch power spectral density, used by the component classifier and the
//! PSD diagnostic plot.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// Welch PSD with 50 % overlapping Hann segments.
///
/// Returns `(freqs, psd)` with `freqs` in Hz up to Nyquist. `nperseg` is
/// clamped to the signal length.
pub fn welch_psd(x: &[f64], sfreq: f64, nperseg: usize) -> (Vec<f64>, Vec<f64>) {
    let nperseg = nperseg.min(x.len()).max(8);
    let step = (nperseg / 2).max(1);
    let n_freq = nperseg / 2 + 1;

    let window: Vec<f64> = (0..nperseg)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (nperseg - 1) as f64).cos())
        .collect();
    let win_norm: f64 = window.iter().map(|w| w * w).sum();

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft = planner.plan_fft_forward(nperseg);

    let mut psd = vec![0.0_f64; n_freq];
    let mut n_segments = 0usize;
    let mut start = 0usize;
    while start + nperseg <= x.len() {
        let mut buf: Vec<Complex<f64>> = (0..nperseg)
            .map(|i| Complex { re: x[start + i] * window[i], im: 0.0 })
            .collect();
        fft.process(&mut buf);
        for (k, p) in psd.iter_mut().enumerate() {
            let mag = buf[k].norm_sqr();
            // One-sided spectrum: double everything but DC and Nyquist.
            let factor = if k == 0 || (nperseg % 2 == 0 && k == n_freq - 1) { 1.0 } else { 2.0 };
            *p += factor * mag / (sfreq * win_norm);
        }
        n_segments += 1;
        start += step;
    }
    if n_segments > 0 {
        for p in &mut psd {
            *p /= n_segments as f64;
        }
    }

    let freqs = (0..n_freq).map(|k| k as f64 * sfreq / nperseg as f64).collect();
    (freqs, psd)
}

/// Mean PSD over `[lo, hi]` Hz.
pub fn band_power(freqs: &[f64], psd: &[f64], lo: f64, hi: f64) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for (&f, &p) in freqs.iter().zip(psd) {
        if f >= lo && f <= hi {
            sum += p;
            n += 1;
        }
    }
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_shows_up_at_its_frequency() {
        let sfreq = 200.0;
        let x: Vec<f64> = (0..4000)
            .map(|i| (2.0 * PI * 10.0 * i as f64 / sfreq).sin())
            .collect();
        let (freqs, psd) = welch_psd(&x, sfreq, 512);
        let peak_idx = psd
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert!((freqs[peak_idx] - 10.0).abs() < 1.0, "peak at {}", freqs[peak_idx]);
    }

    #[test]
    fn band_power_isolates_the_tone() {
        let sfreq = 200.0;
        let x: Vec<f64> = (0..4000)
            .map(|i| (2.0 * PI * 50.0 * i as f64 / sfreq).sin())
            .collect();
        let (freqs, psd) = welch_psd(&x, sfreq, 512);
        let line = band_power(&freqs, &psd, 48.0, 52.0);
        let rest = band_power(&freqs, &psd, 10.0, 30.0);
        assert!(line > 50.0 * rest.max(1e-12));
    }
}
