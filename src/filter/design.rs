//! FIR design matching MNE / `scipy.signal.firwin`.
//!
//! Transition bandwidth rule: `min(max(0.25 · f, 2.0), bound)` where the
//! bound is the cutoff itself for a highpass edge and the headroom to
//! Nyquist for a lowpass edge. Filter length: `ceil(3.3 / trans_bw · sfreq)`
//! rounded up to odd, as required for a linear-phase type-I FIR.

use std::f64::consts::PI;

/// MNE's automatic transition bandwidth for a filter edge at `freq` Hz.
/// `upper_bound` caps the band (the cutoff for highpass, Nyquist headroom
/// for lowpass).
pub fn auto_trans_bandwidth(freq: f64, upper_bound: f64) -> f64 {
    (0.25 * freq).max(2.0).min(upper_bound)
}

/// Number of taps for a given transition bandwidth, rounded up to odd.
pub fn auto_filter_length(trans_bw: f64, sfreq: f64) -> usize {
    let n = (3.3 / trans_bw * sfreq).ceil() as usize;
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

/// Hamming-windowed sinc lowpass (`pass_zero = true`) or highpass
/// (`pass_zero = false`, via spectral inversion). `cutoff_hz` is the −6 dB
/// point; `n` must be odd.
pub fn firwin(n: usize, cutoff_hz: f64, sfreq: f64, pass_zero: bool) -> Vec<f64> {
    assert!(n % 2 == 1, "firwin requires odd N for a linear-phase filter");
    let alpha = (n - 1) as f64 / 2.0;
    let nyq = sfreq / 2.0;
    let fc = cutoff_hz / nyq; // normalised [0, 1]

    let win = hamming(n);
    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * win[i]
        })
        .collect();

    // Unit DC gain for the lowpass prototype.
    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);

    if !pass_zero {
        h.iter_mut().for_each(|v| *v = -*v);
        h[n / 2] += 1.0;
    }
    h
}

/// Highpass at `l_freq`. The firwin cutoff sits at the midpoint of the
/// transition band below the passband edge.
pub fn design_highpass(l_freq: f64, sfreq: f64) -> Vec<f64> {
    let tb = auto_trans_bandwidth(l_freq, l_freq);
    let n = auto_filter_length(tb, sfreq);
    let cutoff = l_freq - tb / 2.0;
    firwin(n, cutoff, sfreq, false)
}

/// Lowpass at `h_freq`, transition band capped by the headroom to Nyquist.
pub fn design_lowpass(h_freq: f64, sfreq: f64) -> Vec<f64> {
    let tb = auto_trans_bandwidth(h_freq, (sfreq / 2.0 - h_freq).max(0.5));
    let n = auto_filter_length(tb, sfreq);
    let cutoff = h_freq + tb / 2.0;
    firwin(n, cutoff, sfreq, true)
}

/// Bandpass [`l_freq`, `h_freq`]: difference of two equal-length lowpass
/// prototypes, one at each band edge's firwin cutoff.
pub fn design_bandpass(l_freq: f64, h_freq: f64, sfreq: f64) -> Vec<f64> {
    assert!(l_freq < h_freq, "bandpass requires l_freq < h_freq");
    let tb_l = auto_trans_bandwidth(l_freq, l_freq);
    let tb_h = auto_trans_bandwidth(h_freq, (sfreq / 2.0 - h_freq).max(0.5));
    let n = auto_filter_length(tb_l, sfreq).max(auto_filter_length(tb_h, sfreq));

    let low_edge = l_freq - tb_l / 2.0;
    let high_edge = h_freq + tb_h / 2.0;
    let lp_high = firwin(n, high_edge, sfreq, true);
    let lp_low = firwin(n, low_edge, sfreq, true);
    lp_high.iter().zip(&lp_low).map(|(a, b)| a - b).collect()
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Gain of a FIR at frequency `f` via direct DTFT evaluation.
    fn gain_at(h: &[f64], f: f64, sfreq: f64) -> f64 {
        let w = 2.0 * PI * f / sfreq;
        let (mut re, mut im) = (0.0, 0.0);
        for (i, &v) in h.iter().enumerate() {
            re += v * (w * i as f64).cos();
            im -= v * (w * i as f64).sin();
        }
        (re * re + im * im).sqrt()
    }

    #[test]
    fn lengths_are_odd() {
        for f in [1.0, 2.0, 40.0, 100.0] {
            let tb = auto_trans_bandwidth(f, f);
            assert!(auto_filter_length(tb, 200.0) % 2 == 1);
        }
    }

    #[test]
    fn highpass_blocks_dc() {
        let h = design_highpass(1.0, 200.0);
        let s: f64 = h.iter().sum();
        assert!(s.abs() < 1e-9, "highpass DC gain = {s}");
    }

    #[test]
    fn lowpass_unit_dc_gain() {
        let h = design_lowpass(40.0, 500.0);
        let dc: f64 = h.iter().sum();
        approx::assert_abs_diff_eq!(dc, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn bandpass_passes_midband_blocks_edges() {
        let h = design_bandpass(1.0, 100.0, 500.0);
        assert!(h.len() % 2 == 1);
        assert!(gain_at(&h, 0.0, 500.0).abs() < 1e-6);
        approx::assert_abs_diff_eq!(gain_at(&h, 30.0, 500.0), 1.0, epsilon = 1e-2);
        assert!(gain_at(&h, 200.0, 500.0) < 1e-3);
    }

    #[test]
    fn bandpass_is_symmetric() {
        let h = design_bandpass(1.0, 40.0, 200.0);
        let n = h.len();
        for i in 0..n / 2 {
            approx::assert_abs_diff_eq!(h[i], h[n - 1 - i], epsilon = 1e-12);
        }
    }
}
