use eegprep::filter::{
    apply_fir_zero_phase, design_bandpass, design_highpass, design_lowpass,
};
use ndarray::Array2;
use std::f64::consts::PI;

// ── Coefficient tests ─────────────────────────────────────────────────────

#[test]
fn highpass_coeffs_sum_near_zero() {
    // Highpass: sum of coefficients ≈ 0 (zero DC gain).
    let h = design_highpass(1.0, 500.0);
    let s: f64 = h.iter().sum();
    assert!(s.abs() < 1e-9, "sum(h) = {s:.2e}, expected ≈ 0 for highpass");
}

#[test]
fn lowpass_coeffs_sum_to_one() {
    let h = design_lowpass(40.0, 500.0);
    let s: f64 = h.iter().sum();
    assert!((s - 1.0).abs() < 1e-9, "sum(h) = {s}, expected ≈ 1 for lowpass");
}

#[test]
fn coeffs_are_symmetric_and_odd_length() {
    for h in [
        design_highpass(1.0, 500.0),
        design_lowpass(100.0, 500.0),
        design_bandpass(1.0, 40.0, 500.0),
    ] {
        let n = h.len();
        assert_eq!(n % 2, 1, "even-length kernel breaks zero-phase shifting");
        for i in 0..n / 2 {
            assert!((h[i] - h[n - 1 - i]).abs() < 1e-12);
        }
    }
}

// ── Application tests ─────────────────────────────────────────────────────

fn tone(freq: f64, sfreq: f64, n: usize) -> Vec<f64> {
    (0..n).map(|t| (2.0 * PI * freq * t as f64 / sfreq).sin()).collect()
}

fn rms(x: &[f64]) -> f64 {
    (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
}

#[test]
fn bandpass_passes_midband_and_rejects_stopband() {
    let sfreq = 500.0;
    let n = 10_000;
    let h = design_bandpass(1.0, 40.0, sfreq);

    let mut mid = Array2::from_shape_vec((1, n), tone(10.0, sfreq, n)).unwrap();
    apply_fir_zero_phase(&mut mid, &h).unwrap();
    let mid_rms = rms(&mid.row(0).to_vec()[n / 4..3 * n / 4]);
    assert!((mid_rms - 1.0 / 2.0_f64.sqrt()).abs() < 0.05, "10 Hz rms = {mid_rms}");

    let mut stop = Array2::from_shape_vec((1, n), tone(120.0, sfreq, n)).unwrap();
    apply_fir_zero_phase(&mut stop, &h).unwrap();
    let stop_rms = rms(&stop.row(0).to_vec()[n / 4..3 * n / 4]);
    assert!(stop_rms < 0.02, "120 Hz rms = {stop_rms}, expected strong attenuation");
}

#[test]
fn highpass_removes_dc_offset() {
    let sfreq = 500.0;
    let n = 8_000;
    let x: Vec<f64> = tone(10.0, sfreq, n).iter().map(|v| v + 50.0).collect();
    let mut data = Array2::from_shape_vec((1, n), x).unwrap();
    apply_fir_zero_phase(&mut data, &design_highpass(1.0, sfreq)).unwrap();
    let mean: f64 =
        data.row(0).to_vec()[n / 4..3 * n / 4].iter().sum::<f64>() / (n / 2) as f64;
    assert!(mean.abs() < 0.5, "residual mean {mean} after 1 Hz highpass");
}

#[test]
fn zero_phase_keeps_signal_aligned() {
    // A tone filtered inside its passband must stay in phase: the
    // correlation with the input peaks at zero lag.
    let sfreq = 500.0;
    let n = 8_000;
    let x = tone(10.0, sfreq, n);
    let mut data = Array2::from_shape_vec((1, n), x.clone()).unwrap();
    apply_fir_zero_phase(&mut data, &design_bandpass(1.0, 40.0, sfreq)).unwrap();

    let y = data.row(0).to_vec();
    let corr = |lag: i64| -> f64 {
        let mut acc = 0.0;
        for t in n / 4..3 * n / 4 {
            let s = (t as i64 + lag) as usize;
            acc += x[t] * y[s];
        }
        acc
    };
    let at_zero = corr(0);
    // Quarter period of the 10 Hz tone = 12.5 samples.
    assert!(at_zero > corr(12), "phase shifted: c(0)={at_zero}, c(12)={}", corr(12));
    assert!(at_zero > corr(-12));
}
