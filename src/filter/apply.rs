//! Overlap-add zero-phase FIR convolution.
//!
//! Zero phase comes from shifting the linear-phase output left by `(N−1)/2`
//! samples rather than filtering twice. The edge transient is suppressed by
//! reflect-limited padding of `N−1` samples on each side.

use anyhow::Result;
use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

/// Filter each channel of `data` (`[C, T]`) in place. `h` must be odd-length.
pub fn apply_fir_zero_phase(data: &mut Array2<f64>, h: &[f64]) -> Result<()> {
    for ch in 0..data.nrows() {
        let row: Vec<f64> = data.row(ch).to_vec();
        let filtered = filter_1d(&row, h)?;
        data.row_mut(ch).assign(&ndarray::ArrayView1::from(&filtered));
    }
    Ok(())
}

/// Overlap-add filter a single signal; the output has the same length.
pub fn filter_1d(x: &[f64], h: &[f64]) -> Result<Vec<f64>> {
    let n_x = x.len();
    let n_h = h.len();
    if n_x == 0 {
        return Ok(vec![]);
    }

    let shift = (n_h - 1) / 2;
    let n_edge = n_h - 1;

    let x_ext = reflect_limited_pad(x, n_edge, n_edge);
    let n_ext = x_ext.len();

    let n_fft = choose_fft_len(n_h, n_ext);
    let h_fft = fft_of_h(h, n_fft);

    let n_seg = n_fft - n_h + 1;
    let n_segments = n_ext.div_ceil(n_seg);
    let mut x_filtered = vec![0.0_f64; n_ext];

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft_fwd = planner.plan_fft_forward(n_fft);
    let fft_inv = planner.plan_fft_inverse(n_fft);
    let inv_scale = 1.0 / n_fft as f64;

    for seg_idx in 0..n_segments {
        let start = seg_idx * n_seg;
        let stop = (start + n_seg).min(n_ext);

        let mut buf: Vec<Complex<f64>> = x_ext[start..stop]
            .iter()
            .map(|&v| Complex { re: v, im: 0.0 })
            .chain(std::iter::repeat(Complex::default()))
            .take(n_fft)
            .collect();

        fft_fwd.process(&mut buf);
        for (b, &hf) in buf.iter_mut().zip(h_fft.iter()) {
            *b *= hf;
        }
        fft_inv.process(&mut buf);

        // Accumulate, accounting for the zero-phase shift.
        let out_start = start.saturating_sub(shift);
        let out_end = (out_start + n_fft).min(n_ext);
        let prod_start = if start < shift { shift - start } else { 0 };
        for (o, p) in (out_start..out_end).zip(prod_start..) {
            if p < buf.len() {
                x_filtered[o] += buf[p].re * inv_scale;
            }
        }
    }

    Ok(x_filtered[n_edge..n_edge + n_x].to_vec())
}

/// Reflect-limited padding: odd reflection about the first/last sample,
/// zero-filled when the requested pad exceeds the signal.
fn reflect_limited_pad(x: &[f64], n_l: usize, n_r: usize) -> Vec<f64> {
    let n = x.len();
    let actual_l = n_l.min(n - 1);
    let actual_r = n_r.min(n - 1);

    let mut out = Vec::with_capacity(n_l + n + n_r);
    for _ in actual_l..n_l {
        out.push(0.0);
    }
    for i in (1..=actual_l).rev() {
        out.push(2.0 * x[0] - x[i]);
    }
    out.extend_from_slice(x);
    let last = x[n - 1];
    for i in 1..=actual_r {
        let idx = (n - 1).saturating_sub(i);
        out.push(2.0 * last - x[idx]);
    }
    for _ in actual_r..n_r {
        out.push(0.0);
    }
    out
}

/// Power-of-two FFT size minimising the overlap-add operation count.
fn choose_fft_len(n_h: usize, n_x: usize) -> usize {
    let min_fft = 2 * n_h - 1;
    let max_pow = (n_x as f64).log2().ceil() as u32 + 1;
    let min_pow = (min_fft as f64).log2().ceil() as u32;

    let mut best_n = 1_usize << max_pow;
    let mut best_cost = f64::INFINITY;
    for pow in min_pow..=max_pow {
        let n = 1_usize << pow;
        if n < min_fft {
            continue;
        }
        let n_seg = (n - n_h + 1) as f64;
        let cost = (n_x as f64 / n_seg).ceil() * n as f64 * (pow as f64 + 1.0)
            + 4e-5 * n as f64 * n_x as f64;
        if cost < best_cost {
            best_cost = cost;
            best_n = n;
        }
    }
    best_n
}

fn fft_of_h(h: &[f64], n_fft: usize) -> Vec<Complex<f64>> {
    let mut buf: Vec<Complex<f64>> = h
        .iter()
        .map(|&v| Complex { re: v, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(n_fft)
        .collect();
    let mut planner: FftPlanner<f64> = FftPlanner::new();
    planner.plan_fft_forward(n_fft).process(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::design::{design_bandpass, design_highpass};

    #[test]
    fn output_length_matches_input() {
        let x: Vec<f64> = (0..2048).map(|i| (i as f64 / 64.0).sin()).collect();
        let h = design_highpass(1.0, 200.0);
        assert_eq!(filter_1d(&x, &h).unwrap().len(), x.len());
    }

    #[test]
    fn highpass_removes_dc() {
        let x = vec![1.0_f64; 8192];
        let h = design_highpass(1.0, 200.0);
        let y = filter_1d(&x, &h).unwrap();
        let n_h = h.len().min(y.len() / 4);
        let interior = &y[n_h..y.len() - n_h];
        let max_val = interior.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        assert!(max_val < 1e-3, "DC not removed: max={max_val}");
    }

    #[test]
    fn bandpass_attenuates_out_of_band_tone() {
        // 180 Hz tone at 500 Hz sampling sits above the [1, 100] Hz band.
        let sfreq = 500.0;
        let x: Vec<f64> = (0..16384)
            .map(|i| (2.0 * std::f64::consts::PI * 180.0 * i as f64 / sfreq).sin())
            .collect();
        let h = design_bandpass(1.0, 100.0, sfreq);
        let y = filter_1d(&x, &h).unwrap();
        let mid = &y[4096..12288];
        let rms = (mid.iter().map(|v| v * v).sum::<f64>() / mid.len() as f64).sqrt();
        assert!(rms < 0.02, "out-of-band rms = {rms}");
    }

    #[test]
    fn reflect_pad_odd_reflection() {
        let x = [1.0_f64, 2.0, 3.0, 4.0, 5.0];
        let padded = reflect_limited_pad(&x, 3, 0);
        assert_eq!(&padded[..3], &[-2.0, -1.0, 0.0]);
        assert_eq!(&padded[3..], &x[..]);
    }
}
