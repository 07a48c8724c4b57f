//! Independent component analysis: PCA whitening followed by extended
//! infomax, the variant recommended for component classification.
//!
//! The component count is chosen so the retained PCA subspace explains the
//! configured fraction of variance (0.99 by default). Fitting uses only the
//! epochs the rejector kept, subsampled for speed; the fitted spatial
//! filters are sampling-rate independent and are applied to the full-rate
//! band-limited signal at reconstruction time.

use anyhow::{bail, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const MAX_ITER: usize = 200;
const W_CHANGE_TOL: f64 = 1e-7;
const ANNEAL_DEG: f64 = 60.0;
const ANNEAL_SCALE: f64 = 0.9;
const EXT_BLOCKS: usize = 1;

/// A fitted decomposition: spatial filters into component space and back.
#[derive(Debug, Clone)]
pub struct Ica {
    /// `[k, C]` — data → sources.
    pub unmixing: Array2<f64>,
    /// `[C, k]` — sources → data.
    pub mixing: Array2<f64>,
    pub n_components: usize,
    /// Fraction of total variance explained by the retained subspace.
    pub explained_variance: f64,
}

impl Ica {
    /// Component time series for `data` (`[C, T]`): `[k, T]`.
    pub fn sources(&self, data: &Array2<f64>) -> Array2<f64> {
        let centered = center(data).0;
        self.unmixing.dot(&centered)
    }

    /// Project the listed components out of `data` in place.
    ///
    /// `X ← X − A[:, excl] · (U[excl, :] · (X − μ))`, with `μ` the
    /// per-channel mean of `X`; variance outside the retained PCA subspace
    /// is untouched.
    pub fn apply(&self, data: &mut Array2<f64>, exclude: &[usize]) -> Result<()> {
        for &i in exclude {
            if i >= self.n_components {
                bail!("component index {i} out of range ({} components)", self.n_components);
            }
        }
        if exclude.is_empty() {
            return Ok(());
        }
        let (centered, means) = center(data);

        let k = exclude.len();
        let n_ch = data.nrows();
        let mut u_excl = Array2::zeros((k, n_ch));
        let mut a_excl = Array2::zeros((n_ch, k));
        for (j, &comp) in exclude.iter().enumerate() {
            for c in 0..n_ch {
                u_excl[[j, c]] = self.unmixing[[comp, c]];
                a_excl[[c, j]] = self.mixing[[c, comp]];
            }
        }

        let sources = u_excl.dot(&centered);
        let artifact = a_excl.dot(&sources);
        for c in 0..n_ch {
            for t in 0..data.ncols() {
                data[[c, t]] = centered[[c, t]] - artifact[[c, t]] + means[c];
            }
        }
        Ok(())
    }
}

/// Fit an extended-infomax ICA on `data` (`[C, T]`, already band-limited).
///
/// `variance` selects the PCA dimensionality; `seed` makes the block
/// shuffling reproducible.
pub fn fit_ica(data: &Array2<f64>, variance: f64, seed: u64) -> Result<Ica> {
    let (n_ch, n_t) = data.dim();
    if n_ch < 2 {
        bail!("ICA requires at least 2 channels, got {n_ch}");
    }
    if n_t < 10 * n_ch {
        bail!("{n_t} samples is too few to decompose {n_ch} channels");
    }

    let (centered, _) = center(data);

    // ── PCA whitening ─────────────────────────────────────────────────────
    let cov = covariance(&centered);
    let eigen = SymmetricEigen::new(cov);
    let mut pairs: Vec<(f64, usize)> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, &v)| (v.max(0.0), i))
        .collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = pairs.iter().map(|(v, _)| v).sum();
    if total <= 0.0 {
        bail!("signal has zero variance");
    }
    let mut cum = 0.0;
    let mut k = 0;
    for (v, _) in &pairs {
        cum += v;
        k += 1;
        if cum / total >= variance {
            break;
        }
    }
    let explained = pairs.iter().take(k).map(|(v, _)| v).sum::<f64>() / total;

    // Whitening matrix D^{-1/2} Eᵀ, [k, C].
    let mut whiten = Array2::zeros((k, n_ch));
    let mut color = Array2::zeros((n_ch, k)); // E D^{1/2}, its right inverse
    for (row, &(val, idx)) in pairs.iter().take(k).enumerate() {
        let scale = val.sqrt().max(1e-12);
        for c in 0..n_ch {
            let e = eigen.eigenvectors[(c, idx)];
            whiten[[row, c]] = e / scale;
            color[[c, row]] = e * scale;
        }
    }
    let z = whiten.dot(&centered); // [k, T]

    // ── Extended infomax ──────────────────────────────────────────────────
    let w = infomax_extended(&z, seed)?;

    let unmixing = w.dot(&whiten);
    let w_inv = invert(&w)?;
    let mixing = color.dot(&w_inv);

    Ok(Ica { unmixing, mixing, n_components: k, explained_variance: explained })
}

/// Extended-infomax iteration on whitened data `z` (`[k, T]`).
/// Returns the square unmixing rotation `W` (`[k, k]`).
fn infomax_extended(z: &Array2<f64>, seed: u64) -> Result<Array2<f64>> {
    let (k, n_t) = z.dim();
    let block = ((n_t as f64 / 3.0).sqrt().floor() as usize).clamp(8, n_t);
    let mut l_rate = 0.01 / (k as f64).ln().max(1.0);

    let mut w = Array2::<f64>::eye(k);
    // Kurtosis signs: +1 super-gaussian, −1 sub-gaussian.
    let mut signs = Array1::<f64>::ones(k);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n_t).collect();
    let mut old_w = w.clone();
    let mut old_delta: Option<Array2<f64>> = None;

    for _iter in 0..MAX_ITER {
        order.shuffle(&mut rng);

        let mut blocks_done = 0usize;
        for chunk in order.chunks(block) {
            let b = chunk.len();
            // u = W · z[:, chunk]
            let mut zb = Array2::zeros((k, b));
            for (j, &t) in chunk.iter().enumerate() {
                for c in 0..k {
                    zb[[c, j]] = z[[c, t]];
                }
            }
            let u = w.dot(&zb);
            let y = u.mapv(f64::tanh);

            // ΔW = lr · (b·I − K·y·uᵀ − u·uᵀ) · W
            let yut = y.dot(&u.t());
            let uut = u.dot(&u.t());
            let mut factor = Array2::<f64>::eye(k) * b as f64;
            for r in 0..k {
                for c in 0..k {
                    factor[[r, c]] -= signs[r] * yut[[r, c]] + uut[[r, c]];
                }
            }
            let delta = factor.dot(&w) * l_rate;
            w += &delta;

            if !w.iter().all(|v| v.is_finite()) {
                bail!("infomax diverged; learning rate too large for this data");
            }

            blocks_done += 1;
            // Re-estimate kurtosis signs periodically.
            if blocks_done % (EXT_BLOCKS * 16).max(1) == 0 {
                let s = w.dot(z);
                for c in 0..k {
                    signs[c] = if kurtosis(s.row(c).to_vec().as_slice()) > 0.0 {
                        1.0
                    } else {
                        -1.0
                    };
                }
            }
        }

        let delta_w = &w - &old_w;
        let change: f64 = delta_w.iter().map(|v| v * v).sum();

        // Anneal when the update direction swings by more than 60°.
        if let Some(prev) = &old_delta {
            let dot: f64 = delta_w.iter().zip(prev.iter()).map(|(a, b)| a * b).sum();
            let n1: f64 = delta_w.iter().map(|v| v * v).sum::<f64>().sqrt();
            let n2: f64 = prev.iter().map(|v| v * v).sum::<f64>().sqrt();
            if n1 > 0.0 && n2 > 0.0 {
                let angle = (dot / (n1 * n2)).clamp(-1.0, 1.0).acos().to_degrees();
                if angle > ANNEAL_DEG {
                    l_rate *= ANNEAL_SCALE;
                }
            }
        }
        old_delta = Some(delta_w);
        old_w = w.clone();

        if change < W_CHANGE_TOL {
            break;
        }
    }
    Ok(w)
}

fn center(data: &Array2<f64>) -> (Array2<f64>, Array1<f64>) {
    let (n_ch, n_t) = data.dim();
    let mut means = Array1::zeros(n_ch);
    for c in 0..n_ch {
        means[c] = data.row(c).mean().unwrap_or(0.0);
    }
    let mut out = data.clone();
    for c in 0..n_ch {
        for t in 0..n_t {
            out[[c, t]] -= means[c];
        }
    }
    (out, means)
}

fn covariance(centered: &Array2<f64>) -> DMatrix<f64> {
    let (n_ch, n_t) = centered.dim();
    let xxt = centered.dot(&centered.t());
    let denom = (n_t.max(2) - 1) as f64;
    DMatrix::from_fn(n_ch, n_ch, |r, c| xxt[[r, c]] / denom)
}

fn invert(w: &Array2<f64>) -> Result<Array2<f64>> {
    let k = w.nrows();
    let m = DMatrix::from_fn(k, k, |r, c| w[[r, c]]);
    let inv = m
        .try_inverse()
        .ok_or_else(|| anyhow::anyhow!("singular unmixing rotation"))?;
    Ok(Array2::from_shape_fn((k, k), |(r, c)| inv[(r, c)]))
}

fn kurtosis(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let m2 = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return 0.0;
    }
    let m4 = x.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / n;
    m4 / (m2 * m2) - 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two independent non-gaussian sources mixed into three channels.
    fn mixed_signals(n_t: usize) -> (Array2<f64>, Array2<f64>) {
        let mut sources = Array2::zeros((2, n_t));
        for t in 0..n_t {
            let x = t as f64;
            sources[[0, t]] = (x / 11.0).sin().powi(3); // super-gaussian-ish
            sources[[1, t]] = ((x / 7.3).sin() + (x / 3.1).sin()).signum() * 0.8;
        }
        let mixing =
            Array2::from_shape_vec((3, 2), vec![1.0, 0.4, 0.5, 1.0, -0.7, 0.3]).unwrap();
        (mixing.dot(&sources), sources)
    }

    #[test]
    fn component_count_respects_variance_target() {
        let (data, _) = mixed_signals(4000);
        // Rank-2 data: two components suffice for any target.
        let ica = fit_ica(&data, 0.99, 42).unwrap();
        assert!(ica.n_components <= 2);
        assert!(ica.explained_variance >= 0.99);
    }

    #[test]
    fn sources_are_nearly_uncorrelated() {
        let (data, _) = mixed_signals(4000);
        let ica = fit_ica(&data, 0.99, 42).unwrap();
        if ica.n_components < 2 {
            return;
        }
        let s = ica.sources(&data);
        let a = s.row(0).to_vec();
        let b = s.row(1).to_vec();
        let corr = correlation(&a, &b);
        assert!(corr.abs() < 0.25, "components correlate: {corr}");
    }

    #[test]
    fn excluding_nothing_is_identity() {
        let (data, _) = mixed_signals(2000);
        let ica = fit_ica(&data, 0.99, 42).unwrap();
        let mut copy = data.clone();
        ica.apply(&mut copy, &[]).unwrap();
        for (a, b) in copy.iter().zip(data.iter()) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn excluding_all_components_flattens_the_subspace() {
        let (data, _) = mixed_signals(2000);
        let ica = fit_ica(&data, 0.999, 42).unwrap();
        let all: Vec<usize> = (0..ica.n_components).collect();
        let mut copy = data.clone();
        ica.apply(&mut copy, &all).unwrap();
        // Rank-2 data with both components removed leaves only the mean.
        let resid: f64 = {
            let (centered, _) = center(&copy);
            centered.iter().map(|v| v * v).sum::<f64>() / centered.len() as f64
        };
        let orig: f64 = {
            let (centered, _) = center(&data);
            centered.iter().map(|v| v * v).sum::<f64>() / centered.len() as f64
        };
        assert!(resid < orig * 0.05, "residual power {resid} vs original {orig}");
    }

    #[test]
    fn out_of_range_exclusion_is_rejected() {
        let (data, _) = mixed_signals(1000);
        let ica = fit_ica(&data, 0.99, 42).unwrap();
        let mut copy = data.clone();
        assert!(ica.apply(&mut copy, &[99]).is_err());
    }

    fn correlation(a: &[f64], b: &[f64]) -> f64 {
        let n = a.len() as f64;
        let ma = a.iter().sum::<f64>() / n;
        let mb = b.iter().sum::<f64>() / n;
        let mut cov = 0.0;
        let mut va = 0.0;
        let mut vb = 0.0;
        for (&x, &y) in a.iter().zip(b) {
            cov += (x - ma) * (y - mb);
            va += (x - ma).powi(2);
            vb += (y - mb).powi(2);
        }
        cov / (va.sqrt() * vb.sqrt()).max(1e-12)
    }
}
