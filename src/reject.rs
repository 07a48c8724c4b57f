//! Cross-validated epoch rejection.
//!
//! Peak-to-peak amplitudes per (epoch, channel) are compared against
//! per-channel thresholds drawn from a quantile grid. A candidate is a
//! (threshold quantile, interpolation count) pair; it is scored by K-fold
//! cross-validation: repair up to `k` offending channels of each validation
//! epoch by distance-weighted neighbor interpolation, then measure the RMSE
//! against the mean of the surviving training epochs. The winning candidate
//! defines the final bad-epoch mask.
//!
//! Bad epochs are only excluded from ICA fitting; they are never removed
//! from the continuous signal.

use crate::epoch::Epochs;
use anyhow::{bail, Result};
use ndarray::{s, Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

const QUANTILE_GRID: &[f64] = &[0.70, 0.80, 0.85, 0.90, 0.95];

/// Result of fitting the rejector: which epochs are bad and which candidate
/// won the grid search.
#[derive(Debug, Clone)]
pub struct RejectLog {
    pub bad_epochs: Vec<bool>,
    pub n_interpolate: usize,
    pub threshold_quantile: f64,
}

impl RejectLog {
    pub fn n_bad(&self) -> usize {
        self.bad_epochs.iter().filter(|&&b| b).count()
    }
}

/// Fit the rejector on EEG channels only.
///
/// * `picks` — indices of the EEG-type channels within the epochs.
/// * `positions` — `[C, 3]` montage positions for **all** channels.
/// * `candidates` — interpolation counts to evaluate (e.g. `[1, 2, 4]`).
pub fn fit_reject(
    epochs: &Epochs,
    picks: &[usize],
    positions: &Array2<f64>,
    candidates: &[usize],
    cv_folds: usize,
    seed: u64,
) -> Result<RejectLog> {
    let n_epochs = epochs.n_epochs();
    if picks.is_empty() {
        bail!("no EEG channels to fit the rejector on");
    }
    if candidates.is_empty() {
        bail!("empty interpolation-count candidate list");
    }
    if n_epochs < cv_folds.max(2) {
        bail!("{n_epochs} epochs is too few for {cv_folds}-fold rejection");
    }

    let ptp = peak_to_peak(epochs, picks);
    let pick_pos: Vec<[f64; 3]> = picks
        .iter()
        .map(|&c| [positions[[c, 0]], positions[[c, 1]], positions[[c, 2]]])
        .collect();

    // Seeded shuffle → deterministic folds.
    let mut order: Vec<usize> = (0..n_epochs).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let folds = split_folds(&order, cv_folds);

    let grid: Vec<(f64, usize)> = QUANTILE_GRID
        .iter()
        .flat_map(|&q| candidates.iter().map(move |&k| (q, k)))
        .collect();

    let scored: Vec<((f64, usize), f64)> = grid
        .par_iter()
        .map(|&(q, k)| ((q, k), cv_score(epochs, picks, &pick_pos, &ptp, &folds, q, k)))
        .collect();

    let (&(best_q, best_k), _) = scored
        .iter()
        .map(|(cand, score)| (cand, score))
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .expect("non-empty candidate grid");

    // Final thresholds from the full data, then the bad mask.
    let thresholds = channel_thresholds(&ptp, None, best_q);
    let bad_epochs: Vec<bool> = (0..n_epochs)
        .map(|e| bad_channel_count(&ptp, e, &thresholds) > best_k)
        .collect();

    Ok(RejectLog { bad_epochs, n_interpolate: best_k, threshold_quantile: best_q })
}

/// `[E, P]` peak-to-peak amplitude per epoch for the picked channels.
fn peak_to_peak(epochs: &Epochs, picks: &[usize]) -> Array2<f64> {
    let n_e = epochs.n_epochs();
    let mut out = Array2::zeros((n_e, picks.len()));
    for e in 0..n_e {
        for (j, &c) in picks.iter().enumerate() {
            let row = epochs.data.slice(s![e, c, ..]);
            let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
            for &v in row.iter() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
            out[[e, j]] = hi - lo;
        }
    }
    out
}

fn split_folds(order: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut folds = vec![Vec::new(); k];
    for (i, &e) in order.iter().enumerate() {
        folds[i % k].push(e);
    }
    folds
}

/// Per-channel threshold: the `q` quantile of that channel's peak-to-peak
/// values over `subset` (or all epochs when `None`).
fn channel_thresholds(ptp: &Array2<f64>, subset: Option<&[usize]>, q: f64) -> Array1<f64> {
    let n_ch = ptp.ncols();
    let mut out = Array1::zeros(n_ch);
    for c in 0..n_ch {
        let mut vals: Vec<f64> = match subset {
            Some(rows) => rows.iter().map(|&e| ptp[[e, c]]).collect(),
            None => ptp.column(c).to_vec(),
        };
        vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        out[c] = quantile_sorted(&vals, q);
    }
    out
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::INFINITY;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

fn bad_channel_count(ptp: &Array2<f64>, epoch: usize, thresholds: &Array1<f64>) -> usize {
    (0..ptp.ncols()).filter(|&c| ptp[[epoch, c]] > thresholds[c]).count()
}

/// Mean CV error of one (quantile, interpolation-count) candidate.
fn cv_score(
    epochs: &Epochs,
    picks: &[usize],
    pick_pos: &[[f64; 3]],
    ptp: &Array2<f64>,
    folds: &[Vec<usize>],
    q: f64,
    k: usize,
) -> f64 {
    let n_t = epochs.data.shape()[2];
    let mut fold_scores = Vec::with_capacity(folds.len());

    for (f, val) in folds.iter().enumerate() {
        let train: Vec<usize> = folds
            .iter()
            .enumerate()
            .filter(|(g, _)| *g != f)
            .flat_map(|(_, fold)| fold.iter().copied())
            .collect();

        let thresholds = channel_thresholds(ptp, Some(&train), q);

        // Reference: mean over training epochs that survive at this candidate.
        let good_train: Vec<usize> = train
            .iter()
            .copied()
            .filter(|&e| bad_channel_count(ptp, e, &thresholds) <= k)
            .collect();
        if good_train.is_empty() {
            fold_scores.push(f64::INFINITY);
            continue;
        }
        let mut evoked = Array2::<f64>::zeros((picks.len(), n_t));
        for &e in &good_train {
            for (j, &c) in picks.iter().enumerate() {
                for t in 0..n_t {
                    evoked[[j, t]] += epochs.data[[e, c, t]];
                }
            }
        }
        evoked /= good_train.len() as f64;

        // Score the repairable validation epochs.
        let mut err_sum = 0.0;
        let mut n_scored = 0usize;
        for &e in val {
            let offenders: Vec<usize> = (0..picks.len())
                .filter(|&j| ptp[[e, j]] > thresholds[j])
                .collect();
            if offenders.len() > k {
                continue; // epoch would be rejected outright
            }
            let repaired = repair_epoch(epochs, picks, pick_pos, e, &offenders);
            let mut sq = 0.0;
            for j in 0..picks.len() {
                for t in 0..n_t {
                    let d = repaired[[j, t]] - evoked[[j, t]];
                    sq += d * d;
                }
            }
            err_sum += (sq / (picks.len() * n_t) as f64).sqrt();
            n_scored += 1;
        }
        if n_scored == 0 {
            fold_scores.push(f64::INFINITY);
        } else {
            fold_scores.push(err_sum / n_scored as f64);
        }
    }

    fold_scores.iter().sum::<f64>() / fold_scores.len() as f64
}

/// Copy one epoch's picked channels, replacing `offenders` by an
/// inverse-square-distance weighted average of the remaining channels.
fn repair_epoch(
    epochs: &Epochs,
    picks: &[usize],
    pick_pos: &[[f64; 3]],
    epoch: usize,
    offenders: &[usize],
) -> Array2<f64> {
    let n_t = epochs.data.shape()[2];
    let mut out = Array2::zeros((picks.len(), n_t));
    for (j, &c) in picks.iter().enumerate() {
        for t in 0..n_t {
            out[[j, t]] = epochs.data[[epoch, c, t]];
        }
    }

    for &bad in offenders {
        let donors: Vec<usize> =
            (0..picks.len()).filter(|j| !offenders.contains(j)).collect();
        if donors.is_empty() {
            continue;
        }
        let weights: Vec<f64> = donors
            .iter()
            .map(|&d| {
                let dx = pick_pos[bad][0] - pick_pos[d][0];
                let dy = pick_pos[bad][1] - pick_pos[d][1];
                let dz = pick_pos[bad][2] - pick_pos[d][2];
                let dist_sq = dx * dx + dy * dy + dz * dz;
                if dist_sq > 1e-12 {
                    1.0 / dist_sq
                } else {
                    // No usable geometry; plain average.
                    1.0
                }
            })
            .collect();
        let w_sum: f64 = weights.iter().sum();
        for t in 0..n_t {
            let mut acc = 0.0;
            for (&d, &w) in donors.iter().zip(&weights) {
                acc += w * epochs.data[[epoch, picks[d], t]];
            }
            out[[bad, t]] = acc / w_sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch::make_fixed_length_epochs;

    fn synthetic_epochs(n_epochs: usize, spikes: &[usize]) -> Epochs {
        // 4 channels of low-amplitude sine; selected epochs get a large
        // transient on every channel.
        let n_t = n_epochs * 100;
        let data = Array2::from_shape_fn((4, n_t), |(c, t)| {
            let e = t / 100;
            let base = (t as f64 / 7.0 + c as f64).sin();
            if spikes.contains(&e) && t % 100 == 50 {
                base + 80.0
            } else {
                base
            }
        });
        make_fixed_length_epochs(&data, 100, 200.0)
    }

    #[test]
    fn spiked_epochs_are_flagged() {
        let epochs = synthetic_epochs(20, &[3, 11]);
        let picks = vec![0, 1, 2, 3];
        let positions = Array2::zeros((4, 3));
        let log =
            fit_reject(&epochs, &picks, &positions, &[1, 2, 4], 5, 42).unwrap();
        assert!(log.bad_epochs[3], "epoch 3 should be bad");
        assert!(log.bad_epochs[11], "epoch 11 should be bad");
        assert!(log.n_bad() <= 6, "rejector flags too aggressively: {}", log.n_bad());
    }

    #[test]
    fn clean_data_keeps_most_epochs() {
        let epochs = synthetic_epochs(20, &[]);
        let picks = vec![0, 1, 2, 3];
        let positions = Array2::zeros((4, 3));
        let log =
            fit_reject(&epochs, &picks, &positions, &[1, 2, 4], 5, 42).unwrap();
        assert!(log.n_bad() <= 20 / 2);
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let epochs = synthetic_epochs(15, &[7]);
        let picks = vec![0, 1, 2, 3];
        let positions = Array2::zeros((4, 3));
        let a = fit_reject(&epochs, &picks, &positions, &[1, 2], 3, 42).unwrap();
        let b = fit_reject(&epochs, &picks, &positions, &[1, 2], 3, 42).unwrap();
        assert_eq!(a.bad_epochs, b.bad_epochs);
        assert_eq!(a.n_interpolate, b.n_interpolate);
    }

    #[test]
    fn too_few_epochs_is_an_error() {
        let epochs = synthetic_epochs(3, &[]);
        let picks = vec![0, 1, 2, 3];
        let positions = Array2::zeros((4, 3));
        assert!(fit_reject(&epochs, &picks, &positions, &[1], 5, 42).is_err());
    }
}
