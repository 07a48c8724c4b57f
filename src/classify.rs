//! Component labeling.
//!
//! Each independent component gets one label from a fixed taxonomy; the
//! exclusion decision is pure label membership — a component is removed
//! exactly when its label is outside the keep set {Brain, Other}, with no
//! probability cutoff.
//!
//! The classifier itself is an injected capability: the pipeline accepts any
//! [`ComponentClassifier`], mirroring the pretrained-model boundary of the
//! reference setup. [`SpectralClassifier`] is the built-in deterministic
//! stand-in, scoring components from their source spectra, topography and
//! periodicity.

use crate::ica::Ica;
use crate::spectrum::{band_power, welch_psd};
use ndarray::Array2;

/// Fixed component taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentLabel {
    Brain,
    Muscle,
    Eye,
    Heart,
    LineNoise,
    ChannelNoise,
    Other,
}

impl ComponentLabel {
    /// Only Brain and Other survive reconstruction.
    pub fn is_kept(self) -> bool {
        matches!(self, ComponentLabel::Brain | ComponentLabel::Other)
    }
}

impl std::fmt::Display for ComponentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComponentLabel::Brain => "brain",
            ComponentLabel::Muscle => "muscle",
            ComponentLabel::Eye => "eye",
            ComponentLabel::Heart => "heart",
            ComponentLabel::LineNoise => "line-noise",
            ComponentLabel::ChannelNoise => "channel-noise",
            ComponentLabel::Other => "other",
        };
        f.write_str(s)
    }
}

/// Injected component-labeling capability.
pub trait ComponentClassifier {
    /// One label per component. `sources` is `[k, T]` at `sfreq`;
    /// `positions` is the `[C, 3]` montage of the decomposed channels.
    fn classify(
        &self,
        ica: &Ica,
        sources: &Array2<f64>,
        sfreq: f64,
        positions: &Array2<f64>,
    ) -> Vec<ComponentLabel>;
}

/// Indices whose label is outside the keep set, in ascending order.
pub fn exclusion_set(labels: &[ComponentLabel]) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_kept())
        .map(|(i, _)| i)
        .collect()
}

/// Deterministic heuristic classifier.
#[derive(Debug, Clone)]
pub struct SpectralClassifier {
    /// Mains frequency checked for line-noise peaks.
    pub line_freq: f64,
}

impl Default for SpectralClassifier {
    fn default() -> Self {
        Self { line_freq: 50.0 }
    }
}

impl ComponentClassifier for SpectralClassifier {
    fn classify(
        &self,
        ica: &Ica,
        sources: &Array2<f64>,
        sfreq: f64,
        positions: &Array2<f64>,
    ) -> Vec<ComponentLabel> {
        (0..sources.nrows())
            .map(|i| self.classify_one(ica, sources, i, sfreq, positions))
            .collect()
    }
}

impl SpectralClassifier {
    fn classify_one(
        &self,
        ica: &Ica,
        sources: &Array2<f64>,
        comp: usize,
        sfreq: f64,
        positions: &Array2<f64>,
    ) -> ComponentLabel {
        let x = sources.row(comp).to_vec();
        let nyq = sfreq / 2.0;
        let (freqs, psd) = welch_psd(&x, sfreq, 512);

        let total = band_power(&freqs, &psd, 1.0, (nyq - 1.0).max(2.0)).max(1e-20);
        let low = band_power(&freqs, &psd, 1.0, 4.0);
        let alpha = band_power(&freqs, &psd, 8.0, 13.0);
        let high = band_power(&freqs, &psd, 30.0, (nyq - 5.0).max(31.0));
        let line = band_power(&freqs, &psd, self.line_freq - 2.0, self.line_freq + 2.0);
        let around_line = band_power(&freqs, &psd, self.line_freq - 12.0, self.line_freq - 4.0)
            .max(band_power(&freqs, &psd, self.line_freq + 4.0, self.line_freq + 12.0));

        // 1. Single-electrode topography → channel noise.
        if topography_concentration(ica, comp) > 0.80 {
            return ComponentLabel::ChannelNoise;
        }
        // 2. Narrowband mains peak.
        if line > 8.0 * around_line.max(1e-20) && line > 2.0 * total {
            return ComponentLabel::LineNoise;
        }
        // 3. Broadband high-frequency dominance → muscle.
        if high > 0.5 * total {
            return ComponentLabel::Muscle;
        }
        // 4. Slow, frontally loaded → eye. Without montage positions the
        //    topography test cannot pass and the component falls through.
        let frontal = frontal_share(ica, comp, positions);
        if low > 0.55 * total && frontal > 0.55 {
            return ComponentLabel::Eye;
        }
        // 5. Spiky waveform repeating at a cardiac interval.
        if kurtosis(&x) > 2.0 && heartbeat_score(&x, sfreq) > 0.35 {
            return ComponentLabel::Heart;
        }
        // 6. 1/f decline with some rhythmic content → brain.
        if (low + alpha) > 0.25 * total && high < 0.35 * total {
            return ComponentLabel::Brain;
        }
        ComponentLabel::Other
    }
}

/// Share of the component's spatial pattern carried by its strongest
/// channel (sum of squares).
fn topography_concentration(ica: &Ica, comp: usize) -> f64 {
    let col: Vec<f64> = (0..ica.mixing.nrows()).map(|c| ica.mixing[[c, comp]]).collect();
    let total: f64 = col.iter().map(|v| v * v).sum();
    if total <= 0.0 {
        return 0.0;
    }
    col.iter().map(|v| v * v).fold(0.0, f64::max) / total
}

/// Fraction of the spatial pattern's weight on anterior electrodes
/// (montage y > 0.04 m). Returns −1 when no electrode has a position.
fn frontal_share(ica: &Ica, comp: usize, positions: &Array2<f64>) -> f64 {
    let n_ch = ica.mixing.nrows().min(positions.nrows());
    let mut frontal = 0.0;
    let mut total = 0.0;
    let mut any_pos = false;
    for c in 0..n_ch {
        let w = ica.mixing[[c, comp]].abs();
        total += w;
        let y = positions[[c, 1]];
        if positions.row(c).iter().any(|&v| v != 0.0) {
            any_pos = true;
        }
        if y > 0.04 {
            frontal += w;
        }
    }
    if !any_pos || total <= 0.0 {
        return -1.0;
    }
    frontal / total
}

/// Excess kurtosis; spiky trains (QRS) score well above zero while sums
/// of sinusoids are sub-gaussian.
fn kurtosis(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let m2 = x.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return 0.0;
    }
    let m4 = x.iter().map(|&v| (v - mean).powi(4)).sum::<f64>() / n;
    m4 / (m2 * m2) - 3.0
}

/// Max normalized autocorrelation of the squared signal at lags between
/// 0.55 s and 1.5 s — QRS trains repeat in that range.
fn heartbeat_score(x: &[f64], sfreq: f64) -> f64 {
    let n = x.len();
    let mean = x.iter().sum::<f64>() / n as f64;
    let energy: Vec<f64> = x.iter().map(|&v| (v - mean) * (v - mean)).collect();
    let e_mean = energy.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = energy.iter().map(|&v| v - e_mean).collect();
    let var: f64 = centered.iter().map(|v| v * v).sum::<f64>();
    if var <= 0.0 {
        return 0.0;
    }

    let lag_lo = (0.55 * sfreq) as usize;
    let lag_hi = ((1.5 * sfreq) as usize).min(n / 2);
    let mut best = 0.0_f64;
    let mut lag = lag_lo;
    while lag < lag_hi {
        let mut acc = 0.0;
        for t in 0..n - lag {
            acc += centered[t] * centered[t + lag];
        }
        best = best.max(acc / var);
        lag += (sfreq / 50.0).max(1.0) as usize;
    }
    best
}
