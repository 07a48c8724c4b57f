//! Fixed-length segmentation.
//!
//! Splits a continuous `[C, T]` signal into contiguous non-overlapping
//! windows, `[E, C, epoch_samples]`, dropping the trailing partial window.
//! No baseline correction: the windows are the unit of analysis for
//! rejection and ICA fitting only, never the export.

use ndarray::{s, Array2, Array3};

/// Epoched view of a recording at a given sampling rate.
#[derive(Debug, Clone)]
pub struct Epochs {
    /// `[E, C, T]`
    pub data: Array3<f64>,
    pub sfreq: f64,
}

impl Epochs {
    pub fn n_epochs(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn n_channels(&self) -> usize {
        self.data.shape()[1]
    }

    /// Concatenate the epochs whose mask entry is `false` (good epochs)
    /// back into a continuous `[C, T_good]` matrix, keeping every
    /// `decim`-th sample.
    pub fn concat_good(&self, bad: &[bool], decim: usize) -> Array2<f64> {
        assert_eq!(bad.len(), self.n_epochs());
        let decim = decim.max(1);
        let (_, n_ch, n_t) = self.data.dim();
        let kept: Vec<usize> =
            (0..self.n_epochs()).filter(|&e| !bad[e]).collect();
        let per_epoch = n_t.div_ceil(decim);
        let mut out = Array2::zeros((n_ch, kept.len() * per_epoch));
        for (j, &e) in kept.iter().enumerate() {
            for c in 0..n_ch {
                for (k, t) in (0..n_t).step_by(decim).enumerate() {
                    out[[c, j * per_epoch + k]] = self.data[[e, c, t]];
                }
            }
        }
        out
    }
}

/// Segment `data` (`[C, T]`) into fixed windows of `epoch_samples`.
pub fn make_fixed_length_epochs(data: &Array2<f64>, epoch_samples: usize, sfreq: f64) -> Epochs {
    let (n_ch, n_t) = data.dim();
    let n_epochs = n_t / epoch_samples;
    let mut out = Array3::<f64>::zeros((n_epochs, n_ch, epoch_samples));
    for e in 0..n_epochs {
        let start = e * epoch_samples;
        out.slice_mut(s![e, .., ..])
            .assign(&data.slice(s![.., start..start + epoch_samples]));
    }
    Epochs { data: out, sfreq }
}
