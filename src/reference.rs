//! Common average reference.
//!
//! `data[c, t] -= mean(data[:, t])` — each channel is re-referenced against
//! the instantaneous mean of all channels. Applied identically to the
//! full-rate signal and the filtered/downsampled derivative, since both are
//! consumed independently downstream.

use ndarray::{Array2, Axis};

pub fn average_reference_inplace(data: &mut Array2<f64>) {
    let means = data.mean_axis(Axis(0)).expect("non-empty channel axis");
    for mut row in data.rows_mut() {
        row -= &means;
    }
}
