//! Zero-phase FIR filtering: Hamming-windowed sinc design plus overlap-add
//! FFT convolution, compatible with MNE's `filter(..., fir_design='firwin',
//! fir_window='hamming', phase='zero')` defaults.

pub mod apply;
pub mod design;

pub use apply::{apply_fir_zero_phase, filter_1d};
pub use design::{
    auto_filter_length, auto_trans_bandwidth, design_bandpass, design_highpass,
    design_lowpass, firwin, hamming,
};
