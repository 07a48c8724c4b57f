//! # eegprep — batch EEG cleaning in pure Rust
//!
//! `eegprep` turns a BIDS-style tree of raw EDF recordings into a mirrored
//! tree of cleaned, band-limited, event-annotated EDFs. It runs in two
//! stages over a fixed subject × run grid:
//!
//! 1. **Event normalization** — every `*_events.tsv` is rewritten in place:
//!    textual trial labels become integer codes, unmapped rows are dropped,
//!    and a `sample` column is derived from the onset times.
//! 2. **Signal cleaning** — every `*_eeg.edf` is average-referenced,
//!    band-limited, windowed, pruned of bad windows by cross-validated
//!    peak-to-peak rejection, decomposed with extended-infomax ICA, stripped
//!    of non-neural components, filtered to the analysis band and exported
//!    with its events as EDF+ annotations.
//!
//! ## Pipeline overview
//!
//! ```text
//! sub-XX_task-runN_eeg.edf
//!   │
//!   ├─ edf::open_edf()            native EDF reader
//!   ├─ reference                  per-timepoint channel mean removed
//!   ├─ filter (FIR BP)            firwin + overlap-add → 1–100 Hz
//!   ├─ resample::resample()       FFT → 200 Hz detection derivative
//!   ├─ epoch                      non-overlapping 1 s windows
//!   ├─ reject                     cross-validated peak-to-peak thresholds
//!   ├─ ica                        extended infomax on surviving windows
//!   ├─ classify                   one label per component, keep {brain, other}
//!   ├─ reconstruct                excluded subspace projected out
//!   ├─ filter (FIR BP)            1–40 Hz analysis band
//!   └─ edf::write_edf()           EDF+C with TAL event annotations
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use eegprep::{clean_batch, normalize_batch, BatchConfig, SpectralClassifier};
//!
//! let cfg = BatchConfig::default();
//! normalize_batch(&cfg).unwrap();
//! let summary = clean_batch(&cfg, &SpectralClassifier::default()).unwrap();
//! println!("{summary}");
//! ```
//!
//! ## Running individual steps
//!
//! Each stage is also exposed as a standalone function:
//!
//! ```no_run
//! use eegprep::filter::{design_bandpass, apply_fir_zero_phase};
//! use eegprep::reference::average_reference_inplace;
//! use eegprep::resample::resample;
//! use ndarray::Array2;
//!
//! let mut data: Array2<f64> = Array2::zeros((32, 50_000)); // [C, T] at 500 Hz
//!
//! average_reference_inplace(&mut data);
//! let h = design_bandpass(1.0, 100.0, 500.0);
//! apply_fir_zero_phase(&mut data, &h).unwrap();
//! let data = resample(&data, 500.0, 200.0).unwrap();
//! ```

pub mod batch;
pub mod bids;
pub mod classify;
pub mod config;
pub mod edf;
pub mod epoch;
pub mod error;
pub mod events;
pub mod filter;
pub mod ica;
pub mod montage;
pub mod pipeline;
pub mod plot;
pub mod reference;
pub mod reject;
pub mod resample;
pub mod spectrum;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `eegprep::Foo` without having to know the internal module layout.

// batch
pub use batch::{clean_batch, normalize_batch, BatchSummary, RunOutcome, RunReport};

// bids
pub use bids::{figure_path, BidsPath};

// classify
pub use classify::{exclusion_set, ComponentClassifier, ComponentLabel, SpectralClassifier};

// config
pub use config::{BatchConfig, PipelineConfig};

// edf
pub use edf::{open_edf, write_edf, Annotation, RawEdf};

// epoch
pub use epoch::{make_fixed_length_epochs, Epochs};

// error
pub use error::{PipelineError, Stage, StageResultExt};

// events
pub use events::{
    load_event_ids, load_trial_codes, normalize_events_file, read_normalized, EventRow,
    NormalizeOutcome,
};

// filter — design helpers + convolution
pub use filter::{
    apply_fir_zero_phase, auto_filter_length, auto_trans_bandwidth, design_bandpass,
    design_highpass, design_lowpass, filter_1d, firwin, hamming,
};

// ica
pub use ica::{fit_ica, Ica};

// montage
pub use montage::{channel_type, eeg_picks, position, positions, ChannelType};

// pipeline
pub use pipeline::{clean_run, CleanOutcome};

// reference
pub use reference::average_reference_inplace;

// reject
pub use reject::{fit_reject, RejectLog};

// resample
pub use resample::{auto_npad, resample, resample_1d};

// spectrum
pub use spectrum::{band_power, welch_psd};
