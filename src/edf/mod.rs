//! Native EDF/EDF+ reader and writer.
//!
//! Implements just enough of the European Data Format
//! (<https://www.edfplus.info/specs/edf.html>) for this pipeline: reading
//! continuous multichannel recordings into a `[C, T]` matrix, and writing
//! cleaned recordings back out as EDF+C with event annotations.
//!
//! # Quick start
//! ```no_run
//! use eegprep::edf::open_edf;
//!
//! let raw = open_edf("sub-01_task-run1_eeg.edf".as_ref()).unwrap();
//! println!("{} channels @ {} Hz", raw.ch_names.len(), raw.sfreq);
//! ```

pub mod read;
pub mod write;

pub use read::{open_edf, RawEdf, SignalHeader};
pub use write::{write_edf, Annotation};
