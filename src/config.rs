//! Batch and pipeline configuration.
//!
//! Every tunable that the original batch hard-coded lives here instead, so a
//! run is reproducible across environments: pass `--config batch.json` to the
//! binaries or rely on [`BatchConfig::default()`], which matches the original
//! constants exactly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Dataset layout, batch enumeration and side-input file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Root of the BIDS-style input dataset.
    pub bids_root: PathBuf,

    /// Root of the mirrored output tree (cleaned EDFs + `figures/`).
    pub output_root: PathBuf,

    /// JSON table mapping textual trial labels to integer codes
    /// (consumed by the event normalizer).
    pub trial_codes: PathBuf,

    /// JSON table mapping integer codes to event names
    /// (consumed by the export stage when writing annotations).
    pub event_ids: PathBuf,

    /// Inclusive subject range; ids are zero-padded to 2 digits.
    pub subject_start: u32,
    pub subject_end: u32,

    /// Fixed run-name list.
    pub runs: Vec<String>,

    /// Sampling rate used to derive the `sample` column of the events table.
    pub events_sfreq: f64,

    pub pipeline: PipelineConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            bids_root: PathBuf::from("data/project-dataset"),
            output_root: PathBuf::from("data/project-output"),
            trial_codes: PathBuf::from("data/events_keys.json"),
            event_ids: PathBuf::from("data/event_ids.json"),
            subject_start: 1,
            subject_end: 31,
            runs: (1..=6).map(|i| format!("run{i}")).collect(),
            events_sfreq: 200.0,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Load a config from a JSON file. Missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = serde_json::from_reader(file)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    /// Zero-padded subject id list, e.g. `["01", "02", …]`.
    pub fn subjects(&self) -> Vec<String> {
        (self.subject_start..=self.subject_end)
            .map(|i| format!("{i:02}"))
            .collect()
    }
}

/// Parameters of the per-run cleaning pipeline.
///
/// All fields are `pub`; construct with struct-update syntax:
///
/// ```
/// use eegprep::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     epoch_dur: 2.0,
///     ..PipelineConfig::default()
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// High-pass cutoff (Hz). The decomposition requires at least 1 Hz.
    pub l_freq: f64,

    /// Low-pass cutoff (Hz) of the artifact-detection band. The component
    /// classifier expects content up to 100 Hz.
    pub h_freq: f64,

    /// Low-pass cutoff (Hz) of the final analysis band applied to the
    /// reconstructed signal before export.
    pub final_h_freq: f64,

    /// Duration of the analysis windows fed to rejection and ICA (seconds).
    pub epoch_dur: f64,

    /// Cumulative explained-variance target selecting the number of ICA
    /// components.
    pub ica_variance: f64,

    /// RNG seed for the rejector's cross-validation folds and the ICA
    /// block shuffling.
    pub random_seed: u64,

    /// Keep every `decim`-th sample when fitting ICA.
    pub ica_decim: usize,

    /// Candidate per-epoch interpolation counts evaluated by the rejector.
    pub n_interpolate: Vec<usize>,

    /// Cross-validation folds used by the rejector.
    pub cv_folds: usize,
}

impl Default for PipelineConfig {
    /// 1–100 Hz detection band, 1–40 Hz export band, 1 s epochs,
    /// 99 % variance ICA, seed 42, decim 3, interpolation candidates [1, 2, 4].
    fn default() -> Self {
        Self {
            l_freq: 1.0,
            h_freq: 100.0,
            final_h_freq: 40.0,
            epoch_dur: 1.0,
            ica_variance: 0.99,
            random_seed: 42,
            ica_decim: 3,
            n_interpolate: vec![1, 2, 4],
            cv_folds: 5,
        }
    }
}

impl PipelineConfig {
    /// Sampling rate of the artifact-detection derivative: twice the upper
    /// cutoff, so the band of interest sits below Nyquist.
    pub fn detect_sfreq(&self) -> f64 {
        2.0 * self.h_freq
    }

    /// Samples per analysis window at the detection rate.
    pub fn epoch_samples(&self) -> usize {
        (self.epoch_dur * self.detect_sfreq()) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_constants() {
        let cfg = BatchConfig::default();
        assert_eq!(cfg.subjects().len(), 31);
        assert_eq!(cfg.subjects()[0], "01");
        assert_eq!(cfg.runs.len(), 6);
        assert_eq!(cfg.events_sfreq, 200.0);
        assert_eq!(cfg.pipeline.detect_sfreq(), 200.0);
        assert_eq!(cfg.pipeline.epoch_samples(), 200);
        assert_eq!(cfg.pipeline.n_interpolate, vec![1, 2, 4]);
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(&path, r#"{"subject_start": 3, "subject_end": 4}"#).unwrap();
        let cfg = BatchConfig::load(&path).unwrap();
        assert_eq!(cfg.subjects(), vec!["03", "04"]);
        assert_eq!(cfg.pipeline.h_freq, 100.0);
    }
}
