//! Per-recording cleaning pipeline.
//!
//! One call to [`clean_run`] takes a (subject, run) pair from the raw tree to
//! the mirrored output tree:
//!
//! 1. load the EDF, keep EEG channels, average-reference them
//! 2. band-limit to the artifact-detection band at the native rate
//! 3. derive a decimated copy at twice the upper cutoff for detection
//! 4. segment into fixed windows, fit the cross-validated rejector
//! 5. fit ICA on the surviving windows, label components, reconstruct the
//!    native-rate signal without the rejected subspace
//! 6. band-limit to the analysis band, resample to the export rate, write
//!    the EDF with the event annotations, emit diagnostic figures
//!
//! The whole body returns `Result<_, PipelineError>` so the batch driver can
//! log and continue on a per-recording basis.

use ndarray::Array2;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::bids::{figure_path, BidsPath};
use crate::classify::{exclusion_set, ComponentClassifier, ComponentLabel};
use crate::config::PipelineConfig;
use crate::edf::{open_edf, write_edf, Annotation};
use crate::epoch::make_fixed_length_epochs;
use crate::error::{PipelineError, Stage, StageResultExt};
use crate::events::read_normalized;
use crate::filter::{apply_fir_zero_phase, design_bandpass};
use crate::ica::fit_ica;
use crate::montage::{eeg_picks, positions};
use crate::reference::average_reference_inplace;
use crate::reject::fit_reject;
use crate::resample::resample;
use crate::{plot, reject::RejectLog};

/// What a successful run produced, for the batch report.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub output_path: PathBuf,
    pub n_components: usize,
    pub labels: Vec<ComponentLabel>,
    pub excluded: Vec<usize>,
    pub n_bad_epochs: usize,
    pub n_events: usize,
}

/// Clean one recording and export it under `output`'s root.
pub fn clean_run(
    input: &BidsPath,
    output_root: &std::path::Path,
    cfg: &PipelineConfig,
    classifier: &dyn ComponentClassifier,
    event_ids: &HashMap<i64, String>,
) -> Result<CleanOutcome, PipelineError> {
    let recording = input.recording();
    if !recording.is_file() {
        return Err(PipelineError::MissingInput(recording));
    }
    let events_path = input.events();
    if !events_path.is_file() {
        return Err(PipelineError::MissingInput(events_path));
    }

    // ── Load ──────────────────────────────────────────────────────────────
    let raw = open_edf(&recording).at_stage(Stage::Load)?;
    let picks = eeg_picks(&raw.ch_names);
    if picks.is_empty() {
        return Err(PipelineError::stage(
            Stage::Load,
            anyhow::anyhow!("no EEG channels in {}", recording.display()),
        ));
    }
    let ch_names: Vec<String> = picks.iter().map(|&i| raw.ch_names[i].clone()).collect();
    let pos = positions(&ch_names);
    let sfreq = raw.sfreq;
    let mut data = Array2::zeros((picks.len(), raw.data.ncols()));
    for (row, &i) in picks.iter().enumerate() {
        data.row_mut(row).assign(&raw.data.row(i));
    }

    // ── Reference ─────────────────────────────────────────────────────────
    average_reference_inplace(&mut data);

    // ── Detection band at the native rate ─────────────────────────────────
    let h = design_bandpass(cfg.l_freq, cfg.h_freq, sfreq);
    apply_fir_zero_phase(&mut data, &h).at_stage(Stage::Filter)?;
    let original = data.clone();

    // ── Detection derivative ──────────────────────────────────────────────
    let detect_sfreq = cfg.detect_sfreq();
    let detect = if (sfreq - detect_sfreq).abs() < 1e-9 {
        data.clone()
    } else {
        resample(&data, sfreq, detect_sfreq).at_stage(Stage::Resample)?
    };

    // ── Windows + rejection ───────────────────────────────────────────────
    let epochs = make_fixed_length_epochs(&detect, cfg.epoch_samples(), detect_sfreq);
    if epochs.n_epochs() == 0 {
        return Err(PipelineError::stage(
            Stage::Epoch,
            anyhow::anyhow!("recording shorter than one {}s window", cfg.epoch_dur),
        ));
    }
    let all: Vec<usize> = (0..epochs.n_channels()).collect();
    let log: RejectLog = fit_reject(
        &epochs,
        &all,
        &pos,
        &cfg.n_interpolate,
        cfg.cv_folds,
        cfg.random_seed,
    )
    .at_stage(Stage::Reject)?;

    // ── Decompose + classify ──────────────────────────────────────────────
    let fit_data = epochs.concat_good(&log.bad_epochs, cfg.ica_decim);
    if fit_data.ncols() == 0 {
        return Err(PipelineError::stage(
            Stage::Decompose,
            anyhow::anyhow!("every window was rejected"),
        ));
    }
    let ica = fit_ica(&fit_data, cfg.ica_variance, cfg.random_seed)
        .at_stage(Stage::Decompose)?;
    let sources = ica.sources(&data);
    let labels = classifier.classify(&ica, &sources, sfreq, &pos);
    if labels.len() != ica.n_components {
        return Err(PipelineError::stage(
            Stage::Classify,
            anyhow::anyhow!(
                "classifier returned {} labels for {} components",
                labels.len(),
                ica.n_components
            ),
        ));
    }
    let excluded = exclusion_set(&labels);

    // ── Reconstruct at the native rate ────────────────────────────────────
    ica.apply(&mut data, &excluded).at_stage(Stage::Reconstruct)?;

    // ── Analysis band + export rate ───────────────────────────────────────
    let h = design_bandpass(cfg.l_freq, cfg.final_h_freq, sfreq);
    apply_fir_zero_phase(&mut data, &h).at_stage(Stage::Filter)?;
    let export = if (sfreq - detect_sfreq).abs() < 1e-9 {
        data.clone()
    } else {
        resample(&data, sfreq, detect_sfreq).at_stage(Stage::Resample)?
    };

    // ── Figures (before export, so a failed write still leaves them) ──────
    let overlay = figure_path(output_root, &input.subject, &input.task, "overlay");
    if let Some(dir) = overlay.parent() {
        std::fs::create_dir_all(dir).at_stage(Stage::Plot)?;
    }
    plot::plot_overlay(&overlay, &original, &data, sfreq, &ch_names).at_stage(Stage::Plot)?;
    let psd = figure_path(output_root, &input.subject, &input.task, "psd");
    plot::plot_psd(&psd, &export, detect_sfreq, &ch_names).at_stage(Stage::Plot)?;

    // ── Export ────────────────────────────────────────────────────────────
    let events = read_normalized(&events_path).at_stage(Stage::Export)?;
    let annotations: Vec<Annotation> = events
        .iter()
        .map(|e| Annotation {
            onset: e.onset,
            duration: (e.duration > 0.0).then_some(e.duration),
            label: event_ids
                .get(&e.code)
                .cloned()
                .unwrap_or_else(|| e.code.to_string()),
        })
        .collect();

    let out = input.with_root(output_root);
    out.ensure_eeg_dir().at_stage(Stage::Export)?;
    let out_path = out.recording();
    write_edf(
        &out_path,
        &export,
        detect_sfreq,
        &ch_names,
        &raw.patient_id,
        &annotations,
    )
    .at_stage(Stage::Export)?;

    Ok(CleanOutcome {
        output_path: out_path,
        n_components: ica.n_components,
        labels,
        excluded,
        n_bad_epochs: log.n_bad(),
        n_events: annotations.len(),
    })
}
