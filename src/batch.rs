//! Batch drivers for the two stages.
//!
//! Both walk the subject × run grid sequentially and never abort on a single
//! recording: a missing input is a skip, any other failure is logged with its
//! (subject, run) identifiers and the loop continues. The summary with
//! per-run timings is produced unconditionally, however many runs failed.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::bids::BidsPath;
use crate::classify::ComponentClassifier;
use crate::config::BatchConfig;
use crate::error::PipelineError;
use crate::events::{load_event_ids, load_trial_codes, normalize_events_file};
use crate::pipeline::{clean_run, CleanOutcome};

/// How one (subject, run) pair ended.
#[derive(Debug)]
pub enum RunOutcome {
    Cleaned(CleanOutcome),
    /// Event table normalized; counts are (kept, dropped).
    Normalized(usize, usize),
    SkippedMissingInput(std::path::PathBuf),
    Failed(PipelineError),
}

#[derive(Debug)]
pub struct RunReport {
    pub subject: String,
    pub task: String,
    pub outcome: RunOutcome,
    pub elapsed: Duration,
}

/// Aggregate over the whole grid.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<RunReport>,
}

impl BatchSummary {
    pub fn n_ok(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, RunOutcome::Cleaned(_) | RunOutcome::Normalized(..)))
            .count()
    }

    pub fn n_skipped(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, RunOutcome::SkippedMissingInput(_)))
            .count()
    }

    pub fn n_failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, RunOutcome::Failed(_)))
            .count()
    }

    /// (mean, min, max) wall time of the successfully processed runs.
    pub fn timing(&self) -> Option<(Duration, Duration, Duration)> {
        let times: Vec<Duration> = self
            .reports
            .iter()
            .filter(|r| matches!(r.outcome, RunOutcome::Cleaned(_) | RunOutcome::Normalized(..)))
            .map(|r| r.elapsed)
            .collect();
        if times.is_empty() {
            return None;
        }
        let total: Duration = times.iter().sum();
        let mean = total / times.len() as u32;
        let min = *times.iter().min().unwrap_or(&Duration::ZERO);
        let max = *times.iter().max().unwrap_or(&Duration::ZERO);
        Some((mean, min, max))
    }

    /// Mean wall time per subject, in first-seen subject order.
    pub fn per_subject_timing(&self) -> Vec<(String, Duration)> {
        let mut order: Vec<String> = Vec::new();
        let mut sums: std::collections::HashMap<String, (Duration, u32)> =
            std::collections::HashMap::new();
        for r in &self.reports {
            let entry = sums.entry(r.subject.clone()).or_insert_with(|| {
                order.push(r.subject.clone());
                (Duration::ZERO, 0)
            });
            entry.0 += r.elapsed;
            entry.1 += 1;
        }
        order
            .into_iter()
            .map(|s| {
                let (total, n) = sums[&s];
                (s, total / n.max(1))
            })
            .collect()
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} processed, {} skipped, {} failed (of {})",
            self.n_ok(),
            self.n_skipped(),
            self.n_failed(),
            self.reports.len()
        )?;
        match self.timing() {
            Some((mean, min, max)) => {
                writeln!(
                    f,
                    "per-run time: mean {:.2}s, min {:.2}s, max {:.2}s",
                    mean.as_secs_f64(),
                    min.as_secs_f64(),
                    max.as_secs_f64()
                )?;
                for (subject, mean) in self.per_subject_timing() {
                    writeln!(f, "  sub-{subject}: mean {:.2}s", mean.as_secs_f64())?;
                }
                Ok(())
            }
            None => writeln!(f, "no runs processed"),
        }
    }
}

/// Stage 1: rewrite every events table in place.
pub fn normalize_batch(cfg: &BatchConfig) -> Result<BatchSummary> {
    let codes = load_trial_codes(&cfg.trial_codes)?;
    let mut summary = BatchSummary::default();

    for subject in cfg.subjects() {
        for task in &cfg.runs {
            let path = BidsPath::new(&cfg.bids_root, &subject, task);
            let events = path.events();
            let started = Instant::now();
            let outcome = if !events.is_file() {
                warn!(subject = %subject, task = %task, "events table missing, skipping");
                RunOutcome::SkippedMissingInput(events)
            } else {
                match normalize_events_file(&events, &codes, cfg.events_sfreq) {
                    Ok(out) => {
                        info!(subject = %subject, task = %task, kept = out.kept, dropped = out.dropped, "normalized");
                        if out.dropped > 0 {
                            warn!(subject = %subject, task = %task, dropped = out.dropped, "unmapped trial labels");
                        }
                        RunOutcome::Normalized(out.kept, out.dropped)
                    }
                    Err(e) => {
                        error!(subject = %subject, task = %task, error = %e, "normalization failed");
                        RunOutcome::Failed(PipelineError::stage(
                            crate::error::Stage::Load,
                            e,
                        ))
                    }
                }
            };
            summary.reports.push(RunReport {
                subject: subject.clone(),
                task: task.clone(),
                outcome,
                elapsed: started.elapsed(),
            });
        }
    }
    Ok(summary)
}

/// Stage 2: clean every recording on the grid.
pub fn clean_batch(cfg: &BatchConfig, classifier: &dyn ComponentClassifier) -> Result<BatchSummary> {
    let event_ids = load_event_ids(&cfg.event_ids)
        .with_context(|| format!("loading {}", cfg.event_ids.display()))?;
    let mut summary = BatchSummary::default();

    for subject in cfg.subjects() {
        for task in &cfg.runs {
            let input = BidsPath::new(&cfg.bids_root, &subject, task);
            let started = Instant::now();
            let outcome = match clean_run(
                &input,
                &cfg.output_root,
                &cfg.pipeline,
                classifier,
                &event_ids,
            ) {
                Ok(out) => {
                    info!(
                        subject = %subject,
                        task = %task,
                        components = out.n_components,
                        excluded = out.excluded.len(),
                        bad_epochs = out.n_bad_epochs,
                        events = out.n_events,
                        "cleaned"
                    );
                    RunOutcome::Cleaned(out)
                }
                Err(PipelineError::MissingInput(path)) => {
                    info!(subject = %subject, task = %task, missing = %path.display(), "skipping");
                    RunOutcome::SkippedMissingInput(path)
                }
                Err(e) => {
                    error!(subject = %subject, task = %task, error = %e, "run failed");
                    RunOutcome::Failed(e)
                }
            };
            summary.reports.push(RunReport {
                subject: subject.clone(),
                task: task.clone(),
                outcome,
                elapsed: started.elapsed(),
            });
        }
    }
    Ok(summary)
}
