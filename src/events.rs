//! Event-table normalization (the upstream data-preparation stage).
//!
//! Each run carries a tab-separated events file with columns
//! {onset, duration, trial_type}. Normalization maps the textual
//! `trial_type` labels to integer codes through an external JSON lookup
//! table, drops rows that cannot be mapped, derives an integer `sample`
//! column from the onset time, and rewrites the file in place:
//!
//! ```text
//! onset  duration  trial_type          →  onset  duration  trial_type  value               sample
//! 1.25   0.0       stimulus/left          1.25   0.0       5           stimulus/left       250
//! 3.10   0.0       <unknown label>        (row dropped)
//! ```
//!
//! Re-running on already-normalized output is a no-op for the row count:
//! a `trial_type` that is already a stringified code from the table's value
//! set is accepted unchanged.

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// One surviving row of a normalized events table.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub onset: f64,
    pub duration: f64,
    /// Integer trial code (post-mapping).
    pub code: i64,
    /// Original textual label, kept in the `value` column.
    pub label: String,
    /// `round(onset × events_sfreq)`.
    pub sample: i64,
}

/// Counts reported by [`normalize_events_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOutcome {
    pub kept: usize,
    pub dropped: usize,
}

/// Load the label → code lookup table (JSON object, string keys).
pub fn load_trial_codes(path: &Path) -> Result<HashMap<String, i64>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("reading trial-code table {}", path.display()))?;
    let table: HashMap<String, i64> = serde_json::from_reader(file)
        .with_context(|| format!("parsing trial-code table {}", path.display()))?;
    Ok(table)
}

/// Load the code → event-name table used when exporting annotations.
/// JSON object keys are stringified integers.
pub fn load_event_ids(path: &Path) -> Result<HashMap<i64, String>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("reading event-id table {}", path.display()))?;
    let raw: HashMap<String, String> = serde_json::from_reader(file)
        .with_context(|| format!("parsing event-id table {}", path.display()))?;
    let mut out = HashMap::with_capacity(raw.len());
    for (k, v) in raw {
        let code: i64 = k
            .parse()
            .with_context(|| format!("non-integer event-id key {k:?}"))?;
        out.insert(code, v);
    }
    Ok(out)
}

/// Normalize one events file in place.
///
/// Rows whose `trial_type` is neither a known label nor an already-mapped
/// code are dropped, never nulled-and-kept. Returns how many rows survived.
pub fn normalize_events_file(
    path: &Path,
    codes: &HashMap<String, i64>,
    events_sfreq: f64,
) -> Result<NormalizeOutcome> {
    let rows = read_rows(path, codes, events_sfreq)?;
    let dropped = rows.dropped;
    write_rows(path, &rows.kept)?;
    Ok(NormalizeOutcome { kept: rows.kept.len(), dropped })
}

/// Read an **already normalized** events file for the export stage.
///
/// Expects the `trial_type` (code) and `sample` columns produced by
/// [`normalize_events_file`].
pub fn read_normalized(path: &Path) -> Result<Vec<EventRow>> {
    let mut reader = tsv_reader(path)?;
    let headers = header_index(&mut reader)?;
    let (&onset_i, &dur_i, &type_i) = (
        headers.get("onset").context("missing onset column")?,
        headers.get("duration").context("missing duration column")?,
        headers.get("trial_type").context("missing trial_type column")?,
    );
    let sample_i = *headers.get("sample").context("missing sample column")?;
    let value_i = headers.get("value").copied();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let code: i64 = field(&record, type_i)
            .parse()
            .with_context(|| "trial_type is not an integer code; run the normalizer first")?;
        rows.push(EventRow {
            onset: field(&record, onset_i).parse().context("parsing onset")?,
            duration: field(&record, dur_i).parse().unwrap_or(0.0),
            code,
            label: value_i.map(|i| field(&record, i).to_string()).unwrap_or_default(),
            sample: field(&record, sample_i).parse().context("parsing sample")?,
        });
    }
    Ok(rows)
}

struct ReadRows {
    kept: Vec<EventRow>,
    dropped: usize,
}

fn read_rows(path: &Path, codes: &HashMap<String, i64>, sfreq: f64) -> Result<ReadRows> {
    let code_set: HashSet<i64> = codes.values().copied().collect();
    let mut reader = tsv_reader(path)?;
    let headers = header_index(&mut reader)?;
    let onset_i = *headers.get("onset").context("missing onset column")?;
    let dur_i = *headers.get("duration").context("missing duration column")?;
    let type_i = *headers.get("trial_type").context("missing trial_type column")?;
    let value_i = headers.get("value").copied();

    let mut kept = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        let raw_type = field(&record, type_i);

        // Map the label; accept an already-mapped code unchanged so the
        // operation is idempotent on its own output.
        let code = match codes.get(raw_type) {
            Some(&c) => Some(c),
            None => raw_type.parse::<i64>().ok().filter(|c| code_set.contains(c)),
        };
        let Some(code) = code else {
            dropped += 1;
            continue;
        };

        let onset: f64 = match field(&record, onset_i).parse() {
            Ok(v) => v,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        let duration: f64 = field(&record, dur_i).parse().unwrap_or(0.0);

        // First pass copies the raw label into `value`; later passes keep
        // whatever `value` already holds.
        let label = match value_i {
            Some(i) if !field(&record, i).is_empty() => field(&record, i).to_string(),
            _ => raw_type.to_string(),
        };

        kept.push(EventRow {
            onset,
            duration,
            code,
            label,
            sample: (onset * sfreq).round() as i64,
        });
    }
    Ok(ReadRows { kept, dropped })
}

fn write_rows(path: &Path, rows: &[EventRow]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("writing events {}", path.display()))?;
    writer.write_record(["onset", "duration", "trial_type", "value", "sample"])?;
    for row in rows {
        writer.write_record(&[
            row.onset.to_string(),
            row.duration.to_string(),
            row.code.to_string(),
            row.label.clone(),
            row.sample.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn tsv_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("reading events {}", path.display()))
}

fn header_index(reader: &mut csv::Reader<std::fs::File>) -> Result<HashMap<String, usize>> {
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        bail!("events file has no header row");
    }
    Ok(headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_ascii_lowercase(), i))
        .collect())
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes() -> HashMap<String, i64> {
        [("stimulus/left", 5), ("stimulus/right", 6), ("response", 9)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn write_tsv(path: &Path, body: &str) {
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn maps_labels_and_derives_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.tsv");
        write_tsv(
            &path,
            "onset\tduration\ttrial_type\n1.25\t0\tstimulus/left\n2.5\t0.4\tresponse\n",
        );
        let out = normalize_events_file(&path, &codes(), 200.0).unwrap();
        assert_eq!(out, NormalizeOutcome { kept: 2, dropped: 0 });

        let rows = read_normalized(&path).unwrap();
        assert_eq!(rows[0].code, 5);
        assert_eq!(rows[0].sample, 250);
        assert_eq!(rows[0].label, "stimulus/left");
        assert_eq!(rows[1].code, 9);
        assert_eq!(rows[1].sample, 500);
    }

    #[test]
    fn unmapped_rows_are_dropped_not_nulled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.tsv");
        write_tsv(
            &path,
            "onset\tduration\ttrial_type\n0.1\t0\tstimulus/left\n0.2\t0\tbad_label\n0.3\t0\t\n",
        );
        let out = normalize_events_file(&path, &codes(), 200.0).unwrap();
        assert_eq!(out.kept, 1);
        assert_eq!(out.dropped, 2);
        let rows = read_normalized(&path).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.tsv");
        write_tsv(
            &path,
            "onset\tduration\ttrial_type\n1.0\t0\tstimulus/right\n2.0\t0\tresponse\n",
        );
        let first = normalize_events_file(&path, &codes(), 200.0).unwrap();
        let second = normalize_events_file(&path, &codes(), 200.0).unwrap();
        assert_eq!(first.kept, 2);
        assert_eq!(second.kept, 2);
        assert_eq!(second.dropped, 0);

        // Labels survive the second pass via the value column.
        let rows = read_normalized(&path).unwrap();
        assert_eq!(rows[0].label, "stimulus/right");
    }

    #[test]
    fn sample_follows_rounding_law() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.tsv");
        write_tsv(
            &path,
            "onset\tduration\ttrial_type\n0.1234\t0\tresponse\n7.8999\t0\tresponse\n",
        );
        normalize_events_file(&path, &codes(), 200.0).unwrap();
        let rows = read_normalized(&path).unwrap();
        for row in &rows {
            assert_eq!(row.sample, (row.onset * 200.0).round() as i64);
        }
    }
}
