mod common;

use eegprep::events::{load_trial_codes, normalize_events_file, read_normalized};
use std::collections::HashMap;

fn table() -> HashMap<String, i64> {
    [("left".to_string(), 1), ("right".to_string(), 2)].into_iter().collect()
}

#[test]
fn normalization_maps_drops_and_derives_samples() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    common::write_bids_run(
        root,
        "01",
        "run1",
        &common::make_signal(4, 2000, 200.0, 7),
        200.0,
        &common::channel_names(),
    );
    let tsv = root.join("sub-01/eeg/sub-01_task-run1_events.tsv");

    let out = normalize_events_file(&tsv, &table(), 200.0).unwrap();
    assert_eq!(out.kept, 3);
    assert_eq!(out.dropped, 1); // "mystery" has no code

    let rows = read_normalized(&tsv).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].code, 1);
    assert_eq!(rows[0].label, "left");
    assert_eq!(rows[0].sample, 100); // 0.5 s × 200 Hz
    assert_eq!(rows[1].code, 2);
    assert_eq!(rows[1].sample, 400);
}

#[test]
fn normalization_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    common::write_bids_run(
        root,
        "02",
        "run1",
        &common::make_signal(4, 2000, 200.0, 8),
        200.0,
        &common::channel_names(),
    );
    let tsv = root.join("sub-02/eeg/sub-02_task-run1_events.tsv");

    normalize_events_file(&tsv, &table(), 200.0).unwrap();
    let first = std::fs::read_to_string(&tsv).unwrap();
    let again = normalize_events_file(&tsv, &table(), 200.0).unwrap();
    assert_eq!(again.dropped, 0);
    assert_eq!(std::fs::read_to_string(&tsv).unwrap(), first);
}

#[test]
fn tables_load_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let (codes_path, ids_path) = common::write_tables(dir.path());
    let codes = load_trial_codes(&codes_path).unwrap();
    assert_eq!(codes["left"], 1);
    let ids = eegprep::events::load_event_ids(&ids_path).unwrap();
    assert_eq!(ids[&2], "right");
}
