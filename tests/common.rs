/// Shared helpers: synthetic recordings and BIDS-style fixture trees.
use eegprep::edf::write_edf;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::path::Path;

#[allow(unused)]
pub fn channel_names() -> Vec<String> {
    ["Fp1", "Fp2", "Cz", "O1"].iter().map(|s| s.to_string()).collect()
}

/// Band-limited multi-channel mixture: per-channel alpha + theta tones with
/// phase offsets, a shared 60 Hz tone and a little noise.
#[allow(unused)]
pub fn make_signal(n_ch: usize, n_t: usize, sfreq: f64, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise: Vec<f64> = (0..n_ch * n_t).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Array2::from_shape_fn((n_ch, n_t), |(c, t)| {
        let s = t as f64 / sfreq;
        let phase = c as f64 * 0.4;
        20.0 * (2.0 * PI * 10.0 * s + phase).sin()
            + 10.0 * (2.0 * PI * 6.0 * s + phase).sin()
            + 6.0 * (2.0 * PI * 60.0 * s).sin()
            + noise[c * n_t + t]
    })
}

/// Write one (subject, run) recording + events table under `root`.
#[allow(unused)]
pub fn write_bids_run(
    root: &Path,
    subject: &str,
    task: &str,
    data: &Array2<f64>,
    sfreq: f64,
    ch_names: &[String],
) {
    let dir = root.join(format!("sub-{subject}")).join("eeg");
    std::fs::create_dir_all(&dir).unwrap();
    let edf = dir.join(format!("sub-{subject}_task-{task}_eeg.edf"));
    write_edf(&edf, data, sfreq, ch_names, &format!("sub-{subject}"), &[]).unwrap();

    let tsv = dir.join(format!("sub-{subject}_task-{task}_events.tsv"));
    std::fs::write(
        &tsv,
        "onset\tduration\ttrial_type\n\
         0.5\t0.0\tleft\n\
         2.0\t0.0\tright\n\
         3.5\t0.0\tmystery\n\
         5.0\t0.0\tleft\n",
    )
    .unwrap();
}

/// Write the label → code and code → name lookup tables.
#[allow(unused)]
pub fn write_tables(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let codes = dir.join("events_keys.json");
    std::fs::write(&codes, r#"{"left": 1, "right": 2}"#).unwrap();
    let ids = dir.join("event_ids.json");
    std::fs::write(&ids, r#"{"1": "left", "2": "right"}"#).unwrap();
    (codes, ids)
}
