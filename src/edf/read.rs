//! EDF reader: fixed 256-byte header, per-signal headers, 16-bit LE samples
//! decoded to physical units via the per-signal gain/offset.

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Per-signal header fields (one 256-byte column group per signal).
#[derive(Debug, Clone)]
pub struct SignalHeader {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i32,
    pub digital_max: i32,
    pub prefiltering: String,
    pub samples_per_record: usize,
}

impl SignalHeader {
    /// Digital → physical conversion factor.
    pub fn gain(&self) -> f64 {
        (self.physical_max - self.physical_min)
            / (self.digital_max - self.digital_min) as f64
    }

    pub fn offset(&self) -> f64 {
        self.physical_max - self.gain() * self.digital_max as f64
    }

    /// The EDF+ annotation stream is a pseudo-signal, not data.
    pub fn is_annotation(&self) -> bool {
        self.label.trim() == "EDF Annotations"
    }
}

/// A continuous recording loaded from an EDF file.
///
/// `data` holds the non-annotation signals as `[C, T]` in physical units;
/// annotation pseudo-signals are skipped while reading.
#[derive(Debug)]
pub struct RawEdf {
    pub data: Array2<f64>,
    pub sfreq: f64,
    pub ch_names: Vec<String>,
    pub patient_id: String,
    pub recording_id: String,
    pub record_duration: f64,
}

/// Open and fully decode an EDF recording.
pub fn open_edf(path: &Path) -> Result<RawEdf> {
    let file = File::open(path)
        .with_context(|| format!("opening EDF {}", path.display()))?;
    let mut reader = BufReader::new(file);

    // ── Main header (256 bytes) ───────────────────────────────────────────
    let version = read_str(&mut reader, 8)?;
    if version.trim() != "0" {
        bail!("unsupported EDF version {:?}", version.trim());
    }
    let patient_id = read_str(&mut reader, 80)?.trim().to_string();
    let recording_id = read_str(&mut reader, 80)?.trim().to_string();
    let _start_date = read_str(&mut reader, 8)?;
    let _start_time = read_str(&mut reader, 8)?;
    let header_bytes: usize = read_num(&mut reader, 8, "header size")?;
    let _reserved = read_str(&mut reader, 44)?;
    let n_records: i64 = read_num(&mut reader, 8, "record count")?;
    let record_duration: f64 = read_num(&mut reader, 8, "record duration")?;
    let n_signals: usize = read_num(&mut reader, 4, "signal count")?;

    if n_records < 0 {
        bail!("EDF file with unknown record count is not supported");
    }
    if n_signals == 0 {
        bail!("EDF file declares zero signals");
    }
    if record_duration <= 0.0 {
        bail!("non-positive record duration {record_duration}");
    }
    let expected_header = 256 * (n_signals + 1);
    if header_bytes != expected_header {
        bail!("header size {header_bytes} does not match {n_signals} signals");
    }

    let signals = read_signal_headers(&mut reader, n_signals)?;

    // Data channels only; the annotation stream is consumed and discarded.
    let keep: Vec<usize> = (0..n_signals).filter(|&i| !signals[i].is_annotation()).collect();
    if keep.is_empty() {
        bail!("EDF file contains no data signals");
    }
    let spr = signals[keep[0]].samples_per_record;
    for &i in &keep {
        if signals[i].samples_per_record != spr {
            bail!(
                "mixed sampling rates: {} has {} samples/record, expected {spr}",
                signals[i].label,
                signals[i].samples_per_record
            );
        }
    }
    let sfreq = spr as f64 / record_duration;

    // ── Data records ──────────────────────────────────────────────────────
    let n_records = n_records as usize;
    let n_t = n_records * spr;
    let mut data = Array2::<f64>::zeros((keep.len(), n_t));

    let mut record_buf = vec![
        0u8;
        signals.iter().map(|s| 2 * s.samples_per_record).sum::<usize>()
    ];
    for rec in 0..n_records {
        reader
            .read_exact(&mut record_buf)
            .with_context(|| format!("reading data record {rec}"))?;
        let mut cursor = 0usize;
        let mut row = 0usize;
        for (sig_idx, sig) in signals.iter().enumerate() {
            let n_bytes = 2 * sig.samples_per_record;
            if keep.contains(&sig_idx) {
                let gain = sig.gain();
                let offset = sig.offset();
                let base = rec * spr;
                for (k, chunk) in record_buf[cursor..cursor + n_bytes]
                    .chunks_exact(2)
                    .enumerate()
                {
                    let digital = i16::from_le_bytes([chunk[0], chunk[1]]) as f64;
                    data[[row, base + k]] = gain * digital + offset;
                }
                row += 1;
            }
            cursor += n_bytes;
        }
    }

    let ch_names = keep.iter().map(|&i| signals[i].label.trim().to_string()).collect();
    Ok(RawEdf { data, sfreq, ch_names, patient_id, recording_id, record_duration })
}

fn read_signal_headers(reader: &mut impl Read, n: usize) -> Result<Vec<SignalHeader>> {
    // Fields are stored column-major: all labels, then all transducers, …
    let labels = read_str_column(reader, n, 16)?;
    let transducers = read_str_column(reader, n, 80)?;
    let dims = read_str_column(reader, n, 8)?;
    let phys_min = read_num_column::<f64>(reader, n, 8, "physical minimum")?;
    let phys_max = read_num_column::<f64>(reader, n, 8, "physical maximum")?;
    let dig_min = read_num_column::<i32>(reader, n, 8, "digital minimum")?;
    let dig_max = read_num_column::<i32>(reader, n, 8, "digital maximum")?;
    let prefilters = read_str_column(reader, n, 80)?;
    let spr = read_num_column::<usize>(reader, n, 8, "samples per record")?;
    let _reserved = read_str_column(reader, n, 32)?;

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        if dig_max[i] <= dig_min[i] {
            bail!("signal {:?} has empty digital range", labels[i].trim());
        }
        out.push(SignalHeader {
            label: labels[i].clone(),
            transducer: transducers[i].trim().to_string(),
            physical_dimension: dims[i].trim().to_string(),
            physical_min: phys_min[i],
            physical_max: phys_max[i],
            digital_min: dig_min[i],
            digital_max: dig_max[i],
            prefiltering: prefilters[i].trim().to_string(),
            samples_per_record: spr[i],
        });
    }
    Ok(out)
}

fn read_str(reader: &mut impl Read, len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).context("truncated EDF header")?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn read_num<T: std::str::FromStr>(reader: &mut impl Read, len: usize, what: &str) -> Result<T> {
    let s = read_str(reader, len)?;
    s.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid {what} field {:?}", s.trim()))
}

fn read_str_column(reader: &mut impl Read, n: usize, len: usize) -> Result<Vec<String>> {
    (0..n).map(|_| read_str(reader, len)).collect()
}

fn read_num_column<T: std::str::FromStr>(
    reader: &mut impl Read,
    n: usize,
    len: usize,
    what: &str,
) -> Result<Vec<T>> {
    (0..n).map(|_| read_num(reader, len, what)).collect()
}
