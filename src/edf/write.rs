//! EDF+C writer: 1-second data records, 16-bit samples scaled into a
//! per-channel physical range, plus a TAL-encoded annotation stream carrying
//! the event table.

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One exported event annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Onset in seconds from recording start.
    pub onset: f64,
    /// Optional duration in seconds.
    pub duration: Option<f64>,
    pub label: String,
}

const DIGITAL_MAX: i32 = 32767;
const DIGITAL_MIN: i32 = -32768;

/// Write `data` (`[C, T]`, physical units) as an EDF+C file.
///
/// The sampling rate must be an integer number of samples per second since
/// records are fixed at one second. The final partial record, if any, is
/// zero-padded.
pub fn write_edf(
    path: &Path,
    data: &Array2<f64>,
    sfreq: f64,
    ch_names: &[String],
    patient_id: &str,
    annotations: &[Annotation],
) -> Result<()> {
    let (n_ch, n_t) = data.dim();
    if n_ch != ch_names.len() {
        bail!("{} channels but {} names", n_ch, ch_names.len());
    }
    if sfreq <= 0.0 || (sfreq - sfreq.round()).abs() > 1e-9 {
        bail!("EDF export requires an integer sampling rate, got {sfreq}");
    }
    let spr = sfreq.round() as usize;
    let n_records = n_t.div_ceil(spr).max(1);

    // Symmetric physical range per channel, with a little headroom so the
    // extremes don't clip to the digital rails.
    let ranges: Vec<f64> = (0..n_ch)
        .map(|c| {
            let max_abs = data.row(c).iter().fold(0.0_f64, |m, &v| m.max(v.abs()));
            (max_abs * 1.05).ceil().max(1.0)
        })
        .collect();

    let tals = build_tals(n_records, annotations);
    let ann_bytes = tals.iter().map(Vec::len).max().unwrap_or(0);
    // Annotation signal size in 2-byte samples, with slack for the padding NULs.
    let ann_spr = (ann_bytes.div_ceil(2) + 8).max(30);

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating EDF {}", path.display()))?;
    let mut w = BufWriter::new(file);

    let n_signals = n_ch + 1; // data channels + annotation stream

    // ── Main header ───────────────────────────────────────────────────────
    write_field(&mut w, "0", 8)?;
    write_field(&mut w, patient_id, 80)?;
    write_field(&mut w, "Startdate 01-JAN-1985 X X X", 80)?;
    write_field(&mut w, "01.01.85", 8)?;
    write_field(&mut w, "00.00.00", 8)?;
    write_field(&mut w, &(256 * (n_signals + 1)).to_string(), 8)?;
    write_field(&mut w, "EDF+C", 44)?;
    write_field(&mut w, &n_records.to_string(), 8)?;
    write_field(&mut w, "1", 8)?;
    write_field(&mut w, &n_signals.to_string(), 4)?;

    // ── Signal headers (column-major) ─────────────────────────────────────
    for name in ch_names {
        write_field(&mut w, name, 16)?;
    }
    write_field(&mut w, "EDF Annotations", 16)?;

    for _ in 0..n_ch {
        write_field(&mut w, "AgAgCl electrode", 80)?;
    }
    write_field(&mut w, "", 80)?;

    for _ in 0..n_ch {
        write_field(&mut w, "uV", 8)?;
    }
    write_field(&mut w, "", 8)?;

    for r in &ranges {
        write_field(&mut w, &format!("-{r:.0}"), 8)?;
    }
    write_field(&mut w, "-1", 8)?;

    for r in &ranges {
        write_field(&mut w, &format!("{r:.0}"), 8)?;
    }
    write_field(&mut w, "1", 8)?;

    for _ in 0..n_signals {
        write_field(&mut w, &DIGITAL_MIN.to_string(), 8)?;
    }
    for _ in 0..n_signals {
        write_field(&mut w, &DIGITAL_MAX.to_string(), 8)?;
    }

    for _ in 0..n_ch {
        write_field(&mut w, "HP:1Hz LP:40Hz", 80)?;
    }
    write_field(&mut w, "", 80)?;

    for _ in 0..n_ch {
        write_field(&mut w, &spr.to_string(), 8)?;
    }
    write_field(&mut w, &ann_spr.to_string(), 8)?;

    for _ in 0..n_signals {
        write_field(&mut w, "", 32)?;
    }

    // ── Data records ──────────────────────────────────────────────────────
    let mut sample_buf = vec![0u8; 2 * spr];
    for rec in 0..n_records {
        let start = rec * spr;
        for (c, &range) in ranges.iter().enumerate() {
            // range maps to the full digital span; ranges are symmetric so
            // offset is zero and gain alone converts.
            let gain = range / DIGITAL_MAX as f64;
            for k in 0..spr {
                let v = if start + k < n_t { data[[c, start + k]] } else { 0.0 };
                let digital = (v / gain)
                    .round()
                    .clamp(DIGITAL_MIN as f64, DIGITAL_MAX as f64) as i16;
                sample_buf[2 * k..2 * k + 2].copy_from_slice(&digital.to_le_bytes());
            }
            w.write_all(&sample_buf)?;
        }
        // Annotation stream, NUL-padded to its fixed size.
        let mut tal = tals[rec].clone();
        tal.resize(2 * ann_spr, 0u8);
        w.write_all(&tal)?;
    }

    w.flush().context("flushing EDF output")?;
    Ok(())
}

/// TAL byte stream per record: the mandatory record timestamp, followed by
/// the annotations whose onset falls inside that record.
fn build_tals(n_records: usize, annotations: &[Annotation]) -> Vec<Vec<u8>> {
    let mut tals: Vec<Vec<u8>> = Vec::with_capacity(n_records);
    for rec in 0..n_records {
        let mut buf = Vec::new();
        buf.extend_from_slice(format!("+{rec}\x14\x14\x00").as_bytes());
        for ann in annotations {
            let in_record = ann.onset >= rec as f64
                && (ann.onset < (rec + 1) as f64 || (rec == n_records - 1 && ann.onset >= rec as f64));
            if !in_record {
                continue;
            }
            buf.extend_from_slice(format!("+{:.4}", ann.onset).as_bytes());
            if let Some(dur) = ann.duration {
                buf.extend_from_slice(format!("\x15{dur:.4}").as_bytes());
            }
            buf.push(0x14);
            buf.extend(sanitize(&ann.label).bytes());
            buf.push(0x14);
            buf.push(0x00);
        }
        tals.push(buf);
    }
    tals
}

/// TAL text must not contain the TAL delimiter bytes.
fn sanitize(label: &str) -> String {
    label
        .chars()
        .filter(|&c| c != '\u{14}' && c != '\u{15}' && c != '\u{0}')
        .collect()
}

fn write_field(w: &mut impl Write, value: &str, width: usize) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > width {
        bail!("EDF header field {value:?} exceeds {width} bytes");
    }
    w.write_all(bytes)?;
    for _ in bytes.len()..width {
        w.write_all(b" ")?;
    }
    Ok(())
}
