//! Diagnostic figures written after each cleaned run.
//!
//! Two PNGs per recording: an original-vs-cleaned overlay of the first few
//! channels, and the per-channel power spectral density of the cleaned
//! signal. The drawing helpers speak plotters' own error type; the public
//! functions fold it into the crate's error chain with the target path.

use anyhow::{anyhow, Result};
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

use crate::spectrum::welch_psd;

const PALETTE: [RGBColor; 6] = [
    RGBColor(220, 50, 50),
    RGBColor(50, 100, 220),
    RGBColor(50, 150, 50),
    RGBColor(220, 150, 50),
    RGBColor(150, 50, 220),
    RGBColor(100, 100, 100),
];

/// Overlay the first channels of the original and cleaned signals over the
/// first ten seconds, one panel per channel.
pub fn plot_overlay(
    path: &Path,
    original: &Array2<f64>,
    cleaned: &Array2<f64>,
    sfreq: f64,
    ch_names: &[String],
) -> Result<()> {
    let n_ch = original.nrows().min(cleaned.nrows()).min(4);
    anyhow::ensure!(n_ch > 0, "no channels to plot");
    let n_t = original
        .ncols()
        .min(cleaned.ncols())
        .min((10.0 * sfreq) as usize);
    anyhow::ensure!(n_t > 1, "signal too short to plot");

    render_overlay(path, original, cleaned, sfreq, ch_names, n_ch, n_t)
        .map_err(|e| anyhow!("rendering {}: {e}", path.display()))
}

fn render_overlay(
    path: &Path,
    original: &Array2<f64>,
    cleaned: &Array2<f64>,
    sfreq: f64,
    ch_names: &[String],
    n_ch: usize,
    n_t: usize,
) -> std::result::Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1400, 250 * n_ch as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((n_ch, 1));

    for (c, panel) in panels.iter().enumerate() {
        let name = ch_names.get(c).map(String::as_str).unwrap_or("eeg");
        draw_pair_panel(
            panel,
            name,
            original.row(c).iter().take(n_t).copied().collect(),
            cleaned.row(c).iter().take(n_t).copied().collect(),
            sfreq,
        )?;
    }
    root.present()?;
    Ok(())
}

fn draw_pair_panel(
    panel: &DrawingArea<BitMapBackend, Shift>,
    name: &str,
    original: Vec<f64>,
    cleaned: Vec<f64>,
    sfreq: f64,
) -> std::result::Result<(), Box<dyn Error>> {
    let n_t = original.len();
    let t_max = n_t as f64 / sfreq;
    let (lo, hi) = value_range(original.iter().chain(cleaned.iter()));

    let mut chart = ChartBuilder::on(panel)
        .caption(name, ("sans-serif", 18).into_font())
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..t_max, lo..hi)?;
    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Amplitude (uV)")
        .draw()?;

    let series = [("original", &original, PALETTE[5]), ("cleaned", &cleaned, PALETTE[0])];
    for (label, data, color) in series {
        chart
            .draw_series(LineSeries::new(
                data.iter().enumerate().map(|(i, &v)| (i as f64 / sfreq, v)),
                ShapeStyle::from(&color).stroke_width(1),
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;
    Ok(())
}

/// Per-channel Welch PSD of the cleaned signal, log power against
/// frequency up to Nyquist.
pub fn plot_psd(path: &Path, data: &Array2<f64>, sfreq: f64, ch_names: &[String]) -> Result<()> {
    anyhow::ensure!(data.nrows() > 0, "no channels to plot");

    let mut spectra = Vec::with_capacity(data.nrows());
    for c in 0..data.nrows() {
        let x = data.row(c).to_vec();
        spectra.push(welch_psd(&x, sfreq, 512));
    }
    render_psd(path, &spectra, sfreq, ch_names)
        .map_err(|e| anyhow!("rendering {}: {e}", path.display()))
}

fn render_psd(
    path: &Path,
    spectra: &[(Vec<f64>, Vec<f64>)],
    sfreq: f64,
    ch_names: &[String],
) -> std::result::Result<(), Box<dyn Error>> {
    let nyq = sfreq / 2.0;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (_, psd) in spectra {
        for &p in psd {
            let db = 10.0 * p.max(1e-20).log10();
            lo = lo.min(db);
            hi = hi.max(db);
        }
    }
    let margin = ((hi - lo) * 0.05).max(1.0);

    let root = BitMapBackend::new(path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Power spectral density", ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..nyq, (lo - margin)..(hi + margin))?;
    chart
        .configure_mesh()
        .x_desc("Frequency (Hz)")
        .y_desc("Power (dB)")
        .draw()?;

    for (c, (freqs, psd)) in spectra.iter().enumerate() {
        let color = PALETTE[c % PALETTE.len()];
        let name = ch_names.get(c).cloned().unwrap_or_else(|| format!("ch{c}"));
        chart
            .draw_series(LineSeries::new(
                freqs
                    .iter()
                    .zip(psd)
                    .map(|(&f, &p)| (f, 10.0 * p.max(1e-20).log10())),
                ShapeStyle::from(&color).stroke_width(1),
            ))?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

fn value_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let margin = ((hi - lo) * 0.1).max(1e-6);
    (lo - margin, hi + margin)
}
