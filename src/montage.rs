//! Standard 10–20 electrode layout and channel typing.
//!
//! Channel names are matched case-insensitively against the standard
//! 10–20/10–10 label set; each matched channel gets a scalp position in
//! metres (approximate spherical-head coordinates, x = right, y = anterior,
//! z = up). Positions feed the rejector's neighbor interpolation and the
//! component classifier's topography features.

use ndarray::Array2;

/// Coarse channel taxonomy derived from the label alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Eeg,
    Eog,
    Ecg,
    Emg,
    Stim,
    Misc,
}

/// Approximate standard 10–20/10–10 positions on a 9.5 cm sphere.
const STANDARD_1020: &[(&str, [f64; 3])] = &[
    ("fp1", [-0.0294, 0.0839, 0.0247]),
    ("fpz", [0.0000, 0.0887, 0.0248]),
    ("fp2", [0.0294, 0.0839, 0.0247]),
    ("af7", [-0.0549, 0.0683, 0.0226]),
    ("af3", [-0.0337, 0.0768, 0.0449]),
    ("afz", [0.0000, 0.0804, 0.0476]),
    ("af4", [0.0337, 0.0768, 0.0449]),
    ("af8", [0.0549, 0.0683, 0.0226]),
    ("f7", [-0.0702, 0.0424, 0.0206]),
    ("f5", [-0.0644, 0.0480, 0.0466]),
    ("f3", [-0.0502, 0.0531, 0.0666]),
    ("f1", [-0.0274, 0.0571, 0.0796]),
    ("fz", [0.0000, 0.0584, 0.0849]),
    ("f2", [0.0274, 0.0571, 0.0796]),
    ("f4", [0.0502, 0.0531, 0.0666]),
    ("f6", [0.0644, 0.0480, 0.0466]),
    ("f8", [0.0702, 0.0424, 0.0206]),
    ("ft7", [-0.0840, 0.0214, 0.0131]),
    ("fc5", [-0.0772, 0.0246, 0.0439]),
    ("fc3", [-0.0601, 0.0282, 0.0710]),
    ("fc1", [-0.0324, 0.0305, 0.0903]),
    ("fcz", [0.0000, 0.0313, 0.0973]),
    ("fc2", [0.0324, 0.0305, 0.0903]),
    ("fc4", [0.0601, 0.0282, 0.0710]),
    ("fc6", [0.0772, 0.0246, 0.0439]),
    ("ft8", [0.0840, 0.0214, 0.0131]),
    ("t7", [-0.0879, 0.0000, 0.0100]),
    ("t3", [-0.0879, 0.0000, 0.0100]),
    ("c5", [-0.0822, 0.0000, 0.0429]),
    ("c3", [-0.0653, 0.0000, 0.0736]),
    ("c1", [-0.0353, 0.0000, 0.0951]),
    ("cz", [0.0000, 0.0000, 0.1029]),
    ("c2", [0.0353, 0.0000, 0.0951]),
    ("c4", [0.0653, 0.0000, 0.0736]),
    ("c6", [0.0822, 0.0000, 0.0429]),
    ("t8", [0.0879, 0.0000, 0.0100]),
    ("t4", [0.0879, 0.0000, 0.0100]),
    ("tp7", [-0.0840, -0.0214, 0.0131]),
    ("cp5", [-0.0772, -0.0246, 0.0439]),
    ("cp3", [-0.0601, -0.0282, 0.0710]),
    ("cp1", [-0.0324, -0.0305, 0.0903]),
    ("cpz", [0.0000, -0.0313, 0.0973]),
    ("cp2", [0.0324, -0.0305, 0.0903]),
    ("cp4", [0.0601, -0.0282, 0.0710]),
    ("cp6", [0.0772, -0.0246, 0.0439]),
    ("tp8", [0.0840, -0.0214, 0.0131]),
    ("p7", [-0.0702, -0.0424, 0.0206]),
    ("t5", [-0.0702, -0.0424, 0.0206]),
    ("p5", [-0.0644, -0.0480, 0.0466]),
    ("p3", [-0.0502, -0.0531, 0.0666]),
    ("p1", [-0.0274, -0.0571, 0.0796]),
    ("pz", [0.0000, -0.0584, 0.0849]),
    ("p2", [0.0274, -0.0571, 0.0796]),
    ("p4", [0.0502, -0.0531, 0.0666]),
    ("p6", [0.0644, -0.0480, 0.0466]),
    ("p8", [0.0702, -0.0424, 0.0206]),
    ("t6", [0.0702, -0.0424, 0.0206]),
    ("po7", [-0.0549, -0.0683, 0.0226]),
    ("po3", [-0.0337, -0.0768, 0.0449]),
    ("poz", [0.0000, -0.0804, 0.0476]),
    ("po4", [0.0337, -0.0768, 0.0449]),
    ("po8", [0.0549, -0.0683, 0.0226]),
    ("o1", [-0.0294, -0.0839, 0.0247]),
    ("oz", [0.0000, -0.0887, 0.0248]),
    ("o2", [0.0294, -0.0839, 0.0247]),
    ("a1", [-0.0920, -0.0100, -0.0300]),
    ("a2", [0.0920, -0.0100, -0.0300]),
    ("m1", [-0.0860, -0.0340, -0.0250]),
    ("m2", [0.0860, -0.0340, -0.0250]),
];

/// Normalised lookup key: lowercase, spaces stripped, optional "eeg " prefix
/// removed.
fn key(label: &str) -> String {
    let lower = label.trim().to_ascii_lowercase();
    let lower = lower.strip_prefix("eeg ").unwrap_or(&lower);
    lower.replace(' ', "")
}

/// Scalp position for a channel label, if it belongs to the standard layout.
pub fn position(label: &str) -> Option<[f64; 3]> {
    let k = key(label);
    STANDARD_1020.iter().find(|(name, _)| *name == k).map(|(_, p)| *p)
}

/// Classify a channel label into a coarse type.
///
/// Priority: explicit prefix ("EOG …"), known artifact-channel patterns,
/// standard 10–20 electrode names, then `Misc`.
pub fn channel_type(label: &str) -> ChannelType {
    let lower = label.trim().to_ascii_lowercase();
    for (prefix, t) in [
        ("eog", ChannelType::Eog),
        ("veog", ChannelType::Eog),
        ("heog", ChannelType::Eog),
        ("ecg", ChannelType::Ecg),
        ("ekg", ChannelType::Ecg),
        ("emg", ChannelType::Emg),
        ("stim", ChannelType::Stim),
        ("trigger", ChannelType::Stim),
        ("status", ChannelType::Stim),
    ] {
        if lower.starts_with(prefix) {
            return t;
        }
    }
    if position(label).is_some() || lower.starts_with("eeg") {
        ChannelType::Eeg
    } else {
        ChannelType::Misc
    }
}

/// Indices of the EEG-type channels in `ch_names`.
pub fn eeg_picks(ch_names: &[String]) -> Vec<usize> {
    ch_names
        .iter()
        .enumerate()
        .filter(|(_, n)| channel_type(n) == ChannelType::Eeg)
        .map(|(i, _)| i)
        .collect()
}

/// `[C, 3]` position matrix for the given channels; channels without a
/// standard position get the origin.
pub fn positions(ch_names: &[String]) -> Array2<f64> {
    let mut out = Array2::zeros((ch_names.len(), 3));
    for (i, name) in ch_names.iter().enumerate() {
        if let Some(p) = position(name) {
            out[[i, 0]] = p[0];
            out[[i, 1]] = p[1];
            out[[i, 2]] = p[2];
        }
    }
    out
}
