mod common;

use eegprep::epoch::make_fixed_length_epochs;
use eegprep::montage::positions;
use eegprep::reject::fit_reject;
use ndarray::Array2;

#[test]
fn huge_amplitude_windows_are_flagged() {
    let sfreq = 200.0;
    let n_ch = 4;
    let n_epochs = 20;
    let n_t = n_epochs * 200;
    let mut data = common::make_signal(n_ch, n_t, sfreq, 11);

    // Blow up two windows on every channel.
    for &e in &[4usize, 13] {
        for c in 0..n_ch {
            for t in e * 200..(e + 1) * 200 {
                data[[c, t]] *= 25.0;
            }
        }
    }

    let epochs = make_fixed_length_epochs(&data, 200, sfreq);
    let names = common::channel_names();
    let pos = positions(&names);
    let picks: Vec<usize> = (0..n_ch).collect();
    let log = fit_reject(&epochs, &picks, &pos, &[1, 2, 4], 5, 42).unwrap();

    assert!(log.bad_epochs[4], "spiked window 4 not rejected");
    assert!(log.bad_epochs[13], "spiked window 13 not rejected");
    assert!(log.n_bad() <= 5, "over-rejection: {} of {} windows", log.n_bad(), n_epochs);
}

#[test]
fn clean_data_keeps_most_windows() {
    let sfreq = 200.0;
    let data = common::make_signal(4, 4_000, sfreq, 12);
    let epochs = make_fixed_length_epochs(&data, 200, sfreq);
    let names = common::channel_names();
    let pos = positions(&names);
    let log = fit_reject(&epochs, &[0, 1, 2, 3], &pos, &[1, 2, 4], 5, 42).unwrap();
    assert!(log.n_bad() <= epochs.n_epochs() / 4);
}

#[test]
fn fit_is_deterministic_for_a_seed() {
    let data = common::make_signal(4, 4_000, 200.0, 13);
    let epochs = make_fixed_length_epochs(&data, 200, 200.0);
    let names = common::channel_names();
    let pos = positions(&names);
    let a = fit_reject(&epochs, &[0, 1, 2, 3], &pos, &[1, 2, 4], 5, 42).unwrap();
    let b = fit_reject(&epochs, &[0, 1, 2, 3], &pos, &[1, 2, 4], 5, 42).unwrap();
    assert_eq!(a.bad_epochs, b.bad_epochs);
    assert_eq!(a.n_interpolate, b.n_interpolate);
}

#[test]
fn too_few_windows_is_an_error() {
    let data = Array2::<f64>::zeros((4, 600));
    let epochs = make_fixed_length_epochs(&data, 200, 200.0);
    let names = common::channel_names();
    let pos = positions(&names);
    assert!(fit_reject(&epochs, &[0, 1, 2, 3], &pos, &[1], 5, 42).is_err());
}
