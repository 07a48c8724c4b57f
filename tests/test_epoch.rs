use eegprep::epoch::make_fixed_length_epochs;
use ndarray::Array2;

#[test]
fn windows_tile_the_signal_without_overlap() {
    let data = Array2::from_shape_fn((2, 1_000), |(c, t)| (c * 1_000 + t) as f64);
    let epochs = make_fixed_length_epochs(&data, 200, 200.0);
    assert_eq!(epochs.n_epochs(), 5);
    for e in 0..5 {
        for t in 0..200 {
            assert_eq!(epochs.data[[e, 0, t]], (e * 200 + t) as f64);
            assert_eq!(epochs.data[[e, 1, t]], (1_000 + e * 200 + t) as f64);
        }
    }
}

#[test]
fn concat_with_no_bad_windows_keeps_every_third_sample() {
    let data = Array2::from_shape_fn((1, 600), |(_, t)| t as f64);
    let epochs = make_fixed_length_epochs(&data, 200, 200.0);
    let cat = epochs.concat_good(&[false, false, false], 3);
    // Decimation restarts at each window boundary: ceil(200 / 3) per window.
    assert_eq!(cat.ncols(), 3 * 67);
    for e in 0..3 {
        for k in 0..67 {
            assert_eq!(cat[[0, e * 67 + k]], (e * 200 + k * 3) as f64);
        }
    }
}

#[test]
fn short_recording_yields_no_windows() {
    let data = Array2::<f64>::zeros((3, 150));
    let epochs = make_fixed_length_epochs(&data, 200, 200.0);
    assert_eq!(epochs.n_epochs(), 0);
}
