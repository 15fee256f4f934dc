use ndarray::ArrayViewD;

pub(super) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Value of a single-element array
pub(super) fn scalar(arr: ArrayViewD<f64>) -> f64 {
    assert_eq!(arr.len(), 1, "expected a single element, got shape {:?}", arr.shape());
    arr.iter().copied().sum()
}
