//! Numeric primitives shared by the learners
//!
//! Tie-breaking in [`argmax`] and [`argmin`] always selects the lowest index,
//! so greedy selection and max/min bootstraps are reproducible.

use ndarray::{Array1, ArrayView1};

/// One-hot vector of length `size` with a 1.0 at `index`
#[must_use]
pub fn onehot(index: usize, size: usize) -> Array1<f64> {
    let mut v = Array1::zeros(size);
    v[index] = 1.0;
    v
}

/// Softmax over a vector, shifted by its maximum for stability
#[must_use]
pub fn softmax(values: ArrayView1<f64>) -> Array1<f64> {
    let max = values.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let exp = values.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

/// Index of the largest element, lowest index on ties
#[must_use]
pub fn argmax(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Index of the smallest element, lowest index on ties
#[must_use]
pub fn argmin(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v < values[best] {
            best = i;
        }
    }
    best
}

/// Largest element
#[must_use]
pub fn max(values: ArrayView1<f64>) -> f64 {
    values[argmax(values)]
}

/// Smallest element
#[must_use]
pub fn min(values: ArrayView1<f64>) -> f64 {
    values[argmin(values)]
}

/// Euclidean norm
#[must_use]
pub fn norm(values: ArrayView1<f64>) -> f64 {
    values.dot(&values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_onehot() {
        assert_eq!(onehot(2, 4), array![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_softmax_sums_to_one_with_large_inputs() {
        let p = softmax(array![1e4, 2e4, 0.0].view());
        assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ties_resolve_to_lowest_index() {
        let v = array![1.0, 3.0, 3.0, -2.0, -2.0];
        assert_eq!(argmax(v.view()), 1);
        assert_eq!(argmin(v.view()), 3);
        assert_abs_diff_eq!(max(v.view()), 3.0);
        assert_abs_diff_eq!(min(v.view()), -2.0);
    }

    #[test]
    fn test_norm() {
        assert_abs_diff_eq!(norm(array![3.0, 4.0].view()), 5.0);
    }

    proptest::proptest! {
        #[test]
        fn softmax_is_a_distribution(values in proptest::collection::vec(-1e6..1e6f64, 1..12)) {
            let p = softmax(Array1::from(values.clone()).view());
            proptest::prop_assert!((p.sum() - 1.0).abs() < 1e-9);
            proptest::prop_assert!(p.iter().all(|x| (0.0..=1.0).contains(x)));
            let best = argmax(Array1::from(values).view());
            proptest::prop_assert_eq!(argmax(p.view()), best);
        }
    }
}
