use crate::error::Error;
use ndarray::prelude::*;
use num_traits::Float;

const SAFE_LN_MIN: f64 = 1e-25;

/// Natural log floored at `ln(1e-25)`, so a zero survival stays finite.
pub(crate) fn safe_ln(x: f64) -> f64 {
    x.max(SAFE_LN_MIN).ln()
}

/// Fails with `DimensionMismatch` unless `actual == expected`.
pub fn check_dimension(name: &'static str, expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            name,
            expected,
            actual,
        })
    }
}

/// Rejects NaN and infinite entries. The input is never modified.
pub fn validate_weights<F: Float + Into<f64>>(weights: ArrayView1<F>) -> Result<(), Error> {
    match weights.iter().position(|w| !w.is_finite()) {
        Some(index) => Err(Error::InvalidWeight {
            index,
            value: weights[index].into(),
        }),
        None => Ok(()),
    }
}

/// Returns the validated weights, or unit weights when none were given.
pub fn resolve_weights(len: usize, weights: Option<ArrayView1<f64>>) -> Result<Array1<f64>, Error> {
    match weights {
        Some(weights) => {
            check_dimension("weights", len, weights.len())?;
            validate_weights(weights)?;
            Ok(weights.to_owned())
        }
        None => Ok(Array1::ones(len)),
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WeightedMoments {
    pub mean: f64,
    /// Unbiased for reliability weights; the usual `n - 1` estimator under unit weights.
    pub variance: f64,
    pub total_weight: f64,
}

pub fn weighted_moments(values: ArrayView1<f64>, weights: ArrayView1<f64>) -> Result<WeightedMoments, Error> {
    check_dimension("weights", values.len(), weights.len())?;
    if values.len() < 2 {
        return Err(Error::invalid_parameter(
            "observations",
            format!("at least two observations are required, got {}", values.len()),
        ));
    }

    let total_weight = weights.sum();
    let squared_weight = weights.dot(&weights);
    let denominator = total_weight - squared_weight / total_weight;
    if !(total_weight > 0.) || !(denominator > 0.) {
        return Err(Error::invalid_parameter(
            "weights",
            "weights must have a positive sum spread over more than one observation",
        ));
    }

    let mean = weights.dot(&values) / total_weight;
    let squares: f64 = values
        .iter()
        .zip(weights.iter())
        .map(|(x, w)| w * (x - mean) * (x - mean))
        .sum();

    Ok(WeightedMoments {
        mean,
        variance: squares / denominator,
        total_weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn unit_weights_match_sample_variance() {
        let values = array![1., 2., 3., 4., 10.];
        let weights = Array1::ones(5);

        let moments = weighted_moments(values.view(), weights.view()).unwrap();

        assert_abs_diff_eq!(moments.mean, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(moments.variance, 12.5, epsilon = 1e-12);
        assert_abs_diff_eq!(moments.total_weight, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn weights_shift_the_mean() {
        let values = array![0., 1.];
        let weights = array![1., 3.];

        let moments = weighted_moments(values.view(), weights.view()).unwrap();

        assert_abs_diff_eq!(moments.mean, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn non_finite_weights_are_rejected() {
        let weights = array![1., f64::NAN, 2.];
        match validate_weights(weights.view()) {
            Err(Error::InvalidWeight { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result {:?}", other),
        }

        let weights = array![1., 2., f64::INFINITY];
        assert!(resolve_weights(3, Some(weights.view())).is_err());
    }

    #[test]
    fn missing_weights_default_to_one() {
        let weights = resolve_weights(3, None).unwrap();
        assert_eq!(weights, array![1., 1., 1.]);
    }

    #[test]
    fn mismatched_weights_are_rejected() {
        let weights = array![1., 2.];
        assert!(matches!(
            resolve_weights(3, Some(weights.view())),
            Err(Error::DimensionMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn safe_ln_is_finite_at_zero() {
        assert!(safe_ln(0.).is_finite());
        assert!(safe_ln(-1.).is_finite());
        assert_eq!(safe_ln(1.), 0.);
    }
}
