use crate::distribution::UnivariateDistribution;
use crate::error::Error;
use crate::utils::{check_dimension, validate_weights};
use ndarray::{ArrayBase, Data, Ix1, RawData};

pub mod fitter;
pub mod survival;

/// The log likelihood of a data based on a distribution.
pub trait LogLikelihood<Distribution, F> {
    fn log_likelihood(&self, distribution: &Distribution) -> F;
}

/// Partial derivatives of the log likelihood, in the same order as the
/// distribution's parameter vector.
pub trait LogLikelihoodGradient<Distribution, F> {
    fn log_likelihood_gradient(&self, distribution: &Distribution) -> Vec<F>;
}

/// A wrapper around data to apply weights to log likelihoods.
pub struct Weighted<T: RawData, W: RawData> {
    pub values: ArrayBase<T, Ix1>,
    pub weight: ArrayBase<W, Ix1>,
}

impl<T, W> Weighted<T, W>
where
    T: Data<Elem = f64>,
    W: Data<Elem = f64>,
{
    pub fn new(values: ArrayBase<T, Ix1>, weight: ArrayBase<W, Ix1>) -> Result<Self, Error> {
        check_dimension("weights", values.len(), weight.len())?;
        validate_weights(weight.view())?;
        Ok(Weighted { values, weight })
    }
}

/// Weight-normalised log likelihood, so that samples of different total
/// weight are on the same scale.
impl<D, T, W> LogLikelihood<D, f64> for Weighted<T, W>
where
    D: UnivariateDistribution,
    T: Data<Elem = f64>,
    W: Data<Elem = f64>,
{
    fn log_likelihood(&self, distribution: &D) -> f64 {
        let Weighted { values, weight } = self;

        let weighted: f64 = values
            .iter()
            .zip(weight.iter())
            .filter(|&(_, &w)| w != 0.)
            .map(|(&x, &w)| w * distribution.log_probability_density_function(x))
            .sum();
        weighted / weight.sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::normal::NormalDistribution;
    use ndarray::prelude::*;

    const TOLERANCE: f64 = 1e-10;

    #[test]
    fn weighted_log_likelihood_is_normalised() {
        let distribution = NormalDistribution::STANDARD;
        let single = Weighted::new(array![0.5], array![1.]).unwrap();
        let repeated = Weighted::new(array![0.5, 0.5], array![2., 2.]).unwrap();

        let expected = distribution.log_probability_density_function(0.5);
        let a: f64 = single.log_likelihood(&distribution);
        let b: f64 = repeated.log_likelihood(&distribution);

        assert!((a - expected).abs() < TOLERANCE);
        assert!((b - expected).abs() < TOLERANCE);
    }

    #[test]
    fn zero_weights_ignore_impossible_values() {
        let distribution = crate::distribution::beta::BetaDistribution::new(2., 2.).unwrap();
        let events = Weighted::new(array![0.5, 2.0], array![1., 0.]).unwrap();

        let actual: f64 = events.log_likelihood(&distribution);
        assert!((actual - 1.5f64.ln()).abs() < TOLERANCE);
    }

    #[test]
    fn rejects_bad_weights() {
        assert!(Weighted::new(array![1., 2.], array![1.]).is_err());
        assert!(Weighted::new(array![1., 2.], array![1., f64::NAN]).is_err());
    }
}
