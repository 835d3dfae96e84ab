use crate::error::Error;
use crate::random::VariateSource;
use ndarray::{Array1, ArrayView1};
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use std::sync::OnceLock;

pub mod beta;
pub mod empirical_hazard;
pub mod generalized_beta;
pub mod normal;
pub mod numeric;

/// The range of values a distribution assigns probability to.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Support {
    pub min: f64,
    pub max: f64,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

impl Support {
    pub fn closed(min: f64, max: f64) -> Self {
        Support {
            min,
            max,
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    pub fn open(min: f64, max: f64) -> Self {
        Support {
            min,
            max,
            min_inclusive: false,
            max_inclusive: false,
        }
    }

    /// `[min, max)`
    pub fn half_open(min: f64, max: f64) -> Self {
        Support {
            min,
            max,
            min_inclusive: true,
            max_inclusive: false,
        }
    }

    pub fn real_line() -> Self {
        Support::open(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn contains(&self, x: f64) -> bool {
        let above = if self.min_inclusive { x >= self.min } else { x > self.min };
        let below = if self.max_inclusive { x <= self.max } else { x < self.max };
        above && below
    }
}

/// Operations every univariate distribution provides.
///
/// Query methods never mutate the instance and never panic on inputs
/// outside [`support`](Self::support): densities and hazards are zero there,
/// the distribution function is 0 below and 1 above.
pub trait UnivariateDistribution {
    fn support(&self) -> Support;

    fn mean(&self) -> Result<f64, Error>;

    fn variance(&self) -> Result<f64, Error>;

    fn standard_deviation(&self) -> Result<f64, Error> {
        Ok(self.variance()?.sqrt())
    }

    fn mode(&self) -> Result<f64, Error>;

    /// Defaults to the quantile at one half.
    fn median(&self) -> f64 {
        self.inverse_distribution_function(0.5)
    }

    fn entropy(&self) -> Result<f64, Error>;

    /// P(X <= x)
    fn distribution_function(&self, x: f64) -> f64;

    /// P(X > x)
    fn complementary_distribution_function(&self, x: f64) -> f64 {
        1. - self.distribution_function(x)
    }

    fn probability_density_function(&self, x: f64) -> f64;

    fn log_probability_density_function(&self, x: f64) -> f64 {
        self.probability_density_function(x).ln()
    }

    /// Quantile function. Without a closed form this bisects the distribution function.
    fn inverse_distribution_function(&self, p: f64) -> f64 {
        numeric::inverse_by_bisection(self, p)
    }

    fn hazard_function(&self, x: f64) -> f64 {
        let survival = self.complementary_distribution_function(x);
        if survival > 0. {
            self.probability_density_function(x) / survival
        } else {
            0.
        }
    }

    fn cumulative_hazard_function(&self, x: f64) -> f64 {
        -self.complementary_distribution_function(x).ln()
    }
}

/// Distributions whose parameters can be estimated from observations.
pub trait Fit {
    type Options: Default;

    /// Replaces the parameters with estimates from `observations`.
    ///
    /// On error the instance keeps its previous parameters.
    fn fit(
        &mut self,
        observations: ArrayView1<f64>,
        weights: Option<ArrayView1<f64>>,
        options: &Self::Options,
    ) -> Result<(), Error>;
}

pub trait Sample {
    fn generate<R: Rng>(&self, source: &mut VariateSource<R>) -> f64;

    fn generate_many<R: Rng>(&self, samples: usize, source: &mut VariateSource<R>) -> Array1<f64> {
        let draws: Vec<f64> = (0..samples).map(|_| self.generate(source)).collect();
        Array1::from(draws)
    }
}

/// Lazily computed derived quantities.
///
/// A cache belongs to one parameter snapshot: it is only ever replaced as a
/// whole together with the parameters, never invalidated field by field.
#[derive(Debug, Default, Clone)]
pub struct DerivedCache {
    mean: OnceLock<f64>,
    variance: OnceLock<f64>,
}

impl DerivedCache {
    pub fn mean(&self, compute: impl FnOnce() -> f64) -> f64 {
        *self.mean.get_or_init(compute)
    }

    pub fn variance(&self, compute: impl FnOnce() -> f64) -> f64 {
        *self.variance.get_or_init(compute)
    }
}

// Cached values are a function of the parameters and carry no identity.
impl PartialEq for DerivedCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}
