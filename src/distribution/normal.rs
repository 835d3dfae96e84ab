use super::{Fit, Sample, Support, UnivariateDistribution};
use crate::error::Error;
use crate::random::VariateSource;
use crate::utils::{resolve_weights, weighted_moments};
use ndarray::ArrayView1;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{E, PI, SQRT_2};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalDistribution {
    mean: f64,
    standard_deviation: f64,
}

impl NormalDistribution {
    /// N(0, 1). Being a constant, it can only ever be copied out, never altered in place.
    pub const STANDARD: NormalDistribution = NormalDistribution {
        mean: 0.,
        standard_deviation: 1.,
    };

    pub fn new(mean: f64, standard_deviation: f64) -> Result<Self, Error> {
        if !mean.is_finite() {
            return Err(Error::invalid_parameter("mean", "must be finite"));
        }
        if !(standard_deviation > 0.) || !standard_deviation.is_finite() {
            return Err(Error::invalid_parameter(
                "standard_deviation",
                format!("must be positive and finite, got {}", standard_deviation),
            ));
        }

        Ok(NormalDistribution {
            mean,
            standard_deviation,
        })
    }

    pub fn estimate(observations: ArrayView1<f64>, weights: Option<ArrayView1<f64>>) -> Result<Self, Error> {
        let weights = resolve_weights(observations.len(), weights)?;
        let moments = weighted_moments(observations, weights.view())?;
        NormalDistribution::new(moments.mean, moments.variance.sqrt())
    }

    fn z(&self, x: f64) -> f64 {
        (x - self.mean) / self.standard_deviation
    }
}

impl Default for NormalDistribution {
    fn default() -> Self {
        NormalDistribution::STANDARD
    }
}

impl UnivariateDistribution for NormalDistribution {
    fn support(&self) -> Support {
        Support::real_line()
    }

    fn mean(&self) -> Result<f64, Error> {
        Ok(self.mean)
    }

    fn variance(&self) -> Result<f64, Error> {
        Ok(self.standard_deviation * self.standard_deviation)
    }

    fn standard_deviation(&self) -> Result<f64, Error> {
        Ok(self.standard_deviation)
    }

    fn mode(&self) -> Result<f64, Error> {
        Ok(self.mean)
    }

    fn median(&self) -> f64 {
        self.mean
    }

    fn entropy(&self) -> Result<f64, Error> {
        Ok(0.5 * (2. * PI * E * self.standard_deviation * self.standard_deviation).ln())
    }

    fn distribution_function(&self, x: f64) -> f64 {
        0.5 * erfc(-self.z(x) / SQRT_2)
    }

    fn complementary_distribution_function(&self, x: f64) -> f64 {
        0.5 * erfc(self.z(x) / SQRT_2)
    }

    fn probability_density_function(&self, x: f64) -> f64 {
        self.log_probability_density_function(x).exp()
    }

    fn log_probability_density_function(&self, x: f64) -> f64 {
        let z = self.z(x);
        -0.5 * z * z - self.standard_deviation.ln() - 0.5 * (2. * PI).ln()
    }

    fn inverse_distribution_function(&self, p: f64) -> f64 {
        if p <= 0. {
            return f64::NEG_INFINITY;
        }
        if p >= 1. {
            return f64::INFINITY;
        }
        self.mean - self.standard_deviation * SQRT_2 * erfc_inv(2. * p)
    }
}

impl Fit for NormalDistribution {
    type Options = ();

    fn fit(
        &mut self,
        observations: ArrayView1<f64>,
        weights: Option<ArrayView1<f64>>,
        _options: &(),
    ) -> Result<(), Error> {
        *self = NormalDistribution::estimate(observations, weights)?;
        Ok(())
    }
}

impl Sample for NormalDistribution {
    fn generate<R: Rng>(&self, source: &mut VariateSource<R>) -> f64 {
        self.mean + self.standard_deviation * source.standard_normal()
    }
}

impl fmt::Display for NormalDistribution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "N(x; μ = {}, σ² = {})",
            self.mean,
            self.standard_deviation * self.standard_deviation
        )
    }
}
