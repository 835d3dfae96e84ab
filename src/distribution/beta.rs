use super::{Fit, Sample, Support, UnivariateDistribution};
use crate::error::Error;
use crate::random::VariateSource;
use crate::sample::fitter::{BaseFitter, Fitter, FitterParameters, InitialSolvePoint};
use crate::sample::{LogLikelihood, LogLikelihoodGradient, Weighted};
use crate::utils::{resolve_weights, weighted_moments};
use log::{debug, log_enabled, Level};
use ndarray::ArrayView1;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use statrs::function::beta::{beta_reg, ln_beta};
use statrs::function::gamma::digamma;
use std::fmt;
use std::str::FromStr;

/// Beta distribution on `[0, 1]` with shape parameters α and β.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaDistribution {
    alpha: f64,
    beta: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetaEstimationMethod {
    Moments,
    MaximumLikelihood,
}

impl Default for BetaEstimationMethod {
    fn default() -> Self {
        BetaEstimationMethod::Moments
    }
}

impl fmt::Display for BetaEstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BetaEstimationMethod::Moments => write!(f, "moments"),
            BetaEstimationMethod::MaximumLikelihood => write!(f, "maximum-likelihood"),
        }
    }
}

impl FromStr for BetaEstimationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "moments" => Ok(BetaEstimationMethod::Moments),
            "maximum-likelihood" | "maximumlikelihood" | "mle" => {
                Ok(BetaEstimationMethod::MaximumLikelihood)
            }
            _ => Err(Error::UnknownOption {
                option: "method",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaOptions {
    pub method: BetaEstimationMethod,
    pub fitter: FitterParameters,
}

impl BetaOptions {
    pub fn with_method(mut self, method: BetaEstimationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_fitter(mut self, fitter: FitterParameters) -> Self {
        self.fitter = fitter;
        self
    }
}

/// `a * ln(x)`, taking `0 * ln(0)` as zero.
fn xlogy(a: f64, x: f64) -> f64 {
    if a == 0. {
        0.
    } else {
        a * x.ln()
    }
}

impl BetaDistribution {
    pub fn new(alpha: f64, beta: f64) -> Result<Self, Error> {
        if !(alpha > 0.) || !alpha.is_finite() {
            return Err(Error::invalid_parameter(
                "alpha",
                format!("must be positive and finite, got {}", alpha),
            ));
        }
        if !(beta > 0.) || !beta.is_finite() {
            return Err(Error::invalid_parameter(
                "beta",
                format!("must be positive and finite, got {}", beta),
            ));
        }

        Ok(BetaDistribution { alpha, beta })
    }

    /// Posterior of a uniform prior after `successes` out of `trials`:
    /// α = successes + 1, β = trials − successes + 1.
    pub fn from_successes(successes: i64, trials: i64) -> Result<Self, Error> {
        if successes < 0 {
            return Err(Error::invalid_parameter("successes", "must be non-negative"));
        }
        if trials < 0 {
            return Err(Error::invalid_parameter("trials", "must be non-negative"));
        }
        if successes > trials {
            return Err(Error::invalid_parameter(
                "successes",
                format!("{} successes exceed {} trials", successes, trials),
            ));
        }

        BetaDistribution::new(successes as f64 + 1., (trials - successes) as f64 + 1.)
    }

    /// Matches the first two moments.
    pub fn from_moments(mean: f64, variance: f64) -> Result<Self, Error> {
        if !(mean > 0. && mean < 1.) {
            return Err(Error::NotSupported(format!(
                "mean {} is outside (0, 1)",
                mean
            )));
        }
        let limit = mean * (1. - mean);
        if !(variance > 0. && variance < limit) {
            return Err(Error::NotSupported(format!(
                "variance {} is outside (0, {}) for mean {}",
                variance, limit, mean
            )));
        }

        let u = limit / variance - 1.;
        BetaDistribution::new(mean * u, (1. - mean) * u)
    }

    pub fn estimate(
        observations: ArrayView1<f64>,
        weights: Option<ArrayView1<f64>>,
        options: &BetaOptions,
    ) -> Result<Self, Error> {
        let weights = resolve_weights(observations.len(), weights)?;
        let fitted = match options.method {
            BetaEstimationMethod::Moments => {
                BetaDistribution::estimate_moments(observations, weights.view())?
            }
            BetaEstimationMethod::MaximumLikelihood => BetaDistribution::estimate_maximum_likelihood(
                observations,
                weights.view(),
                &options.fitter,
            )?,
        };

        debug!(
            "estimated {} by {} from {} observations",
            fitted,
            options.method,
            observations.len()
        );
        Ok(fitted)
    }

    pub(crate) fn estimate_moments(
        observations: ArrayView1<f64>,
        weights: ArrayView1<f64>,
    ) -> Result<Self, Error> {
        if let Some(x) = observations.iter().find(|x| !(**x >= 0. && **x <= 1.)) {
            return Err(Error::invalid_parameter(
                "observations",
                format!("{} lies outside [0, 1]", x),
            ));
        }

        let moments = weighted_moments(observations, weights)?;
        BetaDistribution::from_moments(moments.mean, moments.variance)
    }

    pub(crate) fn estimate_maximum_likelihood(
        observations: ArrayView1<f64>,
        weights: ArrayView1<f64>,
        parameters: &FitterParameters,
    ) -> Result<Self, Error> {
        let sample = Weighted::new(observations, weights)?;
        let state = BetaLogMoments::new(sample.values.view(), sample.weight.view())?;
        let fitter: BaseFitter<_, BetaDistribution> = BaseFitter::new(state);
        let fitted = fitter.fit(parameters)?;

        if log_enabled!(Level::Debug) {
            let log_likelihood: f64 = sample.log_likelihood(&fitted);
            debug!("mean log likelihood of {}: {}", fitted, log_likelihood);
        }
        Ok(fitted)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

impl From<BetaDistribution> for Vec<f64> {
    fn from(distribution: BetaDistribution) -> Self {
        vec![distribution.alpha, distribution.beta]
    }
}

impl<'a> TryFrom<&'a [f64]> for BetaDistribution {
    type Error = Error;

    fn try_from(array: &'a [f64]) -> Result<Self, Self::Error> {
        if array.len() != 2 {
            return Err(Error::IncompatibleDistributionParameterCount(
                array.len(),
                2,
            ));
        }

        BetaDistribution::new(array[0], array[1])
    }
}

impl UnivariateDistribution for BetaDistribution {
    fn support(&self) -> Support {
        Support::closed(0., 1.)
    }

    fn mean(&self) -> Result<f64, Error> {
        Ok(self.alpha / (self.alpha + self.beta))
    }

    fn variance(&self) -> Result<f64, Error> {
        let ab = self.alpha + self.beta;
        Ok(self.alpha * self.beta / (ab * ab * (ab + 1.)))
    }

    fn mode(&self) -> Result<f64, Error> {
        let (a, b) = (self.alpha, self.beta);
        if a > 1. && b > 1. {
            Ok((a - 1.) / (a + b - 2.))
        } else if a == 1. && b == 1. {
            Ok(0.5)
        } else if a <= 1. && b >= 1. {
            Ok(0.)
        } else if a >= 1. && b <= 1. {
            Ok(1.)
        } else {
            // U-shaped: both ends are modes
            Err(Error::UnsupportedOperation("mode"))
        }
    }

    fn entropy(&self) -> Result<f64, Error> {
        let (a, b) = (self.alpha, self.beta);
        Ok(ln_beta(a, b) - (a - 1.) * digamma(a) - (b - 1.) * digamma(b)
            + (a + b - 2.) * digamma(a + b))
    }

    fn distribution_function(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if x <= 0. {
            return 0.;
        }
        if x >= 1. {
            return 1.;
        }
        beta_reg(self.alpha, self.beta, x)
    }

    fn complementary_distribution_function(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if x <= 0. {
            return 1.;
        }
        if x >= 1. {
            return 0.;
        }
        beta_reg(self.beta, self.alpha, 1. - x)
    }

    fn probability_density_function(&self, x: f64) -> f64 {
        if !(x >= 0. && x <= 1.) {
            return 0.;
        }
        self.log_probability_density_function(x).exp()
    }

    fn log_probability_density_function(&self, x: f64) -> f64 {
        if !(x >= 0. && x <= 1.) {
            return f64::NEG_INFINITY;
        }
        xlogy(self.alpha - 1., x) + xlogy(self.beta - 1., 1. - x) - ln_beta(self.alpha, self.beta)
    }
}

impl Fit for BetaDistribution {
    type Options = BetaOptions;

    fn fit(
        &mut self,
        observations: ArrayView1<f64>,
        weights: Option<ArrayView1<f64>>,
        options: &BetaOptions,
    ) -> Result<(), Error> {
        *self = BetaDistribution::estimate(observations, weights, options)?;
        Ok(())
    }
}

impl Sample for BetaDistribution {
    fn generate<R: Rng>(&self, source: &mut VariateSource<R>) -> f64 {
        let x = source.standard_gamma(self.alpha);
        let y = source.standard_gamma(self.beta);
        let total = x + y;
        if total > 0. {
            x / total
        } else if source.uniform() < self.alpha / (self.alpha + self.beta) {
            // both draws underflowed; the limit puts all mass on the ends
            1.
        } else {
            0.
        }
    }
}

impl fmt::Display for BetaDistribution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "B(x; α = {}, β = {})", self.alpha, self.beta)
    }
}

/// Sufficient statistics of a Beta sample: weighted means of `ln x` and `ln(1 - x)`.
#[derive(Debug, Copy, Clone)]
pub struct BetaLogMoments {
    mean_ln: f64,
    mean_ln_complement: f64,
    start: BetaDistribution,
}

impl BetaLogMoments {
    pub fn new(observations: ArrayView1<f64>, weights: ArrayView1<f64>) -> Result<Self, Error> {
        let mut total = 0.;
        let mut sum_ln = 0.;
        let mut sum_ln_complement = 0.;
        for (&x, &w) in observations.iter().zip(weights.iter()) {
            if w == 0. {
                continue;
            }
            if !(x > 0. && x < 1.) {
                return Err(Error::invalid_parameter(
                    "observations",
                    format!("{} lies outside (0, 1)", x),
                ));
            }
            total += w;
            sum_ln += w * x.ln();
            sum_ln_complement += w * (-x).ln_1p();
        }

        let start = BetaDistribution::estimate_moments(observations, weights)?;
        Ok(BetaLogMoments {
            mean_ln: sum_ln / total,
            mean_ln_complement: sum_ln_complement / total,
            start,
        })
    }
}

impl LogLikelihood<BetaDistribution, f64> for BetaLogMoments {
    fn log_likelihood(&self, distribution: &BetaDistribution) -> f64 {
        let (a, b) = (distribution.alpha, distribution.beta);
        (a - 1.) * self.mean_ln + (b - 1.) * self.mean_ln_complement - ln_beta(a, b)
    }
}

impl LogLikelihoodGradient<BetaDistribution, f64> for BetaLogMoments {
    fn log_likelihood_gradient(&self, distribution: &BetaDistribution) -> Vec<f64> {
        let (a, b) = (distribution.alpha, distribution.beta);
        let total = digamma(a + b);
        vec![
            self.mean_ln - digamma(a) + total,
            self.mean_ln_complement - digamma(b) + total,
        ]
    }
}

impl InitialSolvePoint<BetaDistribution> for BetaLogMoments {
    fn initial_solve_point(&self) -> Result<BetaDistribution, Error> {
        Ok(self.start)
    }
}
