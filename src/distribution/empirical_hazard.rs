//! Non-parametric distribution defined by a table of hazards.
//!
//! The table is either given directly or estimated from a [`SurvivalSample`].
//! Between tabulated times the survival function is a right-continuous step,
//! following either the Kaplan–Meier product limit or the Fleming–Harrington
//! exponential of the cumulative hazard.

use super::{DerivedCache, Fit, Sample, Support, UnivariateDistribution};
use crate::error::Error;
use crate::random::VariateSource;
use crate::sample::survival::{
    stable_ascending_order, HazardEstimator, HazardTiesMethod, SurvivalOutcome, SurvivalSample,
};
use crate::utils::check_dimension;
use log::debug;
use ndarray::prelude::*;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the survival curve is read off the hazard table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurvivalEstimator {
    /// `S(x) = exp(-Σ h_i)` over `t_i <= x`.
    FlemingHarrington,
    /// `S(x) = Π (1 - h_i)` over `t_i <= x`.
    KaplanMeier,
}

impl Default for SurvivalEstimator {
    fn default() -> Self {
        SurvivalEstimator::FlemingHarrington
    }
}

impl fmt::Display for SurvivalEstimator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SurvivalEstimator::FlemingHarrington => f.write_str("fleming-harrington"),
            SurvivalEstimator::KaplanMeier => f.write_str("kaplan-meier"),
        }
    }
}

impl FromStr for SurvivalEstimator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fleming-harrington" | "fh" => Ok(SurvivalEstimator::FlemingHarrington),
            "kaplan-meier" | "km" => Ok(SurvivalEstimator::KaplanMeier),
            _ => Err(Error::UnknownOption {
                option: "survival",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalHazardOptions {
    pub estimator: HazardEstimator,
    pub ties: HazardTiesMethod,
    pub survival: SurvivalEstimator,
    /// One outcome per observation. Every observation is a failure when unset.
    pub outcomes: Option<Vec<SurvivalOutcome>>,
}

impl EmpiricalHazardOptions {
    pub fn with_estimator(mut self, estimator: HazardEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_ties(mut self, ties: HazardTiesMethod) -> Self {
        self.ties = ties;
        self
    }

    pub fn with_survival(mut self, survival: SurvivalEstimator) -> Self {
        self.survival = survival;
        self
    }

    pub fn with_outcomes(mut self, outcomes: Vec<SurvivalOutcome>) -> Self {
        self.outcomes = Some(outcomes);
        self
    }
}

/// Serialized form; derived arrays are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HazardTableParameters {
    times: Array1<f64>,
    hazards: Array1<f64>,
    estimator: SurvivalEstimator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HazardTableParameters", into = "HazardTableParameters")]
pub struct EmpiricalHazardDistribution {
    times: Array1<f64>,
    hazards: Array1<f64>,
    /// `survivals[i] = Π_{j<i} (1 - hazards[j])`
    survivals: Array1<f64>,
    /// `cumulative_hazards[i] = Σ_{j<=i} hazards[j]`
    cumulative_hazards: Array1<f64>,
    estimator: SurvivalEstimator,
    cache: DerivedCache,
}

fn product_limit_step(hazard: f64) -> f64 {
    (1. - hazard).max(0.)
}

impl EmpiricalHazardDistribution {
    /// Builds the distribution from a hazard table. Unsorted times are sorted,
    /// carrying their hazards along; equal times keep their input order.
    pub fn new(
        times: ArrayView1<f64>,
        hazards: ArrayView1<f64>,
        estimator: SurvivalEstimator,
    ) -> Result<Self, Error> {
        check_dimension("hazards", times.len(), hazards.len())?;
        if times.is_empty() {
            return Err(Error::invalid_parameter("times", "at least one time is required"));
        }
        if let Some(t) = times.iter().find(|t| !(**t >= 0.) || !t.is_finite()) {
            return Err(Error::invalid_parameter(
                "times",
                format!("{} is not a finite, non-negative time", t),
            ));
        }
        if let Some(h) = hazards.iter().find(|h| !(**h >= 0.) || !h.is_finite()) {
            return Err(Error::invalid_parameter(
                "hazards",
                format!("{} is not a finite, non-negative hazard", h),
            ));
        }

        let order = stable_ascending_order(times);
        let times: Array1<f64> = order.iter().map(|&i| times[i]).collect();
        let hazards: Array1<f64> = order.iter().map(|&i| hazards[i]).collect();

        let mut survivals = Array1::<f64>::ones(times.len());
        for i in 1..times.len() {
            survivals[i] = survivals[i - 1] * product_limit_step(hazards[i - 1]);
        }
        let mut cumulative_hazards = hazards.clone();
        for i in 1..times.len() {
            cumulative_hazards[i] += cumulative_hazards[i - 1];
        }

        Ok(EmpiricalHazardDistribution {
            times,
            hazards,
            survivals,
            cumulative_hazards,
            estimator,
            cache: DerivedCache::default(),
        })
    }

    /// Estimates the hazard table from possibly censored observations.
    ///
    /// `outcomes` takes precedence over `options.outcomes`.
    pub fn estimate(
        times: ArrayView1<f64>,
        outcomes: Option<&[SurvivalOutcome]>,
        weights: Option<ArrayView1<f64>>,
        options: &EmpiricalHazardOptions,
    ) -> Result<Self, Error> {
        let outcomes = outcomes.or(options.outcomes.as_deref());
        let sample = SurvivalSample::new(times, outcomes, weights)?;
        EmpiricalHazardDistribution::from_sample(&sample, options)
    }

    pub fn from_sample(
        sample: &SurvivalSample,
        options: &EmpiricalHazardOptions,
    ) -> Result<Self, Error> {
        debug!(
            "estimating hazards of {} records by {} with {} ties",
            sample.len(),
            options.estimator,
            options.ties
        );
        let table = sample.hazards(options.estimator, options.ties);
        EmpiricalHazardDistribution::new(table.times.view(), table.hazards.view(), options.survival)
    }

    pub fn times(&self) -> ArrayView1<f64> {
        self.times.view()
    }

    pub fn hazards(&self) -> ArrayView1<f64> {
        self.hazards.view()
    }

    pub fn survivals(&self) -> ArrayView1<f64> {
        self.survivals.view()
    }

    pub fn estimator(&self) -> SurvivalEstimator {
        self.estimator
    }

    /// Index of the first entry for which `below` fails; `below` must hold
    /// on a prefix of the table.
    fn partition_point<P: Fn(usize) -> bool>(&self, below: P) -> usize {
        let (mut low, mut high) = (0, self.times.len());
        while low < high {
            let mid = low + (high - low) / 2;
            if below(mid) {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }

    fn count_before(&self, x: f64) -> usize {
        self.partition_point(|i| self.times[i] < x)
    }

    fn count_at_or_before(&self, x: f64) -> usize {
        self.partition_point(|i| self.times[i] <= x)
    }

    fn survival(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        match self.count_at_or_before(x) {
            0 => 1.,
            k => match self.estimator {
                SurvivalEstimator::KaplanMeier => {
                    self.survivals[k - 1] * product_limit_step(self.hazards[k - 1])
                }
                SurvivalEstimator::FlemingHarrington => (-self.cumulative_hazards[k - 1]).exp(),
            },
        }
    }

    fn distinct_times(&self) -> impl Iterator<Item = f64> + '_ {
        let times = &self.times;
        (0..times.len())
            .filter(move |&i| i == 0 || times[i - 1] != times[i])
            .map(move |i| times[i])
    }

    fn compute_mean(&self) -> f64 {
        self.distinct_times()
            .map(|t| t * self.probability_density_function(t))
            .sum()
    }
}

impl TryFrom<HazardTableParameters> for EmpiricalHazardDistribution {
    type Error = Error;

    fn try_from(parameters: HazardTableParameters) -> Result<Self, Self::Error> {
        EmpiricalHazardDistribution::new(
            parameters.times.view(),
            parameters.hazards.view(),
            parameters.estimator,
        )
    }
}

impl From<EmpiricalHazardDistribution> for HazardTableParameters {
    fn from(distribution: EmpiricalHazardDistribution) -> Self {
        HazardTableParameters {
            times: distribution.times,
            hazards: distribution.hazards,
            estimator: distribution.estimator,
        }
    }
}

impl UnivariateDistribution for EmpiricalHazardDistribution {
    fn support(&self) -> Support {
        Support::half_open(0., f64::INFINITY)
    }

    /// `Σ t·f(t)` over the distinct tabulated times.
    fn mean(&self) -> Result<f64, Error> {
        Ok(self.cache.mean(|| self.compute_mean()))
    }

    fn variance(&self) -> Result<f64, Error> {
        Ok(self.cache.variance(|| {
            let mean = self.cache.mean(|| self.compute_mean());
            let second_moment: f64 = self
                .distinct_times()
                .map(|t| t * t * self.probability_density_function(t))
                .sum();
            second_moment - mean * mean
        }))
    }

    /// The tabulated time of largest density; the earliest one on ties.
    fn mode(&self) -> Result<f64, Error> {
        let mut best = (self.times[0], self.probability_density_function(self.times[0]));
        for t in self.distinct_times().skip(1) {
            let density = self.probability_density_function(t);
            if density > best.1 {
                best = (t, density);
            }
        }
        Ok(best.0)
    }

    fn entropy(&self) -> Result<f64, Error> {
        Err(Error::UnsupportedOperation("entropy"))
    }

    fn distribution_function(&self, x: f64) -> f64 {
        1. - self.survival(x)
    }

    fn complementary_distribution_function(&self, x: f64) -> f64 {
        self.survival(x)
    }

    fn probability_density_function(&self, x: f64) -> f64 {
        self.hazard_function(x) * self.survival(x)
    }

    /// Smallest tabulated time whose distribution function reaches `p`, or
    /// zero, the bottom of the support, for `p <= 0`.
    fn inverse_distribution_function(&self, p: f64) -> f64 {
        if p.is_nan() {
            return f64::NAN;
        }
        if p <= 0. {
            return 0.;
        }
        let first = self.partition_point(|i| self.distribution_function(self.times[i]) < p);
        if first < self.times.len() {
            self.times[first]
        } else {
            f64::INFINITY
        }
    }

    /// Sum of the hazards tabulated exactly at `x`.
    fn hazard_function(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let (low, high) = (self.count_before(x), self.count_at_or_before(x));
        (low..high).map(|i| self.hazards[i]).sum()
    }

    fn cumulative_hazard_function(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        match self.estimator {
            SurvivalEstimator::FlemingHarrington => match self.count_at_or_before(x) {
                0 => 0.,
                k => self.cumulative_hazards[k - 1],
            },
            SurvivalEstimator::KaplanMeier => -self.survival(x).ln(),
        }
    }
}

impl Fit for EmpiricalHazardDistribution {
    type Options = EmpiricalHazardOptions;

    fn fit(
        &mut self,
        observations: ArrayView1<f64>,
        weights: Option<ArrayView1<f64>>,
        options: &EmpiricalHazardOptions,
    ) -> Result<(), Error> {
        *self = EmpiricalHazardDistribution::estimate(observations, None, weights, options)?;
        Ok(())
    }
}

impl Sample for EmpiricalHazardDistribution {
    /// Draws past the mass of the table fall on the last tabulated time.
    fn generate<R: Rng>(&self, source: &mut VariateSource<R>) -> f64 {
        let p = source.open_uniform();
        let x = self.inverse_distribution_function(p);
        if x.is_finite() {
            x
        } else {
            self.times[self.times.len() - 1]
        }
    }
}

impl fmt::Display for EmpiricalHazardDistribution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("H(x; v, t)")
    }
}
