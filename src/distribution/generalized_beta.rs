use super::beta::{BetaDistribution, BetaEstimationMethod};
use super::{Fit, Sample, Support, UnivariateDistribution};
use crate::error::Error;
use crate::random::VariateSource;
use crate::sample::fitter::FitterParameters;
use crate::utils::resolve_weights;
use log::debug;
use ndarray::ArrayView1;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Default weight of the mode in three-point estimates.
pub const DEFAULT_PERT_SCALE: f64 = 4.;

/// Beta distribution stretched onto `[min, max]`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralizedBetaDistribution {
    standard: BetaDistribution,
    min: f64,
    max: f64,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralizedBetaOptions {
    pub method: BetaEstimationMethod,
    /// Lower bound used while fitting; the current one when unset.
    pub min: Option<f64>,
    /// Upper bound used while fitting; the current one when unset.
    pub max: Option<f64>,
    pub fitter: FitterParameters,
}

impl GeneralizedBetaOptions {
    pub fn with_method(mut self, method: BetaEstimationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

fn check_range(min: f64, max: f64) -> Result<(), Error> {
    if !min.is_finite() || !max.is_finite() || !(min < max) {
        return Err(Error::invalid_parameter(
            "min",
            format!("[{}, {}] is not a finite, non-empty interval", min, max),
        ));
    }
    Ok(())
}

fn check_three_point(min: f64, max: f64, mode: f64, scale: f64) -> Result<(), Error> {
    check_range(min, max)?;
    if !(mode >= min && mode <= max) {
        return Err(Error::invalid_parameter(
            "mode",
            format!("{} lies outside [{}, {}]", mode, min, max),
        ));
    }
    if !(scale > 0.) || !scale.is_finite() {
        return Err(Error::invalid_parameter("scale", "must be positive and finite"));
    }
    Ok(())
}

impl GeneralizedBetaDistribution {
    pub fn new(alpha: f64, beta: f64, min: f64, max: f64) -> Result<Self, Error> {
        check_range(min, max)?;
        Ok(GeneralizedBetaDistribution {
            standard: BetaDistribution::new(alpha, beta)?,
            min,
            max,
        })
    }

    /// Three-point PERT estimate: α = 1 + λ(mode − min)/(max − min), β = 1 + λ(max − mode)/(max − min).
    pub fn pert(min: f64, max: f64, mode: f64) -> Result<Self, Error> {
        GeneralizedBetaDistribution::pert_with_scale(min, max, mode, DEFAULT_PERT_SCALE)
    }

    pub fn pert_with_scale(min: f64, max: f64, mode: f64, scale: f64) -> Result<Self, Error> {
        check_three_point(min, max, mode, scale)?;

        let range = max - min;
        let alpha = 1. + scale * (mode - min) / range;
        let beta = 1. + scale * (max - mode) / range;
        GeneralizedBetaDistribution::new(alpha, beta, min, max)
    }

    /// Vose's three-point estimate, derived from the PERT mean `(min + λ·mode + max)/(λ + 2)`.
    pub fn vose(min: f64, max: f64, mode: f64) -> Result<Self, Error> {
        GeneralizedBetaDistribution::vose_with_scale(min, max, mode, DEFAULT_PERT_SCALE)
    }

    pub fn vose_with_scale(min: f64, max: f64, mode: f64, scale: f64) -> Result<Self, Error> {
        check_three_point(min, max, mode, scale)?;

        // (2·mode − min − max)/(mode − mean) is exactly λ + 2.
        let range = max - min;
        let mean = (min + scale * mode + max) / (scale + 2.);
        let alpha = (mean - min) * (scale + 2.) / range;
        let beta = (max - mean) * (scale + 2.) / range;
        GeneralizedBetaDistribution::new(alpha, beta, min, max)
    }

    /// Estimates the shape on `[min, max]`, taking the bounds from `options`
    /// or else from `self`.
    pub fn estimate_within(
        &self,
        observations: ArrayView1<f64>,
        weights: Option<ArrayView1<f64>>,
        options: &GeneralizedBetaOptions,
    ) -> Result<Self, Error> {
        let min = options.min.unwrap_or(self.min);
        let max = options.max.unwrap_or(self.max);
        GeneralizedBetaDistribution::estimate(observations, weights, min, max, options)
    }

    pub fn estimate(
        observations: ArrayView1<f64>,
        weights: Option<ArrayView1<f64>>,
        min: f64,
        max: f64,
        options: &GeneralizedBetaOptions,
    ) -> Result<Self, Error> {
        check_range(min, max)?;
        let weights = resolve_weights(observations.len(), weights)?;
        if let Some(x) = observations.iter().find(|x| !(**x >= min && **x <= max)) {
            return Err(Error::invalid_parameter(
                "observations",
                format!("{} lies outside [{}, {}]", x, min, max),
            ));
        }

        let range = max - min;
        let scaled = observations.mapv(|x| (x - min) / range);
        let standard = match options.method {
            BetaEstimationMethod::Moments => {
                BetaDistribution::estimate_moments(scaled.view(), weights.view())?
            }
            BetaEstimationMethod::MaximumLikelihood => BetaDistribution::estimate_maximum_likelihood(
                scaled.view(),
                weights.view(),
                &options.fitter,
            )?,
        };

        let fitted = GeneralizedBetaDistribution { standard, min, max };
        debug!("estimated {} by {}", fitted, options.method);
        Ok(fitted)
    }

    pub fn alpha(&self) -> f64 {
        self.standard.alpha()
    }

    pub fn beta(&self) -> f64 {
        self.standard.beta()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn standard(&self) -> &BetaDistribution {
        &self.standard
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    fn to_standard(&self, x: f64) -> f64 {
        (x - self.min) / self.range()
    }
}

impl UnivariateDistribution for GeneralizedBetaDistribution {
    fn support(&self) -> Support {
        Support::closed(self.min, self.max)
    }

    fn mean(&self) -> Result<f64, Error> {
        Ok(self.min + self.range() * self.standard.mean()?)
    }

    fn variance(&self) -> Result<f64, Error> {
        Ok(self.range() * self.range() * self.standard.variance()?)
    }

    fn mode(&self) -> Result<f64, Error> {
        Ok(self.min + self.range() * self.standard.mode()?)
    }

    fn median(&self) -> f64 {
        self.min + self.range() * self.standard.median()
    }

    fn entropy(&self) -> Result<f64, Error> {
        Ok(self.standard.entropy()? + self.range().ln())
    }

    fn distribution_function(&self, x: f64) -> f64 {
        self.standard.distribution_function(self.to_standard(x))
    }

    fn complementary_distribution_function(&self, x: f64) -> f64 {
        self.standard
            .complementary_distribution_function(self.to_standard(x))
    }

    fn probability_density_function(&self, x: f64) -> f64 {
        self.standard.probability_density_function(self.to_standard(x)) / self.range()
    }

    fn log_probability_density_function(&self, x: f64) -> f64 {
        self.standard
            .log_probability_density_function(self.to_standard(x))
            - self.range().ln()
    }

    fn inverse_distribution_function(&self, p: f64) -> f64 {
        self.min + self.range() * self.standard.inverse_distribution_function(p)
    }
}

impl Fit for GeneralizedBetaDistribution {
    type Options = GeneralizedBetaOptions;

    fn fit(
        &mut self,
        observations: ArrayView1<f64>,
        weights: Option<ArrayView1<f64>>,
        options: &GeneralizedBetaOptions,
    ) -> Result<(), Error> {
        *self = self.estimate_within(observations, weights, options)?;
        Ok(())
    }
}

impl Sample for GeneralizedBetaDistribution {
    fn generate<R: Rng>(&self, source: &mut VariateSource<R>) -> f64 {
        self.min + self.range() * self.standard.generate(source)
    }
}

impl fmt::Display for GeneralizedBetaDistribution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "B(x; α = {}, β = {}, min = {}, max = {})",
            self.alpha(),
            self.beta(),
            self.min,
            self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::prelude::*;

    const TOLERANCE: f64 = 1e-10;

    #[test]
    fn vose_mode_and_support() {
        let distribution = GeneralizedBetaDistribution::vose(1., 10., 5.).unwrap();

        assert_abs_diff_eq!(distribution.mode().unwrap(), 5., epsilon = 1e-6);
        assert_eq!(distribution.support(), Support::closed(1., 10.));
        assert_abs_diff_eq!(distribution.alpha(), 25. / 9., epsilon = 1e-9);
        assert_abs_diff_eq!(distribution.beta(), 29. / 9., epsilon = 1e-9);
    }

    #[test]
    fn vose_symmetric_limit() {
        let distribution = GeneralizedBetaDistribution::vose(0., 2., 1.).unwrap();
        assert_abs_diff_eq!(distribution.alpha(), 3., epsilon = TOLERANCE);
        assert_abs_diff_eq!(distribution.beta(), 3., epsilon = TOLERANCE);
        assert_abs_diff_eq!(distribution.mode().unwrap(), 1., epsilon = TOLERANCE);
    }

    #[test]
    fn vose_near_symmetric_mode() {
        let distribution = GeneralizedBetaDistribution::vose(0., 1., 0.5 + 1e-13).unwrap();
        assert_abs_diff_eq!(distribution.alpha(), 3., epsilon = 1e-9);
        assert_abs_diff_eq!(distribution.beta(), 3., epsilon = 1e-9);
        assert!(distribution.alpha() > distribution.beta());
    }

    #[test]
    fn vose_agrees_with_pert() {
        for &(min, max, mode) in &[(1., 10., 5.), (0., 1., 0.), (-3., 2., 1.75), (2., 12., 12.)] {
            let vose = GeneralizedBetaDistribution::vose(min, max, mode).unwrap();
            let pert = GeneralizedBetaDistribution::pert(min, max, mode).unwrap();
            assert_abs_diff_eq!(vose.alpha(), pert.alpha(), epsilon = 1e-12);
            assert_abs_diff_eq!(vose.beta(), pert.beta(), epsilon = 1e-12);
        }
    }

    #[test]
    fn pert_mode_and_mean() {
        let distribution = GeneralizedBetaDistribution::pert(2., 12., 4.).unwrap();

        assert_abs_diff_eq!(distribution.mode().unwrap(), 4., epsilon = 1e-9);
        assert_abs_diff_eq!(
            distribution.mean().unwrap(),
            (2. + 4. * 4. + 12.) / 6.,
            epsilon = 1e-9
        );
    }

    #[test]
    fn pert_with_mode_at_the_edge() {
        let distribution = GeneralizedBetaDistribution::pert(0., 1., 0.).unwrap();
        assert_abs_diff_eq!(distribution.alpha(), 1., epsilon = TOLERANCE);
        assert_abs_diff_eq!(distribution.beta(), 5., epsilon = TOLERANCE);
    }

    #[test]
    fn three_point_validation() {
        assert!(GeneralizedBetaDistribution::pert(1., 1., 1.).is_err());
        assert!(GeneralizedBetaDistribution::pert(10., 1., 5.).is_err());
        assert!(GeneralizedBetaDistribution::vose(1., 10., 11.).is_err());
        assert!(GeneralizedBetaDistribution::vose_with_scale(1., 10., 5., 0.).is_err());
        assert!(GeneralizedBetaDistribution::new(2., 3., 0., f64::INFINITY).is_err());
        assert!(GeneralizedBetaDistribution::new(0., 3., 0., 1.).is_err());
    }

    #[test]
    fn rescaled_functions() {
        let distribution = GeneralizedBetaDistribution::new(2., 3., 1., 10.).unwrap();
        let standard = BetaDistribution::new(2., 3.).unwrap();

        assert_abs_diff_eq!(
            distribution.distribution_function(5.5),
            standard.distribution_function(0.5),
            epsilon = TOLERANCE
        );
        assert_abs_diff_eq!(
            distribution.probability_density_function(5.5),
            standard.probability_density_function(0.5) / 9.,
            epsilon = TOLERANCE
        );
        assert_abs_diff_eq!(distribution.mean().unwrap(), 1. + 9. * 0.4, epsilon = TOLERANCE);
        assert_abs_diff_eq!(distribution.variance().unwrap(), 81. * 0.04, epsilon = TOLERANCE);
        assert_abs_diff_eq!(
            distribution.entropy().unwrap(),
            standard.entropy().unwrap() + 9f64.ln(),
            epsilon = TOLERANCE
        );
        assert_abs_diff_eq!(
            distribution.inverse_distribution_function(0.3),
            1. + 9. * standard.inverse_distribution_function(0.3),
            epsilon = TOLERANCE
        );
        assert_eq!(distribution.distribution_function(0.), 0.);
        assert_eq!(distribution.distribution_function(11.), 1.);
        assert_eq!(distribution.probability_density_function(11.), 0.);
    }

    #[test]
    fn fit_keeps_bounds_and_recovers_shape() {
        let truth = GeneralizedBetaDistribution::new(2., 5., -3., 7.).unwrap();
        let observations = truth.generate_many(50_000, &mut VariateSource::seeded(31));
        assert!(observations.iter().all(|&x| x >= -3. && x <= 7.));

        let mut fitted = GeneralizedBetaDistribution::pert(-3., 7., 0.).unwrap();
        let options =
            GeneralizedBetaOptions::default().with_method(BetaEstimationMethod::MaximumLikelihood);
        fitted.fit(observations.view(), None, &options).unwrap();

        assert_eq!(fitted.min(), -3.);
        assert_eq!(fitted.max(), 7.);
        assert_abs_diff_eq!(fitted.alpha(), 2., epsilon = 0.1);
        assert_abs_diff_eq!(fitted.beta(), 5., epsilon = 0.25);
    }

    #[test]
    fn fit_with_explicit_bounds() {
        let observations = array![2., 3., 3.5, 4., 6.];
        let mut distribution = GeneralizedBetaDistribution::new(1., 1., 0., 1.).unwrap();
        let options = GeneralizedBetaOptions::default().with_bounds(1., 7.);

        distribution.fit(observations.view(), None, &options).unwrap();

        assert_eq!(distribution.support(), Support::closed(1., 7.));
        assert_abs_diff_eq!(distribution.mean().unwrap(), 3.7, epsilon = 1e-9);
    }

    #[test]
    fn observations_outside_bounds_keep_previous_state() {
        let mut distribution = GeneralizedBetaDistribution::new(2., 2., 0., 1.).unwrap();
        let before = distribution;

        let result = distribution.fit(array![0.5, 2.].view(), None, &Default::default());

        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
        assert_eq!(distribution, before);
    }

    #[test]
    fn display() {
        let distribution = GeneralizedBetaDistribution::new(2., 3., 1., 10.).unwrap();
        assert_eq!(distribution.to_string(), "B(x; α = 2, β = 3, min = 1, max = 10)");
    }
}
