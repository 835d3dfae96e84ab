#[cfg(doctest)]
use doc_comment::doctest;

#[cfg(test)]
#[macro_use]
mod tests {
    #[macro_export]
    macro_rules! assert_diff_within_tolerance {
        ($actual: expr, $expected: expr, $tolerance: expr) => {
            for diff in ($actual - $expected).iter() {
                assert!(diff.abs() < $tolerance);
            }
        };
    }
}

pub mod distribution;
pub mod error;
pub mod random;
pub mod sample;
mod utils;

pub use distribution::beta::{BetaDistribution, BetaEstimationMethod, BetaOptions};
pub use distribution::empirical_hazard::{
    EmpiricalHazardDistribution, EmpiricalHazardOptions, SurvivalEstimator,
};
pub use distribution::generalized_beta::{GeneralizedBetaDistribution, GeneralizedBetaOptions};
pub use distribution::normal::NormalDistribution;
pub use distribution::{Fit, Sample, Support, UnivariateDistribution};
pub use error::Error;
pub use random::VariateSource;
pub use sample::fitter::{BaseFitter, Fitter, FitterParameters};
pub use sample::survival::{HazardEstimator, HazardTiesMethod, SurvivalOutcome, SurvivalSample};
pub use sample::Weighted;

#[cfg(doctest)]
doctest!("../README.md");
