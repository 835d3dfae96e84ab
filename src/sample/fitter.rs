//! Maximum likelihood fitting of distributions with strictly positive parameters.
//!
//! The optimizer works on the logarithm of every parameter, so each
//! iterate maps back to a valid parameter vector and the positivity bounds
//! never have to be enforced by the solver itself.

use super::{LogLikelihood, LogLikelihoodGradient};
use crate::error::Error;
use argmin::prelude::*;
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use log::{debug, warn};
use serde_derive::{Deserialize, Serialize};
use std::fmt::Debug;
use std::marker::PhantomData;

pub trait InitialSolvePoint<T> {
    fn initial_solve_point(&self) -> Result<T, Error>;
}

pub struct BaseFitter<S, D> {
    input_state: S,
    _distribution: PhantomData<D>,
}

impl<S, D> BaseFitter<S, D> {
    pub fn new(input_state: S) -> Self {
        BaseFitter {
            input_state,
            _distribution: PhantomData,
        }
    }
}

fn exp_params(log_params: &[f64]) -> Vec<f64> {
    log_params.iter().map(|p| p.exp()).collect()
}

impl<'f, S, D> ArgminOp for &'f BaseFitter<S, D>
where
    S: LogLikelihood<D, f64> + LogLikelihoodGradient<D, f64>,
    D: for<'a> TryFrom<&'a [f64], Error = Error>,
{
    type Param = Vec<f64>;
    type Output = f64;
    type Hessian = ();
    type Jacobian = ();
    type Float = f64;

    fn apply(&self, log_params: &Self::Param) -> Result<Self::Output, anyhow::Error> {
        let params = exp_params(log_params);
        let distribution = D::try_from(params.as_slice())?;
        Ok(-self.input_state.log_likelihood(&distribution))
    }

    fn gradient(&self, log_params: &Self::Param) -> Result<Self::Param, anyhow::Error> {
        let params = exp_params(log_params);
        let distribution = D::try_from(params.as_slice())?;

        // d/d(ln p) = p * d/dp
        let gradient = self
            .input_state
            .log_likelihood_gradient(&distribution)
            .iter()
            .zip(params.iter())
            .map(|(g, p)| -g * p)
            .collect();
        Ok(gradient)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitterParameters {
    pub max_iterations: u64,
    /// Number of correction pairs kept by L-BFGS.
    pub history: usize,
    /// Largest gradient norm, in log-parameter space, accepted as stationary.
    pub gradient_tolerance: f64,
    /// Attach argmin's terminal logger to the run.
    pub trace: bool,
}

impl Default for FitterParameters {
    fn default() -> Self {
        FitterParameters {
            max_iterations: 100,
            history: 7,
            gradient_tolerance: 1e-4,
            trace: false,
        }
    }
}

impl FitterParameters {
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_gradient_tolerance(mut self, gradient_tolerance: f64) -> Self {
        self.gradient_tolerance = gradient_tolerance;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

pub trait Fitter<S, P> {
    fn fit(&self, parameters: &FitterParameters) -> Result<P, Error>;
}

impl<S, D> Fitter<S, D> for BaseFitter<S, D>
where
    S: LogLikelihood<D, f64> + LogLikelihoodGradient<D, f64> + InitialSolvePoint<D>,
    D: for<'a> TryFrom<&'a [f64], Error = Error> + Into<Vec<f64>> + Debug,
{
    fn fit(&self, parameters: &FitterParameters) -> Result<D, Error> {
        let initial_point: Vec<f64> = self.input_state.initial_solve_point()?.into();
        let initial_log_point: Vec<f64> = initial_point.iter().map(|p| p.ln()).collect();
        debug!("starting L-BFGS from {:?}", initial_point);

        let linesearch = MoreThuenteLineSearch::new();
        let solver = LBFGS::new(linesearch, parameters.history);

        let mut executor =
            Executor::new(self, solver, initial_log_point).max_iters(parameters.max_iterations);
        if parameters.trace {
            executor = executor.add_observer(ArgminSlogLogger::term(), ObserverMode::Always);
        }
        let res = executor.run()?;

        let best_param = res.state.best_param.clone();
        let iterations = res.state.iter;
        let gradient = ArgminOp::gradient(&self, &best_param)?;
        let gradient_norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
        if !gradient_norm.is_finite() || gradient_norm > parameters.gradient_tolerance {
            warn!(
                "optimizer stopped after {} iterations with gradient norm {}",
                iterations, gradient_norm
            );
            return Err(Error::ConvergenceFailure {
                iterations,
                gradient_norm,
            });
        }

        let fitted = D::try_from(exp_params(&best_param).as_slice())?;
        debug!("L-BFGS converged after {} iterations to {:?}", iterations, fitted);
        Ok(fitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Gamma(shape, 1) parameterised by its shape alone.
    #[derive(Debug)]
    struct GammaShape(f64);

    impl<'a> TryFrom<&'a [f64]> for GammaShape {
        type Error = Error;

        fn try_from(array: &'a [f64]) -> Result<Self, Self::Error> {
            if array.len() != 1 {
                return Err(Error::IncompatibleDistributionParameterCount(array.len(), 1));
            }
            Ok(GammaShape(array[0]))
        }
    }

    impl From<GammaShape> for Vec<f64> {
        fn from(distribution: GammaShape) -> Self {
            vec![distribution.0]
        }
    }

    struct Summary {
        mean_ln: f64,
        start: f64,
    }

    impl LogLikelihood<GammaShape, f64> for Summary {
        fn log_likelihood(&self, distribution: &GammaShape) -> f64 {
            let k = distribution.0;
            (k - 1.) * self.mean_ln - statrs::function::gamma::ln_gamma(k)
        }
    }

    impl LogLikelihoodGradient<GammaShape, f64> for Summary {
        fn log_likelihood_gradient(&self, distribution: &GammaShape) -> Vec<f64> {
            vec![self.mean_ln - statrs::function::gamma::digamma(distribution.0)]
        }
    }

    impl InitialSolvePoint<GammaShape> for Summary {
        fn initial_solve_point(&self) -> Result<GammaShape, Error> {
            Ok(GammaShape(self.start))
        }
    }

    #[test]
    fn finds_the_stationary_point() {
        // Stationary where digamma(k) equals the mean log.
        let target = 3.0f64;
        let fitter: BaseFitter<_, GammaShape> = BaseFitter::new(Summary {
            mean_ln: statrs::function::gamma::digamma(target),
            start: 1.0,
        });

        let actual = fitter.fit(&Default::default()).unwrap();
        assert!((actual.0 - target).abs() < 1e-3);
    }

    #[test]
    fn exhausted_budget_is_a_convergence_failure() {
        let fitter: BaseFitter<_, GammaShape> = BaseFitter::new(Summary {
            mean_ln: statrs::function::gamma::digamma(50.),
            start: 0.01,
        });

        let parameters = FitterParameters::default()
            .with_max_iterations(1)
            .with_gradient_tolerance(1e-12);
        match fitter.fit(&parameters) {
            Err(Error::ConvergenceFailure { .. }) => {}
            other => panic!("expected a convergence failure, got {:?}", other),
        }
    }
}
