//! Explicit random-variate source.
//!
//! Generation never touches global state: every draw goes through a
//! [`VariateSource`] owned by the caller, which wraps a [`rand::Rng`] and
//! holds the spare value left over by the polar Box–Muller method. Seed it
//! with [`VariateSource::seeded`] for reproducible draws. A source is not
//! meant to be shared between threads; give each thread its own.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Open01};

#[derive(Debug, Clone)]
pub struct VariateSource<R> {
    rng: R,
    spare_normal: Option<f64>,
}

impl VariateSource<StdRng> {
    /// A reproducible source: the same seed always yields the same draws.
    pub fn seeded(seed: u64) -> Self {
        VariateSource::new(StdRng::seed_from_u64(seed))
    }

    /// A source seeded from the operating system.
    pub fn from_entropy() -> Self {
        VariateSource::new(StdRng::from_entropy())
    }
}

impl<R: Rng> VariateSource<R> {
    pub fn new(rng: R) -> Self {
        VariateSource {
            rng,
            spare_normal: None,
        }
    }

    /// Uniform draw on `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform draw on `(0, 1)`.
    pub fn open_uniform(&mut self) -> f64 {
        let u: f64 = Open01.sample(&mut self.rng);
        u
    }

    /// Standard normal draw. Each accepted pair yields two values; the second is
    /// kept in the source and returned by the next call.
    pub fn standard_normal(&mut self) -> f64 {
        if let Some(spare) = self.spare_normal.take() {
            return spare;
        }

        loop {
            let u = 2. * self.uniform() - 1.;
            let v = 2. * self.uniform() - 1.;
            let s = u * u + v * v;
            if s > 0. && s < 1. {
                let factor = (-2. * s.ln() / s).sqrt();
                self.spare_normal = Some(v * factor);
                return u * factor;
            }
        }
    }

    /// Gamma(shape, 1) draw by Marsaglia and Tsang's squeeze method.
    ///
    /// `shape` must be positive; shapes below one are boosted with `U^(1/shape)`.
    pub fn standard_gamma(&mut self, shape: f64) -> f64 {
        debug_assert!(shape > 0.);

        if shape < 1. {
            let boost = self.open_uniform().powf(1. / shape);
            return self.standard_gamma(shape + 1.) * boost;
        }

        let d = shape - 1. / 3.;
        let c = 1. / (9. * d).sqrt();
        loop {
            let (x, v) = loop {
                let x = self.standard_normal();
                let v = 1. + c * x;
                if v > 0. {
                    break (x, v * v * v);
                }
            };

            let u = self.open_uniform();
            let x2 = x * x;
            if u < 1. - 0.0331 * x2 * x2 {
                return d * v;
            }
            if u.ln() < 0.5 * x2 + d * (1. - v + v.ln()) {
                return d * v;
            }
        }
    }
}
