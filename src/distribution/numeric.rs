//! Generic numeric fallbacks shared by distributions without closed forms.

use super::UnivariateDistribution;

const MAX_BRACKET_EXPANSIONS: usize = 1100;
const MAX_BISECTIONS: usize = 2200;

/// Smallest `x` with `distribution_function(x) >= p`, found by bisection.
///
/// Infinite support bounds are replaced by a bracket grown geometrically
/// until it encloses `p`. Returns the support bounds for `p <= 0` and `p >= 1`.
pub fn inverse_by_bisection<D: UnivariateDistribution + ?Sized>(distribution: &D, p: f64) -> f64 {
    let support = distribution.support();
    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0. {
        return support.min;
    }
    if p >= 1. {
        return support.max;
    }

    let cdf = |x: f64| distribution.distribution_function(x);

    let (mut lower, mut upper) = match (support.min.is_finite(), support.max.is_finite()) {
        (true, true) => (support.min, support.max),
        (true, false) => (support.min, support.min + 1.),
        (false, true) => (support.max - 1., support.max),
        (false, false) => (-1., 1.),
    };

    let mut width = upper - lower;
    for _ in 0..MAX_BRACKET_EXPANSIONS {
        if support.max.is_finite() || cdf(upper) >= p {
            break;
        }
        lower = upper;
        width *= 2.;
        upper += width;
    }
    for _ in 0..MAX_BRACKET_EXPANSIONS {
        if support.min.is_finite() || cdf(lower) < p {
            break;
        }
        upper = lower;
        width *= 2.;
        lower -= width;
    }
    if !upper.is_finite() {
        return support.max;
    }
    if !lower.is_finite() {
        return support.min;
    }

    for _ in 0..MAX_BISECTIONS {
        let middle = lower + (upper - lower) / 2.;
        if middle <= lower || middle >= upper {
            break;
        }
        if cdf(middle) >= p {
            upper = middle;
        } else {
            lower = middle;
        }
    }

    upper
}

/// Composite Simpson rule over `[a, b]` with `intervals` panels (rounded up to even).
pub fn integrate<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, intervals: usize) -> f64 {
    let n = (intervals.max(2) + 1) & !1;
    let h = (b - a) / n as f64;

    let interior: f64 = (1..n)
        .map(|i| {
            let weight = if i % 2 == 1 { 4. } else { 2. };
            weight * f(a + i as f64 * h)
        })
        .sum();

    (f(a) + interior + f(b)) * h / 3.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::normal::NormalDistribution;
    use approx::assert_abs_diff_eq;

    #[test]
    fn simpson_is_exact_for_cubics() {
        let actual = integrate(|x| x * x * x - 2. * x + 1., 0., 2., 4);
        assert_abs_diff_eq!(actual, 2., epsilon = 1e-12);
    }

    #[test]
    fn odd_panel_counts_round_up() {
        let actual = integrate(|x| x * x, 0., 3., 3);
        assert_abs_diff_eq!(actual, 9., epsilon = 1e-12);
    }

    #[test]
    fn bisection_expands_unbounded_brackets() {
        let normal = NormalDistribution::new(1e4, 3.).unwrap();
        let actual = inverse_by_bisection(&normal, 0.975);
        assert_abs_diff_eq!(actual, 1e4 + 3. * 1.959963984540054, epsilon = 1e-6);

        let actual = inverse_by_bisection(&normal, 0.5);
        assert_abs_diff_eq!(actual, 1e4, epsilon = 1e-6);
    }

    #[test]
    fn bisection_maps_extreme_probabilities_to_support() {
        let normal = NormalDistribution::STANDARD;
        assert_eq!(inverse_by_bisection(&normal, 0.), f64::NEG_INFINITY);
        assert_eq!(inverse_by_bisection(&normal, 1.), f64::INFINITY);
        assert!(inverse_by_bisection(&normal, f64::NAN).is_nan());
    }
}
