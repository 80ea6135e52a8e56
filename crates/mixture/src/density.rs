//! Density primitives of plain and periodic gaussians.
//!
//! A periodic gaussian of period `P` is approximated by the sum of the
//! `2R + 1` images of the plain gaussian translated by `r * P` for `r` in `[-R, R]`.
use crate::types::{Domain, Mixture};
use ndarray::{Array, Array2};

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Normal density of mean `u` and standard deviation `s` at `x`
pub fn gaussian(u: f64, s: f64, x: f64) -> f64 {
    let z = (x - u) / s;
    INV_SQRT_2PI / s * (-0.5 * z * z).exp()
}

/// Derivative wrt `x` of the normal density of mean `u` and standard deviation `s`
pub fn gaussian_dx(u: f64, s: f64, x: f64) -> f64 {
    -(x - u) / (s * s) * gaussian(u, s, x)
}

/// Periodic normal density at `x` approximated with `images` images on each side
pub fn periodic_gaussian(u: f64, s: f64, x: f64, period: f64, images: usize) -> f64 {
    let r = images as i64;
    (-r..=r)
        .map(|i| gaussian(u + i as f64 * period, s, x))
        .sum()
}

/// Derivative wrt `x` of the periodic normal density approximated with `images` images on each side
pub fn periodic_gaussian_dx(u: f64, s: f64, x: f64, period: f64, images: usize) -> f64 {
    let r = images as i64;
    (-r..=r)
        .map(|i| gaussian_dx(u + i as f64 * period, s, x))
        .sum()
}

/// Tabulates the mixture density and its derivative on `n` evenly spaced points
/// of `[lower, upper]`.
///
/// Returns a (n, 3) matrix where each row is `(x, density(x), d/dx density(x))`,
/// suitable to be dumped and plotted by an external tool.
pub fn density_table(
    mixture: &Mixture,
    domain: &Domain,
    lower: f64,
    upper: f64,
    n: usize,
) -> Array2<f64> {
    let xs = Array::linspace(lower, upper, n);
    let mut table = Array2::zeros((n, 3));
    for (mut row, &x) in table.rows_mut().into_iter().zip(xs.iter()) {
        row[0] = x;
        row[1] = mixture.density(x, domain);
        row[2] = mixture.density_dx(x, domain);
    }
    table
}
