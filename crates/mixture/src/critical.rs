//! Local maxima and minima of a mixture density found by gradient walks.
use crate::errors::{MixtureError, Result};
use crate::types::{Domain, Mixture};
use log::trace;

/// Initial gradient walk step factor
pub const GRADIENT_STEP: f64 = 1e-4;
/// A walk stops when its step gets shorter than this
pub const MIN_STEP: f64 = 1e-8;
/// Max number of steps of a gradient walk
pub const MAX_ITERATIONS: usize = 1_000_000;
/// Maxima closer than this are merged
pub const MERGE_DISTANCE: f64 = 1e-3;
/// Fraction of the gap between two maxima used to leave a maximum before descending
const INWARD_OFFSET: f64 = 0.01;

/// Direction of a gradient walk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slope {
    Up,
    Down,
}

/// Gradient walk on the mixture density from `start`, kept inside `[lower, upper]`.
///
/// The step factor starts at [`GRADIENT_STEP`], doubles after each accepted step and
/// halves after each rejected one, a step being accepted when it moves the density
/// in the walk direction. The walk stops when the proposed step gets shorter than [`MIN_STEP`].
fn walk(
    mixture: &Mixture,
    domain: &Domain,
    start: f64,
    slope: Slope,
    (lower, upper): (f64, f64),
    max_iterations: usize,
) -> Result<f64> {
    let sign = match slope {
        Slope::Up => 1.,
        Slope::Down => -1.,
    };
    let mut x = start;
    let mut fx = mixture.density(x, domain);
    let mut rate = GRADIENT_STEP;
    for i in 0..max_iterations {
        let step = sign * rate * mixture.density_dx(x, domain);
        if !(step.abs() >= MIN_STEP) {
            trace!("{slope:?} walk from {start} stopped at {x} after {i} steps");
            return Ok(x);
        }
        let candidate = (x + step).clamp(lower, upper);
        let fc = mixture.density(candidate, domain);
        if sign * (fc - fx) > 0. {
            x = candidate;
            fx = fc;
            rate *= 2.;
        } else {
            rate *= 0.5;
        }
    }
    Err(MixtureError::IterationLimitExceeded(format!(
        "{slope:?} walk from {start} did not settle within {max_iterations} steps"
    )))
}

fn climb(mixture: &Mixture, domain: &Domain, start: f64, max_iterations: usize) -> Result<f64> {
    walk(
        mixture,
        domain,
        start,
        Slope::Up,
        (f64::NEG_INFINITY, f64::INFINITY),
        max_iterations,
    )
}

fn descend(
    mixture: &Mixture,
    domain: &Domain,
    start: f64,
    bracket: (f64, f64),
    max_iterations: usize,
) -> Result<f64> {
    walk(mixture, domain, start, Slope::Down, bracket, max_iterations)
}

/// Local maxima of the mixture density.
///
/// A gradient ascent is started from each component mean, endpoints closer than
/// [`MERGE_DISTANCE`] to an already found maximum are discarded.
/// Maxima are wrapped into the canonical range and given in component order.
///
/// # Errors
///
/// * [MixtureError::InvalidParameter] if the mixture has no component
/// * [MixtureError::IterationLimitExceeded] if an ascent does not settle
pub fn find_maxima(mixture: &Mixture, domain: &Domain) -> Result<Vec<f64>> {
    if mixture.is_empty() {
        return Err(MixtureError::InvalidParameter(
            "cannot search the maxima of a mixture without component".to_string(),
        ));
    }
    let mut maxima: Vec<f64> = Vec::with_capacity(mixture.len());
    for c in mixture.components() {
        let top = domain.wrap(climb(mixture, domain, c.mean, MAX_ITERATIONS)?);
        if maxima
            .iter()
            .all(|&m| domain.distance(m, top) >= MERGE_DISTANCE)
        {
            maxima.push(top);
        }
    }
    Ok(maxima)
}

/// Local minima of the mixture density, sorted.
///
/// One minimum is looked for between each pair of consecutive maxima, the pair made
/// of the last and first maxima included on a periodic domain. Two gradient descents
/// leave the pair maxima towards each other and the minimum is the midpoint of their endpoints.
///
/// # Errors
///
/// * [MixtureError::InvalidParameter] if the mixture has fewer than two components
/// * [MixtureError::IterationLimitExceeded] if a gradient walk does not settle
pub fn find_minima(mixture: &Mixture, domain: &Domain) -> Result<Vec<f64>> {
    if mixture.len() < 2 {
        return Err(MixtureError::InvalidParameter(format!(
            "minima search needs at least 2 components, got {}",
            mixture.len()
        )));
    }
    let mut maxima = find_maxima(mixture, domain)?;
    if maxima.len() < 2 {
        return Ok(vec![]);
    }
    maxima.sort_by(|a, b| a.total_cmp(b));

    let mut pairs: Vec<(f64, f64)> = maxima.windows(2).map(|w| (w[0], w[1])).collect();
    if domain.is_periodic() {
        pairs.push((maxima[maxima.len() - 1], maxima[0] + domain.period()));
    }
    let mut minima = pairs
        .into_iter()
        .map(|(left, right)| {
            let offset = INWARD_OFFSET * (right - left);
            let bracket = (left, right);
            let from_left = descend(mixture, domain, left + offset, bracket, MAX_ITERATIONS)?;
            let from_right = descend(mixture, domain, right - offset, bracket, MAX_ITERATIONS)?;
            Ok(domain.midpoint(from_left, from_right))
        })
        .collect::<Result<Vec<f64>>>()?;
    minima.sort_by(|a, b| a.total_cmp(b));
    Ok(minima)
}
