//! Density families handled by the [`Em`](crate::Em) engine.
//!
//! A family provides the density used to weight responsibilities during the E-step
//! and the family specific M-step.
use crate::density::gaussian;
use crate::errors::{MixtureError, Result};
use crate::periodic::{periodic_difference, wrap};
use crate::types::{Component, Domain, Mixture};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix1, Zip};
use ndarray_stats::QuantileExt;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Spread floor, a component never gets narrower than this
pub const MIN_SPREAD: f64 = 1e-8;
/// Responsibility mass under which a component is left untouched by the M-step
pub const MIN_MASS: f64 = 1e-10;
/// Max number of fixed point iterations of the periodic M-step
pub const PERIODIC_MSTEP_MAX_ITERS: usize = 100;
/// Convergence tolerance of the periodic M-step fixed point
pub const PERIODIC_MSTEP_TOLERANCE: f64 = 1e-7;

/// Capabilities of a mixture density family
pub trait DensityFamily: Clone + std::fmt::Debug + Send + Sync {
    /// The domain on which the family lives
    fn domain(&self) -> Domain;

    /// Unweighted density of component `c` at `x` used to compute responsibilities
    fn density(&self, c: &Component, x: f64) -> f64 {
        self.domain().component_density(c, x)
    }

    /// Length of the domain the sample lives in, used to scale spreads
    fn domain_length(&self, data: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> f64;

    /// Updates the mixture parameters given the (n, k) responsibility matrix
    fn m_step(&self, data: &Array1<f64>, resp: &Array2<f64>, mixture: &mut Mixture);
}

/// Canonical gaussian mixture on the real line
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Gaussian;

impl DensityFamily for Gaussian {
    fn domain(&self) -> Domain {
        Domain::Aperiodic
    }

    fn density(&self, c: &Component, x: f64) -> f64 {
        gaussian(c.mean, c.spread, x)
    }

    fn domain_length(&self, data: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> f64 {
        match (data.min(), data.max()) {
            (Ok(lower), Ok(upper)) => (upper - lower).max(MIN_SPREAD),
            _ => MIN_SPREAD,
        }
    }

    fn m_step(&self, data: &Array1<f64>, resp: &Array2<f64>, mixture: &mut Mixture) {
        let n = data.len() as f64;
        for (c, r) in mixture.components_mut().iter_mut().zip(resp.columns()) {
            let mass = r.sum();
            if mass < MIN_MASS {
                c.weight = (mass / n).max(f64::MIN_POSITIVE);
                continue;
            }
            let mean = r.dot(data) / mass;
            let var = Zip::from(&r)
                .and(data)
                .fold(0., |acc, &rk, &x| acc + rk * (x - mean) * (x - mean))
                / mass;
            c.weight = mass / n;
            c.mean = mean;
            c.spread = var.sqrt().max(MIN_SPREAD);
        }
    }
}

/// Gaussian mixture wrapped on a ring of length `period`.
///
/// Densities are approximated with `images` translated copies on each side
/// of a component.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct PeriodicGaussian {
    period: f64,
    images: usize,
}

impl PeriodicGaussian {
    /// Constructor
    ///
    /// # Errors
    ///
    /// [MixtureError::InvalidParameter] if `period` is not strictly positive and finite
    pub fn new(period: f64, images: usize) -> Result<Self> {
        if !(period > 0.) || !period.is_finite() {
            return Err(MixtureError::InvalidParameter(format!(
                "periodic gaussian period should be strictly positive, got {period}"
            )));
        }
        Ok(PeriodicGaussian { period, images })
    }

    /// Domain length
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Number of images on each side
    pub fn images(&self) -> usize {
        self.images
    }

    /// Image moments `(sum_r r N_r / sum_r N_r, sum_r r^2 N_r / sum_r N_r)` at `x`
    /// where `N_r` is the normal density of the image translated by `r * period`.
    fn image_moments(&self, u: f64, s: f64, x: f64) -> (f64, f64) {
        let r_max = self.images as i64;
        let (mut g, mut rg, mut rrg) = (0., 0., 0.);
        for r in -r_max..=r_max {
            let rf = r as f64;
            let v = gaussian(u + rf * self.period, s, x);
            g += v;
            rg += rf * v;
            rrg += rf * rf * v;
        }
        if g > 0. {
            (rg / g, rrg / g)
        } else {
            // every image underflows, the nearest one dominates
            let r = ((x - u) / self.period)
                .round()
                .clamp(-(r_max as f64), r_max as f64);
            (r, r * r)
        }
    }

    /// Partial derivative wrt the mean `u` of the log-likelihood of component `k`
    /// weighted by its responsibilities `resp_k`, up to a `1/s^2` factor.
    pub fn dl_du(
        &self,
        data: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        resp_k: &ArrayView1<f64>,
        u: f64,
        s: f64,
    ) -> f64 {
        Zip::from(data).and(resp_k).fold(0., |acc, &x, &r| {
            let (rho1, _) = self.image_moments(u, s, x);
            acc + r * (x - u - self.period * rho1)
        })
    }

    /// Partial derivative wrt the spread `s` of the log-likelihood of component `k`
    /// weighted by its responsibilities `resp_k`, up to a `1/s^3` factor.
    pub fn dl_ds(
        &self,
        data: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        resp_k: &ArrayView1<f64>,
        u: f64,
        s: f64,
    ) -> f64 {
        let p = self.period;
        Zip::from(data).and(resp_k).fold(0., |acc, &x, &r| {
            let (rho1, rho2) = self.image_moments(u, s, x);
            let dx = x - u;
            acc + r * (-s * s + dx * dx - 2. * dx * p * rho1 + p * p * rho2)
        })
    }
}

impl DensityFamily for PeriodicGaussian {
    fn domain(&self) -> Domain {
        Domain::Periodic {
            period: self.period,
            images: self.images,
        }
    }

    fn domain_length(&self, _data: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> f64 {
        self.period
    }

    /// The mean and spread solving `dl_du = 0` and `dl_ds = 0` are found with
    /// the fixed point iteration `u += dl_du / mass`, `s^2 += dl_ds / mass`.
    fn m_step(&self, data: &Array1<f64>, resp: &Array2<f64>, mixture: &mut Mixture) {
        let n = data.len() as f64;
        for (c, r) in mixture.components_mut().iter_mut().zip(resp.columns()) {
            let mass = r.sum();
            if mass < MIN_MASS {
                c.weight = (mass / n).max(f64::MIN_POSITIVE);
                continue;
            }
            let (mut u, mut s) = (c.mean, c.spread);
            for _ in 0..PERIODIC_MSTEP_MAX_ITERS {
                let u_next = u + self.dl_du(data, &r, u, s) / mass;
                let s2_next = s * s + self.dl_ds(data, &r, u_next, s) / mass;
                let s_next = s2_next.max(MIN_SPREAD * MIN_SPREAD).sqrt();
                let done = periodic_difference(u_next, u, self.period).abs()
                    < PERIODIC_MSTEP_TOLERANCE
                    && (s_next - s).abs() < PERIODIC_MSTEP_TOLERANCE;
                u = wrap(u_next, self.period);
                s = s_next;
                if done {
                    break;
                }
            }
            c.weight = mass / n;
            c.mean = u;
            c.spread = s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use std::f64::consts::PI;

    #[test]
    fn test_gaussian_m_step() {
        let data = array![1., 2., 3., 10., 11., 12.];
        let resp = array![[1., 0.], [1., 0.], [1., 0.], [0., 1.], [0., 1.], [0., 1.]];
        let mut mixture = Mixture::new_unchecked(vec![
            Component::new(0.5, 0., 1.),
            Component::new(0.5, 5., 1.),
        ]);
        Gaussian.m_step(&data, &resp, &mut mixture);
        let c = mixture.components();
        assert_abs_diff_eq!(c[0].weight, 0.5);
        assert_abs_diff_eq!(c[0].mean, 2.);
        assert_abs_diff_eq!(c[0].spread, (2f64 / 3.).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(c[1].mean, 11.);
    }

    #[test]
    fn test_gaussian_m_step_empty_component() {
        let data = array![1., 2., 3.];
        let resp = array![[1., 0.], [1., 0.], [1., 0.]];
        let mut mixture = Mixture::new_unchecked(vec![
            Component::new(0.5, 0., 1.),
            Component::new(0.5, 5., 1.),
        ]);
        Gaussian.m_step(&data, &resp, &mut mixture);
        let c = mixture.components();
        assert!(c[1].weight > 0. && c[1].weight < 1e-300);
        assert_abs_diff_eq!(c[1].mean, 5.);
        assert_abs_diff_eq!(c[1].spread, 1.);
        assert!(mixture.total_weight() <= 1. + 1e-12);
    }

    #[test]
    fn test_domain_length() {
        let data = array![-1., 4., 2.];
        assert_abs_diff_eq!(Gaussian.domain_length(&data), 5.);
        let family = PeriodicGaussian::new(2. * PI, 10).unwrap();
        assert_abs_diff_eq!(family.domain_length(&data), 2. * PI);
    }

    #[test]
    fn test_invalid_period() {
        for period in [0., -1., f64::NAN, f64::INFINITY] {
            assert!(matches!(
                PeriodicGaussian::new(period, 10),
                Err(MixtureError::InvalidParameter(_))
            ));
        }
        let family = PeriodicGaussian::new(360., 3).unwrap();
        assert_eq!(family.period(), 360.);
        assert_eq!(family.images(), 3);
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        // the derivatives are the gradient of sum_n r_n ln(periodic gaussian) scaled by s^2 and s^3
        let family = PeriodicGaussian::new(2. * PI, 10).unwrap();
        let domain = family.domain();
        let data = array![3.0, -3.1, 2.5, -2.8, 0.1];
        let resp = array![1.0, 0.8, 0.5, 0.9, 0.1];
        let loglik = |u: f64, s: f64| -> f64 {
            Zip::from(&data).and(&resp).fold(0., |acc, &x, &r| {
                acc + r * domain.component_density(&Component::new(1., u, s), x).ln()
            })
        };
        let (u, s) = (3.1, 0.6);
        let h = 1e-6;
        let du = (loglik(u + h, s) - loglik(u - h, s)) / (2. * h);
        let ds = (loglik(u, s + h) - loglik(u, s - h)) / (2. * h);
        let dl_du = family.dl_du(&data, &resp.view(), u, s);
        let dl_ds = family.dl_ds(&data, &resp.view(), u, s);
        assert_abs_diff_eq!(dl_du / (s * s), du, epsilon = 1e-5);
        assert_abs_diff_eq!(dl_ds / (s * s * s), ds, epsilon = 1e-5);
    }

    #[test]
    fn test_periodic_m_step_across_boundary() {
        // points symmetric around pi, a plain mean would be 0
        let data = Array::from_vec(vec![PI - 0.2, PI - 0.1, -PI + 0.1, -PI + 0.2]);
        let resp = Array2::ones((4, 1));
        let family = PeriodicGaussian::new(2. * PI, 10).unwrap();
        let mut mixture = Mixture::new_unchecked(vec![Component::new(1., 3.0, 0.5)]);
        family.m_step(&data, &resp, &mut mixture);
        let c = mixture.components()[0];
        assert_abs_diff_eq!(periodic_difference(c.mean, PI, 2. * PI), 0., epsilon = 1e-6);
        assert_abs_diff_eq!(c.spread, 0.025f64.sqrt(), epsilon = 1e-4);
        assert_abs_diff_eq!(c.weight, 1.);
    }
}
