use crate::density::{gaussian, gaussian_dx, periodic_gaussian, periodic_gaussian_dx};
use crate::errors::{MixtureError, Result};
use crate::periodic;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Tolerance on the sum of the mixture weights
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// One weighted normal component of a mixture
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Component {
    /// mixing weight in (0, 1]
    pub weight: f64,
    /// mean of the normal law
    pub mean: f64,
    /// standard deviation of the normal law
    pub spread: f64,
}

impl Component {
    /// Constructor, no check is done, see [`Mixture::new`]
    pub fn new(weight: f64, mean: f64, spread: f64) -> Self {
        Component {
            weight,
            mean,
            spread,
        }
    }
}

/// Domain on which a one dimensional mixture lives
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Domain {
    /// The real line
    #[default]
    Aperiodic,
    /// A ring of length `period`, periodic densities are approximated with
    /// `images` translated copies on each side of a component
    Periodic {
        /// length of the domain
        period: f64,
        /// number of images on each side
        images: usize,
    },
}

impl Domain {
    /// Builds the domain from a period, `0` meaning a non periodic domain
    pub fn new(period: f64, images: usize) -> Result<Domain> {
        if !period.is_finite() || period < 0. {
            return Err(MixtureError::InvalidParameter(format!(
                "period should be positive or zero, got {period}"
            )));
        }
        if period == 0. {
            Ok(Domain::Aperiodic)
        } else {
            Ok(Domain::Periodic { period, images })
        }
    }

    /// The period of the domain, `0` when it is not periodic
    pub fn period(&self) -> f64 {
        match self {
            Domain::Aperiodic => 0.,
            Domain::Periodic { period, .. } => *period,
        }
    }

    /// Whether the domain is periodic
    pub fn is_periodic(&self) -> bool {
        matches!(self, Domain::Periodic { .. })
    }

    /// Canonical representative of `x`
    pub fn wrap(&self, x: f64) -> f64 {
        periodic::wrap(x, self.period())
    }

    /// Shortest signed difference `a - b`
    pub fn difference(&self, a: f64, b: f64) -> f64 {
        periodic::periodic_difference(a, b, self.period())
    }

    /// Shortest distance between `a` and `b`
    pub fn distance(&self, a: f64, b: f64) -> f64 {
        periodic::periodic_distance(a, b, self.period())
    }

    /// Midpoint of the shortest arc from `a` to `b`
    pub fn midpoint(&self, a: f64, b: f64) -> f64 {
        periodic::periodic_midpoint(a, b, self.period())
    }

    /// Density of one (unweighted) component at `x`
    pub fn component_density(&self, c: &Component, x: f64) -> f64 {
        match self {
            Domain::Aperiodic => gaussian(c.mean, c.spread, x),
            Domain::Periodic { period, images } => {
                periodic_gaussian(c.mean, c.spread, x, *period, *images)
            }
        }
    }

    /// Derivative wrt `x` of the density of one (unweighted) component
    pub fn component_density_dx(&self, c: &Component, x: f64) -> f64 {
        match self {
            Domain::Aperiodic => gaussian_dx(c.mean, c.spread, x),
            Domain::Periodic { period, images } => {
                periodic_gaussian_dx(c.mean, c.spread, x, *period, *images)
            }
        }
    }
}

/// Ordered list of weighted normal components.
///
/// Weights lie in (0, 1] and sum to at most one, spreads are strictly positive.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Mixture {
    components: Vec<Component>,
}

impl Mixture {
    /// Creates a mixture from its components.
    ///
    /// # Errors
    ///
    /// [MixtureError::InvalidParameter] if a weight is not in (0, 1], a spread is not
    /// strictly positive, a value is not finite or the weights sum above one.
    pub fn new(components: Vec<Component>) -> Result<Mixture> {
        let mixture = Mixture { components };
        mixture.validate()?;
        Ok(mixture)
    }

    pub(crate) fn new_unchecked(components: Vec<Component>) -> Mixture {
        Mixture { components }
    }

    /// Checks the mixture invariants
    pub fn validate(&self) -> Result<()> {
        let mut total = 0.;
        for (k, c) in self.components.iter().enumerate() {
            if !(c.weight > 0. && c.weight <= 1.) {
                return Err(MixtureError::InvalidParameter(format!(
                    "weight of component {k} should be in (0, 1], got {}",
                    c.weight
                )));
            }
            if !(c.spread > 0.) || !c.spread.is_finite() {
                return Err(MixtureError::InvalidParameter(format!(
                    "spread of component {k} should be strictly positive, got {}",
                    c.spread
                )));
            }
            if !c.mean.is_finite() {
                return Err(MixtureError::InvalidParameter(format!(
                    "mean of component {k} should be finite, got {}",
                    c.mean
                )));
            }
            total += c.weight;
        }
        if total > 1. + WEIGHT_SUM_TOLERANCE {
            return Err(MixtureError::InvalidParameter(format!(
                "weights sum to {total} which is greater than 1"
            )));
        }
        Ok(())
    }

    /// The components
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub(crate) fn components_mut(&mut self) -> &mut Vec<Component> {
        &mut self.components
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the mixture has no component
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Sum of the weights
    pub fn total_weight(&self) -> f64 {
        self.components.iter().map(|c| c.weight).sum()
    }

    /// Mixture density at `x`
    pub fn density(&self, x: f64, domain: &Domain) -> f64 {
        self.components
            .iter()
            .map(|c| c.weight * domain.component_density(c, x))
            .sum()
    }

    /// Derivative wrt `x` of the mixture density
    pub fn density_dx(&self, x: f64, domain: &Domain) -> f64 {
        self.components
            .iter()
            .map(|c| c.weight * domain.component_density_dx(c, x))
            .sum()
    }

    /// Same mixture with every mean translated by `shift`
    pub fn shifted(&self, shift: f64) -> Mixture {
        Mixture::new_unchecked(
            self.components
                .iter()
                .map(|c| Component::new(c.weight, c.mean + shift, c.spread))
                .collect(),
        )
    }
}

impl From<Mixture> for Vec<Component> {
    fn from(mixture: Mixture) -> Self {
        mixture.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_mixture_validation() {
        let valid = vec![Component::new(0.5, 0., 1.), Component::new(0.5, 1., 2.)];
        assert!(Mixture::new(valid).is_ok());
        let bad = [
            vec![Component::new(0., 0., 1.)],
            vec![Component::new(1.2, 0., 1.)],
            vec![Component::new(0.5, 0., 0.)],
            vec![Component::new(0.5, 0., -1.)],
            vec![Component::new(0.5, f64::NAN, 1.)],
            vec![Component::new(0.6, 0., 1.), Component::new(0.6, 1., 1.)],
        ];
        for components in bad {
            assert!(matches!(
                Mixture::new(components),
                Err(MixtureError::InvalidParameter(_))
            ));
        }
        // tolerance on the weight sum
        let rounded = vec![Component::new(0.5, 0., 1.), Component::new(0.5000001, 1., 1.)];
        assert!(Mixture::new(rounded).is_ok());
    }

    #[test]
    fn test_domain() {
        assert_eq!(Domain::new(0., 10).unwrap(), Domain::Aperiodic);
        assert_eq!(
            Domain::new(2. * PI, 10).unwrap(),
            Domain::Periodic {
                period: 2. * PI,
                images: 10
            }
        );
        assert!(Domain::new(-1., 10).is_err());
        assert!(Domain::new(f64::INFINITY, 10).is_err());
    }

    #[test]
    fn test_mixture_density() {
        let mixture = Mixture::new(vec![
            Component::new(0.25, -1., 0.5),
            Component::new(0.75, 2., 1.),
        ])
        .unwrap();
        let expected = 0.25 * gaussian(-1., 0.5, 0.3) + 0.75 * gaussian(2., 1., 0.3);
        assert_abs_diff_eq!(mixture.density(0.3, &Domain::Aperiodic), expected);
        let h = 1e-6;
        let domain = Domain::new(2. * PI, 5).unwrap();
        let fd = (mixture.density(0.3 + h, &domain) - mixture.density(0.3 - h, &domain)) / (2. * h);
        assert_abs_diff_eq!(mixture.density_dx(0.3, &domain), fd, epsilon = 1e-7);
    }
}
