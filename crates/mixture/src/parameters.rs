use crate::errors::{MixtureError, Result};
use linfa::ParamGuard;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default max number of EM iterations
pub const EM_MAX_STEPS: usize = 200;
/// Default likelihood gain under which EM iterations stop
pub const EM_TOLERANCE: f64 = 0.1;

/// Initial guess strategy used by guided fits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Initialization {
    /// means are evenly spaced quantiles of the sample
    #[default]
    Quantiles,
    /// means are drawn uniformly without replacement from the sample
    Random,
}

/// EM checked parameters
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct EmValidParams {
    /// Max number of EM iterations of a guided fit
    max_steps: usize,
    /// Likelihood gain under which a guided fit stops
    tolerance: f64,
    /// A component owning less than this fraction of an even share `N/K` of the points is pruned
    min_share: f64,
    /// A component with a spread under this fraction of the domain length is pruned
    min_spread_ratio: f64,
    /// Initial spread of guided fit components as a fraction of the domain length
    init_spread_ratio: f64,
    /// Random generator used by random initialization
    rng: Xoshiro256Plus,
}

impl Default for EmValidParams {
    fn default() -> EmValidParams {
        EmValidParams {
            max_steps: EM_MAX_STEPS,
            tolerance: EM_TOLERANCE,
            min_share: 0.1,
            min_spread_ratio: 0.01,
            init_spread_ratio: 0.1,
            rng: Xoshiro256Plus::from_entropy(),
        }
    }
}

impl EmValidParams {
    /// Max number of EM iterations
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Likelihood gain tolerance
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Minimal ownership share under which a component is pruned
    pub fn min_share(&self) -> f64 {
        self.min_share
    }

    /// Minimal spread ratio under which a component is pruned
    pub fn min_spread_ratio(&self) -> f64 {
        self.min_spread_ratio
    }

    /// Initial spread ratio of guided fits
    pub fn init_spread_ratio(&self) -> f64 {
        self.init_spread_ratio
    }

    /// The random generator
    pub fn rng(&self) -> Xoshiro256Plus {
        self.rng.clone()
    }

    /// Same settings with a random generator seeded with `seed`
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = Xoshiro256Plus::seed_from_u64(seed);
        self
    }
}

/// EM parameters
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct EmParams(EmValidParams);

impl EmParams {
    /// Constructor of EM parameters with default values
    pub fn new() -> EmParams {
        Self::new_with_rng(Xoshiro256Plus::from_entropy())
    }

    /// Constructor of EM parameters specifying random number generator for reproducibility
    pub fn new_with_rng(rng: Xoshiro256Plus) -> EmParams {
        Self(EmValidParams {
            rng,
            ..Default::default()
        })
    }

    /// Sets the max number of iterations
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.0.max_steps = max_steps;
        self
    }

    /// Sets the likelihood gain tolerance
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Sets the minimal ownership share
    pub fn min_share(mut self, min_share: f64) -> Self {
        self.0.min_share = min_share;
        self
    }

    /// Sets the minimal spread ratio
    pub fn min_spread_ratio(mut self, min_spread_ratio: f64) -> Self {
        self.0.min_spread_ratio = min_spread_ratio;
        self
    }

    /// Sets the initial spread ratio
    pub fn init_spread_ratio(mut self, init_spread_ratio: f64) -> Self {
        self.0.init_spread_ratio = init_spread_ratio;
        self
    }

    /// Sets the random number generator for reproducibility
    pub fn with_rng(mut self, rng: Xoshiro256Plus) -> Self {
        self.0.rng = rng;
        self
    }

    /// Seeds the random number generator for reproducibility
    pub fn seed(self, seed: u64) -> Self {
        self.with_rng(Xoshiro256Plus::seed_from_u64(seed))
    }
}

fn check_ratio(name: &str, value: f64) -> Result<()> {
    if value > 0. && value < 1. {
        Ok(())
    } else {
        Err(MixtureError::InvalidParameter(format!(
            "`{name}` should be in (0, 1), got {value}"
        )))
    }
}

impl ParamGuard for EmParams {
    type Checked = EmValidParams;
    type Error = MixtureError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.max_steps == 0 {
            return Err(MixtureError::InvalidParameter(
                "`max_steps` cannot be 0!".to_string(),
            ));
        }
        if !(self.0.tolerance >= 0.) || !self.0.tolerance.is_finite() {
            return Err(MixtureError::InvalidParameter(format!(
                "`tolerance` should be positive and finite, got {}",
                self.0.tolerance
            )));
        }
        check_ratio("min_share", self.0.min_share)?;
        check_ratio("min_spread_ratio", self.0.min_spread_ratio)?;
        check_ratio("init_spread_ratio", self.0.init_spread_ratio)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl From<EmValidParams> for EmParams {
    fn from(item: EmValidParams) -> Self {
        EmParams(item)
    }
}
