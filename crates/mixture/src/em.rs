//! Expectation maximization engine for one dimensional plain and periodic gaussian mixtures.
use crate::errors::{MixtureError, Result};
use crate::family::DensityFamily;
use crate::parameters::{EmValidParams, Initialization};
use crate::types::{Component, Mixture};
use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Zip};
use ndarray_rand::rand::seq::index;
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Under this normalizer all responsibilities of a point are set to zero
pub const NORMALIZER_THRESHOLD: f64 = 1e-7;
/// Tolerance on the sum of a responsibility row
pub const RESPONSIBILITY_TOLERANCE: f64 = 1e-6;

/// Outcome of a guided fit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum FitStatus {
    /// The likelihood gain fell below the tolerance
    Converged,
    /// The max number of EM iterations was reached
    IterationBudgetExhausted,
}

/// States of the guided fit loop
#[derive(Clone, Copy, Debug, PartialEq)]
enum GuidedFitState {
    /// Iterating with the likelihood of the current parameters
    Fitting { likelihood: f64 },
    /// Components were discarded, the likelihood has to be recomputed
    Pruned,
    Converged,
    IterationBudgetExhausted,
}

/// EM engine fitting a mixture of the family `F` to a one dimensional sample.
///
/// The engine owns the sample, the current mixture and the (N, K)
/// responsibility matrix computed by the last E-step.
#[derive(Clone, Debug)]
pub struct Em<F: DensityFamily> {
    data: Array1<f64>,
    family: F,
    mixture: Mixture,
    resp: Array2<f64>,
    params: EmValidParams,
    rng: Xoshiro256Plus,
}

impl<F: DensityFamily> Em<F> {
    /// Creates an engine fitting `sample` starting from the given `mixture`.
    ///
    /// # Errors
    ///
    /// [MixtureError::InvalidParameter] when the sample is empty or the mixture is malformed
    pub fn new(
        sample: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        family: F,
        mixture: Mixture,
    ) -> Result<Self> {
        let mut em = Self::unfitted(sample, family)?;
        em.set_parameters(mixture)?;
        Ok(em)
    }

    /// Creates an engine without parameters, to be used with [`Em::simple_run`],
    /// [`Em::guided_run`] or [`Em::fit_from`].
    pub fn unfitted(sample: &ArrayBase<impl Data<Elem = f64>, Ix1>, family: F) -> Result<Self> {
        if sample.is_empty() {
            return Err(MixtureError::InvalidParameter(
                "EM: sample should not be empty".to_string(),
            ));
        }
        if sample.iter().any(|x| !x.is_finite()) {
            return Err(MixtureError::InvalidParameter(
                "EM: sample values should be finite".to_string(),
            ));
        }
        let domain = family.domain();
        let params = EmValidParams::default();
        let rng = params.rng();
        Ok(Em {
            data: sample.mapv(|x| domain.wrap(x)),
            family,
            mixture: Mixture::default(),
            resp: Array2::zeros((sample.len(), 0)),
            params,
            rng,
        })
    }

    /// Sets the settings used by guided fits
    pub fn with_params(mut self, params: EmValidParams) -> Self {
        self.rng = params.rng();
        self.params = params;
        self
    }

    /// The settings used by guided fits
    pub fn params(&self) -> &EmValidParams {
        &self.params
    }

    /// The density family
    pub fn family(&self) -> &F {
        &self.family
    }

    /// The fitted sample, wrapped into the canonical range when periodic
    pub fn data(&self) -> &Array1<f64> {
        &self.data
    }

    /// Replaces the current mixture and resets the responsibilities to zero
    pub fn set_parameters(&mut self, mixture: Mixture) -> Result<()> {
        mixture.validate()?;
        self.resp = Array2::zeros((self.data.len(), mixture.len()));
        self.mixture = mixture;
        Ok(())
    }

    /// The current mixture
    pub fn parameters(&self) -> &Mixture {
        &self.mixture
    }

    /// The (N, K) responsibility matrix of the last E-step
    pub fn responsibilities(&self) -> &Array2<f64> {
        &self.resp
    }

    /// Log-likelihood of the sample under the current mixture.
    ///
    /// The mixture density of each point is floored at [`NORMALIZER_THRESHOLD`], the points
    /// left without responsibility by the E-step contributing a constant term.
    pub fn likelihood(&self) -> f64 {
        let components = self.mixture.components();
        self.data
            .iter()
            .map(|&x| {
                components
                    .iter()
                    .map(|c| c.weight * self.family.density(c, x))
                    .sum::<f64>()
                    .max(NORMALIZER_THRESHOLD)
                    .ln()
            })
            .sum()
    }

    /// Computes the responsibilities of the current mixture.
    ///
    /// # Errors
    ///
    /// [MixtureError::IntegrityError] if a row neither sums to one nor is zeroed
    pub fn e_step(&mut self) -> Result<()> {
        let k = self.mixture.len();
        if self.resp.dim() != (self.data.len(), k) {
            self.resp = Array2::zeros((self.data.len(), k));
        }
        let components = self.mixture.components();
        let family = &self.family;
        Zip::from(self.resp.rows_mut())
            .and(&self.data)
            .par_for_each(|mut row, &x| {
                for (r, c) in row.iter_mut().zip(components) {
                    *r = c.weight * family.density(c, x);
                }
                let norm = row.sum();
                if norm < NORMALIZER_THRESHOLD {
                    row.fill(0.);
                } else {
                    row /= norm;
                }
            });
        self.check_responsibilities()
    }

    fn check_responsibilities(&self) -> Result<()> {
        for (n, row) in self.resp.rows().into_iter().enumerate() {
            let sum = row.sum();
            if sum != 0. && !((sum - 1.).abs() <= RESPONSIBILITY_TOLERANCE) {
                return Err(MixtureError::IntegrityError(format!(
                    "responsibilities of point {n} sum to {sum}"
                )));
            }
        }
        Ok(())
    }

    /// Updates the mixture from the current responsibilities
    pub fn m_step(&mut self) {
        self.family.m_step(&self.data, &self.resp, &mut self.mixture);
    }

    /// Runs at most `max_steps` EM iterations.
    ///
    /// The mixture is reverted to its state before the last iteration when that
    /// iteration decreased the likelihood, which also ends the loop.
    /// Returns `true` when the likelihood gain fell below `tolerance` or a revert occurred,
    /// `false` when the iteration budget was exhausted.
    pub fn run(&mut self, max_steps: usize, tolerance: f64) -> Result<bool> {
        if self.mixture.is_empty() {
            return Err(MixtureError::InvalidParameter(
                "EM: parameters should be set before running".to_string(),
            ));
        }
        let mut previous = self.likelihood();
        let mut steps = 0;
        loop {
            if steps >= max_steps {
                debug!("EM: iteration budget of {max_steps} steps exhausted");
                return Ok(false);
            }
            let snapshot = self.mixture.clone();
            self.e_step()?;
            self.m_step();
            steps += 1;
            let current = self.likelihood();
            trace!("EM step {steps}: likelihood {previous} -> {current}");
            if !(current >= previous) {
                debug!("EM: likelihood decreased at step {steps}, reverting");
                self.mixture = snapshot;
                return Ok(true);
            }
            if !(current - previous > tolerance) {
                debug!("EM: converged after {steps} steps, likelihood {current}");
                return Ok(true);
            }
            previous = current;
        }
    }

    /// Discards the components owning too few points or too narrow to be meaningful.
    ///
    /// A point is owned by the component maximizing `weight * density` at this point.
    /// A component is discarded when it owns fewer than `min_share * N / K` points or its
    /// spread is below `min_spread_ratio` times the domain length. At least one component is kept.
    /// Returns whether a component was discarded.
    pub fn clean_parameters(&mut self) -> bool {
        let k = self.mixture.len();
        if k == 0 {
            return false;
        }
        let components = self.mixture.components();
        let mut counts = vec![0usize; k];
        for &x in self.data.iter() {
            let scores =
                Array1::from_iter(components.iter().map(|c| c.weight * self.family.density(c, x)));
            counts[scores.argmax().unwrap_or(0)] += 1;
        }
        let min_count = self.params.min_share() * self.data.len() as f64 / k as f64;
        let min_spread = self.params.min_spread_ratio() * self.family.domain_length(&self.data);
        let mut keep: Vec<bool> = components
            .iter()
            .zip(&counts)
            .map(|(c, &count)| count as f64 >= min_count && c.spread >= min_spread)
            .collect();
        if !keep.iter().any(|&k| k) {
            let best = Array1::from_vec(counts.clone()).argmax().unwrap_or(0);
            keep[best] = true;
        }
        if keep.iter().all(|&k| k) {
            return false;
        }
        let kept: Vec<Component> = components
            .iter()
            .zip(&keep)
            .filter(|(_, &k)| k)
            .map(|(c, _)| *c)
            .collect();
        debug!(
            "EM: pruned {} of {k} components (ownership {counts:?})",
            k - kept.len()
        );
        self.resp = Array2::zeros((self.data.len(), kept.len()));
        *self.mixture.components_mut() = kept;
        true
    }

    /// Builds an initial mixture of `n_components` components.
    ///
    /// Weights are `1 / n_components` and spreads the initial spread ratio of the domain length.
    ///
    /// # Errors
    ///
    /// [MixtureError::InvalidParameter] if `n_components` is 0 or greater than the sample size
    pub fn initialize(&mut self, init: Initialization, n_components: usize) -> Result<Mixture> {
        let n = self.data.len();
        if n_components == 0 || n_components > n {
            return Err(MixtureError::InvalidParameter(format!(
                "EM: number of components should be in [1, {n}], got {n_components}"
            )));
        }
        let means: Vec<f64> = match init {
            Initialization::Random => index::sample(&mut self.rng, n, n_components)
                .into_iter()
                .map(|i| self.data[i])
                .collect(),
            Initialization::Quantiles => {
                let mut sorted = self.data.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                (0..n_components)
                    .map(|i| sorted[(2 * i + 1) * n / (2 * n_components)])
                    .collect()
            }
        };
        let domain = self.family.domain();
        let spread = self.params.init_spread_ratio() * self.family.domain_length(&self.data);
        let weight = 1. / n_components as f64;
        Mixture::new(
            means
                .into_iter()
                .map(|u| Component::new(weight, domain.wrap(u), spread))
                .collect(),
        )
    }

    /// Guided fit of `num_params` components with means drawn from the sample
    pub fn simple_run(&mut self, num_params: usize) -> Result<FitStatus> {
        self.guided_run(Initialization::Random, num_params)
    }

    /// Guided fit of `n_components` components initialized with `init`
    pub fn guided_run(&mut self, init: Initialization, n_components: usize) -> Result<FitStatus> {
        let mixture = self.initialize(init, n_components)?;
        self.fit_from(mixture)
    }

    /// Guided fit starting from the given mixture.
    ///
    /// EM iterations are interleaved with [`Em::clean_parameters`] and restarted
    /// whenever a component was discarded, until the likelihood gain falls below
    /// the tolerance or the max number of steps is reached.
    pub fn fit_from(&mut self, mixture: Mixture) -> Result<FitStatus> {
        self.set_parameters(mixture)?;
        if self.mixture.is_empty() {
            return Err(MixtureError::InvalidParameter(
                "EM: initial mixture should have components".to_string(),
            ));
        }
        let max_steps = self.params.max_steps();
        let tolerance = self.params.tolerance();
        let mut steps = 0;
        let mut state = GuidedFitState::Pruned;
        loop {
            state = match state {
                GuidedFitState::Pruned => GuidedFitState::Fitting {
                    likelihood: self.likelihood(),
                },
                GuidedFitState::Fitting { likelihood } => {
                    let snapshot = self.mixture.clone();
                    self.e_step()?;
                    self.m_step();
                    steps += 1;
                    let pruned = self.clean_parameters();
                    let current = self.likelihood();
                    let decreased = !pruned && !(current >= likelihood);
                    if decreased {
                        debug!("EM: likelihood decreased at step {steps}, reverting");
                        self.mixture = snapshot;
                    }
                    if steps >= max_steps {
                        GuidedFitState::IterationBudgetExhausted
                    } else if pruned {
                        GuidedFitState::Pruned
                    } else if decreased || !(current - likelihood > tolerance) {
                        GuidedFitState::Converged
                    } else {
                        GuidedFitState::Fitting {
                            likelihood: current,
                        }
                    }
                }
                GuidedFitState::Converged => {
                    debug!(
                        "EM: guided fit converged after {steps} steps with {} components",
                        self.mixture.len()
                    );
                    return Ok(FitStatus::Converged);
                }
                GuidedFitState::IterationBudgetExhausted => {
                    debug!("EM: guided fit stopped after {steps} steps");
                    return Ok(FitStatus::IterationBudgetExhausted);
                }
            }
        }
    }
}
