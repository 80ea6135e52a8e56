//! Splitting of one dimensional samples at the low density points of a fitted mixture.
use crate::errors::{ClusterError, Result};
use crate::parameters::PartitionerValidParams;
use log::debug;
use ndarray::ArrayView1;
use periclust_mixture::{
    find_minima, wrap, DensityFamily, Domain, Em, Gaussian, Mixture, PeriodicGaussian,
};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A strategy cutting a one dimensional sample into intervals
pub trait Partitioner: Send + Sync {
    /// Sorted cut points of `sample`, empty when the sample should not be split.
    ///
    /// `period` is the length of the domain for periodic data, `0` otherwise.
    /// On a periodic domain `n` cuts make `n` parts, the first and last intervals being joined,
    /// otherwise `n` cuts make `n + 1` parts.
    fn partition(&self, sample: &ArrayView1<f64>, period: f64) -> Result<Vec<f64>>;
}

/// Number of parts made by `cuts` on a domain of period `period` (`0` if not periodic)
pub fn n_parts(cuts: &[f64], period: f64) -> usize {
    if period > 0. {
        cuts.len().max(1)
    } else {
        cuts.len() + 1
    }
}

/// Index of the part containing `x` among the [`n_parts`] parts made by the sorted `cuts`.
///
/// A cut belongs to the part on its right. On a periodic domain, the values below the first cut
/// and above the last cut belong to the part 0.
pub fn interval_index(cuts: &[f64], period: f64, x: f64) -> usize {
    if period > 0. {
        if cuts.is_empty() {
            return 0;
        }
        let x = wrap(x, period);
        cuts.partition_point(|&c| c <= x) % cuts.len()
    } else {
        cuts.partition_point(|&c| c <= x)
    }
}

/// Partitioner cutting a sample at the minima of a fitted gaussian mixture density
/// which fall under a density threshold.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GaussianMixturePartitioner {
    params: PartitionerValidParams,
}

impl GaussianMixturePartitioner {
    /// Constructor
    pub fn new(params: PartitionerValidParams) -> Self {
        GaussianMixturePartitioner { params }
    }

    /// The partitioner settings
    pub fn params(&self) -> &PartitionerValidParams {
        &self.params
    }

    fn fit<F: DensityFamily>(&self, sample: &ArrayView1<f64>, family: F) -> Result<Mixture> {
        let mut em = Em::unfitted(sample, family)?.with_params(self.params.em().clone());
        let n_components = self.params.n_components().min(sample.len());
        let status = em.guided_run(self.params.init(), n_components)?;
        debug!(
            "Partitioner: {:?} fit with {} components",
            status,
            em.parameters().len()
        );
        Ok(em.parameters().clone())
    }

    /// Fits the mixture used to partition `sample`
    pub fn fit_mixture(&self, sample: &ArrayView1<f64>, period: f64) -> Result<(Mixture, Domain)> {
        let domain = Domain::new(period, self.params.images())?;
        let mixture = match domain {
            Domain::Aperiodic => self.fit(sample, Gaussian)?,
            Domain::Periodic { period, images } => {
                self.fit(sample, PeriodicGaussian::new(period, images)?)?
            }
        };
        Ok((mixture, domain))
    }
}

impl Partitioner for GaussianMixturePartitioner {
    fn partition(&self, sample: &ArrayView1<f64>, period: f64) -> Result<Vec<f64>> {
        if sample.is_empty() {
            return Err(ClusterError::InvalidValueError(
                "cannot partition an empty sample".to_string(),
            ));
        }
        let (mixture, domain) = self.fit_mixture(sample, period)?;
        if mixture.len() < 2 {
            return Ok(vec![]);
        }
        let threshold = self.params.threshold();
        let cuts: Vec<f64> = find_minima(&mixture, &domain)?
            .into_iter()
            .filter(|&m| mixture.density(m, &domain) < threshold)
            .collect();
        debug!("Partitioner: cuts {cuts:?} (period {period})");
        Ok(cuts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::PartitionerParams;
    use linfa::ParamGuard;
    use ndarray::{concatenate, Axis};
    use ndarray_rand::rand::SeedableRng;
    use periclust_sampling::{Normal, PeriodicNormal, Sampler};
    use rand_xoshiro::Xoshiro256Plus;
    use std::f64::consts::PI;

    #[test]
    fn test_n_parts() {
        assert_eq!(n_parts(&[], 0.), 1);
        assert_eq!(n_parts(&[], 2. * PI), 1);
        assert_eq!(n_parts(&[0.5], 0.), 2);
        assert_eq!(n_parts(&[0.5], 2. * PI), 1);
        assert_eq!(n_parts(&[-1., 0.5, 2.], 0.), 4);
        assert_eq!(n_parts(&[-1., 0.5, 2.], 2. * PI), 3);
    }

    #[test]
    fn test_interval_index() {
        let cuts = [-1., 0.5, 2.];
        assert_eq!(interval_index(&cuts, 0., -5.), 0);
        assert_eq!(interval_index(&cuts, 0., -1.), 1);
        assert_eq!(interval_index(&cuts, 0., 1.), 2);
        assert_eq!(interval_index(&cuts, 0., 10.), 3);

        let period = 2. * PI;
        assert_eq!(interval_index(&cuts, period, -3.), 0);
        assert_eq!(interval_index(&cuts, period, 3.), 0);
        assert_eq!(interval_index(&cuts, period, 0.), 1);
        assert_eq!(interval_index(&cuts, period, 1.), 2);
        // 0 + period wraps back to 0
        assert_eq!(interval_index(&cuts, period, period), 1);
        assert_eq!(interval_index(&[], period, 1.), 0);
        assert_eq!(interval_index(&[0.5], period, 1.), 0);
    }

    #[test]
    fn test_aperiodic_partition() {
        let left = Normal::new(-3., 0.5)
            .with_rng(Xoshiro256Plus::seed_from_u64(10))
            .sample(1000);
        let right = Normal::new(3., 0.5)
            .with_rng(Xoshiro256Plus::seed_from_u64(11))
            .sample(1000);
        let sample = concatenate![Axis(0), left, right];
        let partitioner =
            GaussianMixturePartitioner::new(PartitionerParams::new(0.05).seed(0).check().unwrap());
        let cuts = partitioner.partition(&sample.view(), 0.).unwrap();
        assert_eq!(cuts.len(), 1);
        assert!(cuts[0] > -1.5 && cuts[0] < 1.5);
    }

    #[test]
    fn test_periodic_partition() {
        let period = 2. * PI;
        let a = PeriodicNormal::new(-PI / 2., 0.3, period)
            .with_rng(Xoshiro256Plus::seed_from_u64(20))
            .sample(1000);
        let b = PeriodicNormal::new(PI / 2., 0.3, period)
            .with_rng(Xoshiro256Plus::seed_from_u64(21))
            .sample(1000);
        let sample = concatenate![Axis(0), a, b];
        let partitioner = GaussianMixturePartitioner::new(
            PartitionerParams::new(0.1).images(5).seed(0).check().unwrap(),
        );
        let cuts = partitioner.partition(&sample.view(), period).unwrap();
        assert_eq!(cuts.len(), 2);
        assert!(cuts[0] < cuts[1]);
        // one cut around 0, one around the boundary
        assert!(cuts[0].abs() < 0.5 || cuts[1].abs() < 0.5);
        assert_eq!(n_parts(&cuts, period), 2);
        let part_a = interval_index(&cuts, period, -PI / 2.);
        let part_b = interval_index(&cuts, period, PI / 2.);
        assert_ne!(part_a, part_b);
    }

    #[test]
    fn test_unimodal_sample_is_not_cut() {
        let sample = Normal::new(1., 2.)
            .with_rng(Xoshiro256Plus::seed_from_u64(30))
            .sample(1000);
        let partitioner =
            GaussianMixturePartitioner::new(PartitionerParams::new(0.001).check().unwrap());
        assert!(partitioner.partition(&sample.view(), 0.).unwrap().is_empty());
    }

    #[test]
    fn test_partition_errors() {
        let partitioner =
            GaussianMixturePartitioner::new(PartitionerParams::new(0.1).check().unwrap());
        let empty = ndarray::Array1::<f64>::zeros(0);
        assert!(matches!(
            partitioner.partition(&empty.view(), 0.),
            Err(ClusterError::InvalidValueError(_))
        ));
        let sample = ndarray::array![1., 2., 3.];
        assert!(matches!(
            partitioner.partition(&sample.view(), -1.),
            Err(ClusterError::MixtureError(_))
        ));
    }
}
