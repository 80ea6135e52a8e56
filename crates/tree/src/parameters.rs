use crate::errors::{ClusterError, Result};
use linfa::ParamGuard;
use periclust_mixture::{EmValidParams, Initialization};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of mixture components fitted on each dimension
pub const DEFAULT_N_COMPONENTS: usize = 4;
/// Default number of images on each side of a periodic component
pub const DEFAULT_IMAGES: usize = 10;
/// Default number of points under which a node is not split
pub const DEFAULT_LEAF_SIZE: usize = 1000;

/// Gaussian mixture partitioner checked parameters
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct PartitionerValidParams {
    /// Density under which a minimum of the fitted density becomes a cut
    threshold: f64,
    /// Number of components of the initial mixture
    n_components: usize,
    /// Number of images on each side of a periodic component
    images: usize,
    /// Initial means strategy
    init: Initialization,
    /// EM settings
    em: EmValidParams,
}

impl PartitionerValidParams {
    /// Cut density threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of components of the initial mixture
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Number of images on each side of a periodic component
    pub fn images(&self) -> usize {
        self.images
    }

    /// Initial means strategy
    pub fn init(&self) -> Initialization {
        self.init
    }

    /// EM settings
    pub fn em(&self) -> &EmValidParams {
        &self.em
    }
}

/// Gaussian mixture partitioner parameters.
///
/// The cut threshold has no default and is given at construction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct PartitionerParams(PartitionerValidParams);

impl PartitionerParams {
    /// Constructor with the given density `threshold` and default values
    pub fn new(threshold: f64) -> PartitionerParams {
        Self(PartitionerValidParams {
            threshold,
            n_components: DEFAULT_N_COMPONENTS,
            images: DEFAULT_IMAGES,
            init: Initialization::default(),
            em: EmValidParams::default(),
        })
    }

    /// Sets the number of components of the initial mixture
    pub fn n_components(mut self, n_components: usize) -> Self {
        self.0.n_components = n_components;
        self
    }

    /// Sets the number of images on each side of a periodic component
    pub fn images(mut self, images: usize) -> Self {
        self.0.images = images;
        self
    }

    /// Sets the initial means strategy
    pub fn init(mut self, init: Initialization) -> Self {
        self.0.init = init;
        self
    }

    /// Sets the EM settings
    pub fn em_params(mut self, em: EmValidParams) -> Self {
        self.0.em = em;
        self
    }

    /// Seeds the EM random generator for reproducibility
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.em = self.0.em.seeded(seed);
        self
    }
}

fn check_partitioner(params: &PartitionerValidParams) -> Result<()> {
    if !(params.threshold > 0.) || !params.threshold.is_finite() {
        return Err(ClusterError::InvalidValueError(format!(
            "`threshold` should be strictly positive and finite, got {}",
            params.threshold
        )));
    }
    if params.n_components < 2 {
        return Err(ClusterError::InvalidValueError(format!(
            "`n_components` should be at least 2, got {}",
            params.n_components
        )));
    }
    Ok(())
}

impl ParamGuard for PartitionerParams {
    type Checked = PartitionerValidParams;
    type Error = ClusterError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        check_partitioner(&self.0)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl From<PartitionerValidParams> for PartitionerParams {
    fn from(item: PartitionerValidParams) -> Self {
        PartitionerParams(item)
    }
}

/// Cluster tree checked parameters
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ClusterTreeValidParams {
    /// Nodes with fewer points are not split
    leaf_size: usize,
    /// Settings of the partitioner applied to each dimension of a node
    partitioner: PartitionerValidParams,
}

impl ClusterTreeValidParams {
    /// Number of points under which a node is not split
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Partitioner settings
    pub fn partitioner(&self) -> &PartitionerValidParams {
        &self.partitioner
    }
}

/// Cluster tree parameters.
///
/// The cut threshold has no default and is given at construction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ClusterTreeParams(ClusterTreeValidParams);

impl ClusterTreeParams {
    /// Constructor with the given cut density `threshold` and default values
    pub fn new(threshold: f64) -> ClusterTreeParams {
        Self(ClusterTreeValidParams {
            leaf_size: DEFAULT_LEAF_SIZE,
            partitioner: PartitionerParams::new(threshold).0,
        })
    }

    /// Sets the number of points under which a node is not split
    pub fn leaf_size(mut self, leaf_size: usize) -> Self {
        self.0.leaf_size = leaf_size;
        self
    }

    /// Sets the number of components fitted on each dimension
    pub fn n_components(self, n_components: usize) -> Self {
        self.with_partitioner(|p| p.n_components(n_components))
    }

    /// Sets the number of images on each side of a periodic component
    pub fn images(self, images: usize) -> Self {
        self.with_partitioner(|p| p.images(images))
    }

    /// Sets the initial means strategy
    pub fn init(self, init: Initialization) -> Self {
        self.with_partitioner(|p| p.init(init))
    }

    /// Sets the EM settings
    pub fn em_params(self, em: EmValidParams) -> Self {
        self.with_partitioner(|p| p.em_params(em))
    }

    /// Seeds the EM random generator for reproducibility
    pub fn seed(self, seed: u64) -> Self {
        self.with_partitioner(|p| p.seed(seed))
    }

    fn with_partitioner(self, update: impl FnOnce(PartitionerParams) -> PartitionerParams) -> Self {
        let ClusterTreeValidParams {
            leaf_size,
            partitioner,
        } = self.0;
        Self(ClusterTreeValidParams {
            leaf_size,
            partitioner: update(PartitionerParams(partitioner)).0,
        })
    }
}

impl ParamGuard for ClusterTreeParams {
    type Checked = ClusterTreeValidParams;
    type Error = ClusterError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.leaf_size == 0 {
            return Err(ClusterError::InvalidValueError(
                "`leaf_size` cannot be 0!".to_string(),
            ));
        }
        check_partitioner(&self.0.partitioner)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl From<ClusterTreeValidParams> for ClusterTreeParams {
    fn from(item: ClusterTreeValidParams) -> Self {
        ClusterTreeParams(item)
    }
}
