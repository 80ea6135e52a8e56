//! `periclust` clusters multi dimensional data, some dimensions of which may be periodic,
//! by cutting each dimension at the low density points of a fitted gaussian mixture.
//!
//! It gathers the following crates:
//! * [mixture]: plain and periodic gaussian mixtures fitted with an EM algorithm,
//!   and the critical points of their densities,
//! * [tree]: the low density partitioner and the breadth first hierarchical clustering.
//!
//! # Example
//!
//! ```no_run
//! use periclust::{ClusterTree, ParamGuard};
//! use ndarray::Array2;
//! use std::f64::consts::PI;
//!
//! // one angle and one length per point
//! let data = Array2::from_shape_fn((4000, 2), |(i, j)| {
//!     let jitter = ((i * 7 + j * 3) % 11) as f64 / 50.;
//!     match (i % 2, j) {
//!         (0, 0) => -2. + jitter,
//!         (_, 0) => 1. + jitter,
//!         _ => 10. + jitter,
//!     }
//! });
//! let params = ClusterTree::params(0.05).seed(0).check().expect("valid settings");
//! let mut tree = ClusterTree::new(&data, &[2. * PI, 0.], params).expect("tree");
//! let assignment = tree.run().expect("clustering");
//! assert_eq!(assignment.len(), 4000);
//! ```
#![warn(missing_docs)]

pub use linfa::ParamGuard;
pub use periclust_mixture as mixture;
pub use periclust_tree as tree;

pub use periclust_mixture::{
    find_maxima, find_minima, Component, DensityFamily, Domain, Em, EmParams, FitStatus, Gaussian,
    Initialization, Mixture, MixtureError, PeriodicGaussian,
};
pub use periclust_tree::{
    ClusterError, ClusterTree, ClusterTreeParams, GaussianMixturePartitioner, LeafReason, Node,
    Partitioner, PartitionerParams, StepOutcome,
};
