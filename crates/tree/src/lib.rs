//! This library implements a breadth first hierarchical clustering of multi dimensional
//! data where some dimensions may be periodic (angles, torsions, phases...).
//!
//! Each node of the [`ClusterTree`] is split by partitioning every dimension independently:
//! a one dimensional gaussian mixture is fitted with an EM algorithm on the node points
//! ([periclust_mixture]), the minima of the fitted density lying under a threshold are
//! the interval cuts of the dimension. Points sharing the same interval on every dimension
//! form a child node. Nodes are processed until none can be split further, the leaves
//! being the clusters.
//!
//! # Implementation
//!
//! * The partitioning strategy is pluggable through the [`Partitioner`] trait,
//!   [`GaussianMixturePartitioner`] being the default one.
//! * The dimensions of a node are partitioned in parallel using [rayon](https://docs.rs/rayon).
//! * The tree is stored as an arena of [`Node`]s addressed by [`NodeId`].
//!
//! # Features
//!
//! ## serializable
//!
//! The `serializable` feature enables serialization based on [serde crate](https://serde.rs/).
//!
//! # Example
//!
//! ```no_run
//! use periclust_tree::ClusterTree;
//! use linfa::ParamGuard;
//! use ndarray::Array2;
//! use std::f64::consts::PI;
//!
//! // Two torsion angles per point
//! let data = Array2::from_shape_fn((5000, 2), |(i, j)| {
//!     let center = if i % 2 == 0 { -PI / 2. } else { PI / 2. };
//!     center + 0.3 * (((i * 7 + j * 3) % 11) as f64 / 5. - 1.)
//! });
//! let params = ClusterTree::params(0.05).check().expect("valid settings");
//! let mut tree = ClusterTree::new(&data, &[2. * PI, 2. * PI], params).expect("tree");
//! let assignment = tree.run().expect("clustering");
//! println!("{} clusters found", tree.n_clusters());
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod cluster;
mod errors;
mod parameters;
mod partitioner;
mod tree;

pub use cluster::*;
pub use errors::*;
pub use parameters::*;
pub use partitioner::*;
pub use tree::*;
