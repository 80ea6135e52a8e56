use crate::cluster::Cluster;
use crate::errors::{ClusterError, Result};
use crate::parameters::{ClusterTreeParams, ClusterTreeValidParams};
use crate::partitioner::{GaussianMixturePartitioner, Partitioner};
use env_logger::{Builder, Env};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
use std::collections::VecDeque;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Index of a node in the tree
pub type NodeId = usize;

/// A tree node owning a subset of the dataset points
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Node {
    indices: Vec<usize>,
    partitions: Option<Vec<Vec<f64>>>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    depth: usize,
}

impl Node {
    /// Indices of the node points in the dataset
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Cuts of each dimension once the node has been partitioned
    pub fn partitions(&self) -> Option<&[Vec<f64>]> {
        self.partitions.as_deref()
    }

    /// Children of the node, in cluster order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent of the node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Depth of the node, 0 for the root
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Why a processed node was not split
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum LeafReason {
    /// The node holds fewer points than the leaf size
    TooSmall,
    /// No dimension of the node could be cut
    NoCut,
}

/// Result of one [`ClusterTree::step`]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum StepOutcome {
    /// The node was split into the given children
    Split {
        /// processed node
        node: NodeId,
        /// created children
        children: Vec<NodeId>,
    },
    /// The node stays a leaf
    Leaf {
        /// processed node
        node: NodeId,
        /// why the node was not split
        reason: LeafReason,
    },
}

/// Breadth first hierarchical clustering.
///
/// Starting from a root node holding every point, each queued node is partitioned
/// dimension by dimension and split into the groups of points sharing the same
/// intervals on every dimension. Children are queued in turn until no node can be split.
///
/// The tree may look like:
/// ```text
///                     0
///           __________|__________
///           1         2         3
///                           ____|____
///                           4       5
/// ```
/// where 1, 4 and 5 are leaves, that is the clusters.
#[derive(Debug)]
pub struct ClusterTree<P: Partitioner = GaussianMixturePartitioner> {
    data: Array2<f64>,
    periods: Vec<f64>,
    leaf_size: usize,
    partitioner: P,
    nodes: Vec<Node>,
    queue: VecDeque<NodeId>,
}

impl ClusterTree<GaussianMixturePartitioner> {
    /// Cluster tree parameters with the given cut density `threshold`
    pub fn params(threshold: f64) -> ClusterTreeParams {
        ClusterTreeParams::new(threshold)
    }

    /// Constructor of the clustering of the (n, nx) `data` matrix using gaussian mixture
    /// partitions.
    ///
    /// `periods` gives the period of each dimension, `0` for a non periodic one.
    pub fn new(
        data: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        periods: &[f64],
        params: ClusterTreeValidParams,
    ) -> Result<Self> {
        let partitioner = GaussianMixturePartitioner::new(params.partitioner().clone());
        Self::new_with_partitioner(data, periods, params.leaf_size(), partitioner)
    }
}

impl<P: Partitioner> ClusterTree<P> {
    /// Constructor of the clustering of the (n, nx) `data` matrix with a given partitioner.
    ///
    /// Logs are enabled through the `PERICLUST_LOG` environment variable (`info` by default).
    ///
    /// # Errors
    ///
    /// [ClusterError::InvalidValueError] when the dataset is empty or not finite,
    /// when the periods do not match the dimensions or are negative, or when `leaf_size` is 0
    pub fn new_with_partitioner(
        data: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        periods: &[f64],
        leaf_size: usize,
        partitioner: P,
    ) -> Result<Self> {
        let env = Env::new().filter_or("PERICLUST_LOG", "info");
        let mut builder = Builder::from_env(env);
        let builder = builder.target(env_logger::Target::Stdout);
        builder.try_init().ok();

        let (n, nx) = data.dim();
        if n == 0 || nx == 0 {
            return Err(ClusterError::InvalidValueError(format!(
                "dataset should have points and dimensions, got shape ({n}, {nx})"
            )));
        }
        if periods.len() != nx {
            return Err(ClusterError::InvalidValueError(format!(
                "expected {nx} periods, one per dimension, got {}",
                periods.len()
            )));
        }
        if let Some(p) = periods.iter().find(|p| !(**p >= 0.) || !p.is_finite()) {
            return Err(ClusterError::InvalidValueError(format!(
                "periods should be positive or zero, got {p}"
            )));
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(ClusterError::InvalidValueError(
                "dataset values should be finite".to_string(),
            ));
        }
        if leaf_size == 0 {
            return Err(ClusterError::InvalidValueError(
                "`leaf_size` cannot be 0!".to_string(),
            ));
        }
        let root = Node {
            indices: (0..n).collect(),
            ..Default::default()
        };
        Ok(ClusterTree {
            data: data.to_owned(),
            periods: periods.to_vec(),
            leaf_size,
            partitioner,
            nodes: vec![root],
            queue: VecDeque::from([0]),
        })
    }

    /// Number of points of the dataset
    pub fn n_points(&self) -> usize {
        self.data.nrows()
    }

    /// Number of dimensions of the dataset
    pub fn n_dims(&self) -> usize {
        self.data.ncols()
    }

    /// Number of clusters found so far, that is the current number of leaves
    pub fn n_clusters(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// The root node
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// The node `id` if any
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes, the root first then in creation order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Whether no node remains to be processed
    pub fn finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Processes the next queued node.
    ///
    /// A node holding fewer points than the leaf size stays a leaf. Otherwise every
    /// dimension is partitioned and one child is created per resulting cluster,
    /// unless there is only one.
    ///
    /// # Errors
    ///
    /// [ClusterError::InvalidState] when the queue is empty or the next node
    /// is empty or already processed
    pub fn step(&mut self) -> Result<StepOutcome> {
        let id = self
            .queue
            .pop_front()
            .ok_or_else(|| ClusterError::InvalidState("no node left to process".to_string()))?;
        let node = &self.nodes[id];
        if node.indices.is_empty() {
            return Err(ClusterError::InvalidState(format!("node {id} is empty")));
        }
        if node.partitions.is_some() || !node.children.is_empty() {
            return Err(ClusterError::InvalidState(format!(
                "node {id} is already processed"
            )));
        }
        if node.indices.len() < self.leaf_size {
            debug!(
                "Node {id}: {} points, too small to be split",
                node.indices.len()
            );
            return Ok(StepOutcome::Leaf {
                node: id,
                reason: LeafReason::TooSmall,
            });
        }

        let subset = self.data.select(Axis(0), &node.indices);
        let mut cluster = Cluster::new(&subset, &self.periods, &self.partitioner)?;
        cluster.partition_all()?;
        let labels = cluster.cluster()?;
        let partitions = cluster.into_partitions()?;
        let n_groups = labels.iter().max().map_or(0, |&m| m + 1);

        let mut groups = vec![vec![]; n_groups];
        for (&label, &index) in labels.iter().zip(&node.indices) {
            groups[label].push(index);
        }
        let depth = node.depth;
        self.nodes[id].partitions = Some(partitions);
        if n_groups < 2 {
            debug!("Node {id}: no cut found");
            return Ok(StepOutcome::Leaf {
                node: id,
                reason: LeafReason::NoCut,
            });
        }

        let children: Vec<NodeId> = groups
            .into_iter()
            .map(|indices| {
                let child = self.nodes.len();
                self.nodes.push(Node {
                    indices,
                    partitions: None,
                    children: vec![],
                    parent: Some(id),
                    depth: depth + 1,
                });
                self.queue.push_back(child);
                child
            })
            .collect();
        info!(
            "Node {id}: split into {} clusters of sizes {:?}",
            children.len(),
            children
                .iter()
                .map(|&c| self.nodes[c].indices.len())
                .collect::<Vec<_>>()
        );
        self.nodes[id].children = children.clone();
        Ok(StepOutcome::Split { node: id, children })
    }

    /// Leaf index of each point, leaves being numbered in breadth first order.
    ///
    /// # Errors
    ///
    /// [ClusterError::IntegrityError] when the leaves are not a partition of the dataset points
    pub fn assignment(&self) -> Result<Array1<usize>> {
        let n = self.n_points();
        let mut assignment = Array1::zeros(n);
        let mut assigned = vec![false; n];
        let mut visited = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([0]);
        let mut leaf = 0;
        while let Some(id) = queue.pop_front() {
            if std::mem::replace(&mut visited[id], true) {
                return Err(ClusterError::IntegrityError(format!(
                    "node {id} is reached twice"
                )));
            }
            let node = &self.nodes[id];
            if !node.is_leaf() {
                queue.extend(node.children.iter().copied());
                continue;
            }
            for &i in node.indices.iter() {
                if i >= n || std::mem::replace(&mut assigned[i], true) {
                    return Err(ClusterError::IntegrityError(format!(
                        "point {i} is not assigned to exactly one leaf"
                    )));
                }
                assignment[i] = leaf;
            }
            leaf += 1;
        }
        if let Some(i) = assigned.iter().position(|done| !done) {
            return Err(ClusterError::IntegrityError(format!(
                "point {i} is not assigned to any leaf"
            )));
        }
        Ok(assignment)
    }

    /// Processes nodes until none is left and returns the resulting [`ClusterTree::assignment`]
    pub fn run(&mut self) -> Result<Array1<usize>> {
        while !self.finished() {
            self.step()?;
        }
        info!(
            "Clustering of {} points done: {} clusters",
            self.n_points(),
            self.n_clusters()
        );
        self.assignment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linfa::ParamGuard;
    use ndarray::{array, ArrayView1};
    use ndarray_rand::rand::SeedableRng;
    use periclust_sampling::labeled_blobs;
    use rand_xoshiro::Xoshiro256Plus;
    use std::f64::consts::PI;

    /// Cuts every dimension at 0
    struct ZeroCut;

    impl Partitioner for ZeroCut {
        fn partition(&self, _sample: &ArrayView1<f64>, _period: f64) -> Result<Vec<f64>> {
            Ok(vec![0.])
        }
    }

    /// Cuts every dimension at its sample mean
    struct MeanCut;

    impl Partitioner for MeanCut {
        fn partition(&self, sample: &ArrayView1<f64>, _period: f64) -> Result<Vec<f64>> {
            let mean = sample.mean().unwrap_or(0.);
            if sample.iter().all(|&x| x == sample[0]) {
                Ok(vec![])
            } else {
                Ok(vec![mean])
            }
        }
    }

    fn quadrants() -> Array2<f64> {
        array![[-1., -1.], [1., -1.], [-1., 1.], [1., 1.], [2., 2.], [-2., -2.]]
    }

    #[test]
    fn test_single_split() {
        let data = quadrants();
        let mut tree = ClusterTree::new_with_partitioner(&data, &[0., 0.], 2, ZeroCut).unwrap();
        assert_eq!(tree.n_points(), 6);
        assert_eq!(tree.n_dims(), 2);
        assert_eq!(tree.n_clusters(), 1);
        assert_eq!(tree.assignment().unwrap(), Array1::<usize>::zeros(6));

        let outcome = tree.step().unwrap();
        assert_eq!(
            outcome,
            StepOutcome::Split {
                node: 0,
                children: vec![1, 2, 3, 4]
            }
        );
        assert_eq!(tree.node(1).unwrap().indices(), &[0, 5]);
        assert_eq!(tree.node(4).unwrap().indices(), &[3, 4]);
        assert_eq!(tree.node(4).unwrap().parent(), Some(0));
        assert_eq!(tree.node(4).unwrap().depth(), 1);
        assert_eq!(tree.root().partitions().unwrap(), &[vec![0.], vec![0.]]);

        // every child holds a single point on each side of 0
        for id in 1..=4 {
            let outcome = tree.step().unwrap();
            match outcome {
                StepOutcome::Split { node, .. } => assert_eq!(node, id),
                StepOutcome::Leaf { node, reason } => {
                    assert_eq!(node, id);
                    assert!(matches!(reason, LeafReason::NoCut | LeafReason::TooSmall));
                }
            }
        }
        assert!(tree.finished());
        assert!(matches!(tree.step(), Err(ClusterError::InvalidState(_))));
        assert_eq!(tree.assignment().unwrap(), array![0, 1, 2, 3, 3, 0]);
        assert_eq!(tree.n_clusters(), 4);
    }

    #[test]
    fn test_too_small_root() {
        let data = quadrants();
        let mut tree = ClusterTree::new_with_partitioner(&data, &[0., 0.], 10, ZeroCut).unwrap();
        assert_eq!(
            tree.step().unwrap(),
            StepOutcome::Leaf {
                node: 0,
                reason: LeafReason::TooSmall
            }
        );
        assert!(tree.finished());
        assert!(tree.root().is_leaf());
        assert!(tree.root().partitions().is_none());
        assert_eq!(tree.assignment().unwrap(), Array1::<usize>::zeros(6));
    }

    #[test]
    fn test_bfs_leaf_numbering() {
        let data = array![[0.], [1.], [10.], [11.], [12.], [13.]];
        let mut tree = ClusterTree::new_with_partitioner(&data, &[0.], 3, MeanCut).unwrap();
        let assignment = tree.run().unwrap();
        // the root mean gives {0, 1} and {10, .., 13}, then {10, 11} and {12, 13}
        assert_eq!(assignment, array![0, 0, 1, 1, 2, 2]);
        assert_eq!(tree.n_clusters(), 3);
        assert_eq!(tree.node(2).unwrap().children(), &[3, 4]);
        assert!(tree.node(5).is_none());
    }

    #[test]
    fn test_assignment_is_complete() {
        let data = Array2::from_shape_fn((50, 3), |(i, j)| ((i * 7 + j * 13) % 17) as f64);
        let mut tree =
            ClusterTree::new_with_partitioner(&data, &[0., 0., 17.], 4, MeanCut).unwrap();
        let assignment = tree.run().unwrap();
        let n_clusters = tree.n_clusters();
        let mut counts = vec![0; n_clusters];
        for &a in assignment.iter() {
            assert!(a < n_clusters);
            counts[a] += 1;
        }
        assert!(counts.iter().all(|&c| c > 0));
        assert_eq!(counts.iter().sum::<usize>(), 50);
    }

    #[test]
    fn test_invalid_tree() {
        let data = quadrants();
        assert!(ClusterTree::new_with_partitioner(&data, &[0.], 2, ZeroCut).is_err());
        assert!(ClusterTree::new_with_partitioner(&data, &[0., -1.], 2, ZeroCut).is_err());
        assert!(ClusterTree::new_with_partitioner(&data, &[0., 0.], 0, ZeroCut).is_err());
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(ClusterTree::new_with_partitioner(&empty, &[0., 0.], 2, ZeroCut).is_err());
        let nan = array![[f64::NAN, 0.]];
        assert!(ClusterTree::new_with_partitioner(&nan, &[0., 0.], 2, ZeroCut).is_err());
    }

    #[test]
    fn test_broken_tree_integrity() {
        let data = quadrants();
        let mut tree = ClusterTree::new_with_partitioner(&data, &[0., 0.], 2, ZeroCut).unwrap();
        tree.step().unwrap();
        tree.nodes[1].indices.push(3);
        assert!(matches!(
            tree.assignment(),
            Err(ClusterError::IntegrityError(_))
        ));
        tree.nodes[1].indices.truncate(1);
        assert!(matches!(
            tree.assignment(),
            Err(ClusterError::IntegrityError(_))
        ));
    }

    /// Checks that the leaves and the generating labels make the same groups
    fn assert_same_groups(assignment: &Array1<usize>, labels: &Array1<usize>, n_groups: usize) {
        let mut label_of_leaf = vec![None; n_groups];
        for (&a, &l) in assignment.iter().zip(labels.iter()) {
            assert_eq!(*label_of_leaf[a].get_or_insert(l), l);
        }
        let mut found: Vec<usize> = label_of_leaf.into_iter().flatten().collect();
        found.sort();
        assert_eq!(found, (0..n_groups).collect::<Vec<_>>());
    }

    #[test]
    fn test_two_aperiodic_clusters() {
        let centers = array![[-10.], [10.]];
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let (data, labels) = labeled_blobs(&centers, 2., &[0.], 1000, &mut rng);

        let params = ClusterTree::params(0.01).seed(0).check().unwrap();
        let mut tree = ClusterTree::new(&data, &[0.], params).unwrap();
        assert!(matches!(tree.step().unwrap(), StepOutcome::Split { node: 0, .. }));
        let assignment = tree.run().unwrap();
        assert_eq!(tree.n_clusters(), 2);
        let cut = &tree.root().partitions().unwrap()[0];
        assert_eq!(cut.len(), 1);
        assert!(cut[0].abs() < 2.);
        assert_same_groups(&assignment, &labels, 2);
    }

    #[test]
    fn test_mixed_period_clusters() {
        let period = 2. * PI;
        let centers = array![[-PI / 2., -4.], [PI / 2., -4.], [PI / 2., 4.]];
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let (data, labels) = labeled_blobs(&centers, 0.3, &[period, 0.], 1000, &mut rng);

        let params = ClusterTree::params(0.05).images(5).seed(0).check().unwrap();
        let mut tree = ClusterTree::new(&data, &[period, 0.], params).unwrap();
        let assignment = tree.run().unwrap();
        assert_eq!(tree.n_clusters(), 3);
        assert_eq!(tree.root().children().len(), 3);
        // two cuts on the angle, one on the aperiodic coordinate
        let partitions = tree.root().partitions().unwrap();
        assert_eq!(partitions[0].len(), 2);
        assert_eq!(partitions[1].len(), 1);
        for &child in tree.root().children() {
            let node = tree.node(child).unwrap();
            assert!(node.is_leaf());
            assert_eq!(node.indices().len(), 1000);
        }
        assert_same_groups(&assignment, &labels, 3);
    }

    #[test]
    fn test_three_periodic_clusters() {
        let period = 2. * PI;
        let centers = array![[-PI / 2., PI / 2.], [-PI / 2., -PI / 2.], [PI / 4., 0.]];
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let (data, labels) = labeled_blobs(&centers, 0.15, &[period, period], 2000, &mut rng);

        let params = ClusterTree::params(0.1).images(5).seed(42).check().unwrap();
        let mut tree = ClusterTree::new(&data, &[period, period], params).unwrap();
        let assignment = tree.run().unwrap();
        assert_eq!(tree.n_clusters(), 3);
        assert_eq!(tree.root().children().len(), 3);

        // leaf ids may be a permutation of the generating labels
        let mut mapping = [[0usize; 3]; 3];
        for (&a, &l) in assignment.iter().zip(labels.iter()) {
            mapping[a][l] += 1;
        }
        let matched: usize = mapping.iter().map(|row| *row.iter().max().unwrap()).sum();
        let ratio = matched as f64 / data.nrows() as f64;
        assert_abs_diff_eq!(ratio, 1., epsilon = 0.01);
    }
}
