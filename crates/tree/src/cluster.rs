//! Clustering of a set of points by combining the partitions of each of their dimensions.
use crate::errors::{ClusterError, Result};
use crate::partitioner::{interval_index, n_parts, Partitioner};
use log::debug;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Points of one tree node together with the per-dimension partitions computed on them
#[derive(Debug)]
pub struct Cluster<'a, P: Partitioner> {
    data: Array2<f64>,
    periods: &'a [f64],
    partitioner: &'a P,
    partitions: Vec<Option<Vec<f64>>>,
}

impl<'a, P: Partitioner> Cluster<'a, P> {
    /// Constructor of a cluster over the (n, nx) `data` matrix.
    ///
    /// `periods` gives the period of each dimension, `0` for a non periodic one.
    pub fn new(
        data: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        periods: &'a [f64],
        partitioner: &'a P,
    ) -> Result<Self> {
        if periods.len() != data.ncols() {
            return Err(ClusterError::InvalidValueError(format!(
                "expected {} periods, one per dimension, got {}",
                data.ncols(),
                periods.len()
            )));
        }
        Ok(Cluster {
            data: data.to_owned(),
            periods,
            partitioner,
            partitions: vec![None; periods.len()],
        })
    }

    /// Number of points
    pub fn n_points(&self) -> usize {
        self.data.nrows()
    }

    /// Number of dimensions
    pub fn n_dims(&self) -> usize {
        self.data.ncols()
    }

    /// Cuts of each dimension, `None` while a dimension is not partitioned
    pub fn partitions(&self) -> &[Option<Vec<f64>>] {
        &self.partitions
    }

    /// Partitions the dimension `dim`
    pub fn partition(&mut self, dim: usize) -> Result<&[f64]> {
        if dim >= self.n_dims() {
            return Err(ClusterError::InvalidValueError(format!(
                "dimension {dim} out of range, data has {} dimensions",
                self.n_dims()
            )));
        }
        let cuts = self
            .partitioner
            .partition(&self.data.column(dim), self.periods[dim])?;
        let stored = self.partitions[dim].insert(cuts);
        Ok(stored.as_slice())
    }

    /// Partitions every dimension, dimensions being processed in parallel
    pub fn partition_all(&mut self) -> Result<()> {
        let data = &self.data;
        let periods = self.periods;
        let partitioner = self.partitioner;
        let partitions = (0..self.n_dims())
            .into_par_iter()
            .map(|d| partitioner.partition(&data.column(d), periods[d]))
            .collect::<Result<Vec<_>>>()?;
        self.partitions = partitions.into_iter().map(Some).collect();
        Ok(())
    }

    /// Cluster index of each point.
    ///
    /// The interval indices of a point on each dimension are combined in a mixed radix key,
    /// keys being relabeled to `0..n_clusters` in increasing order.
    ///
    /// # Errors
    ///
    /// [ClusterError::InvalidState] if a dimension is not partitioned
    pub fn cluster(&self) -> Result<Array1<usize>> {
        let cuts = self
            .partitions
            .iter()
            .enumerate()
            .map(|(d, p)| {
                p.as_deref().ok_or_else(|| {
                    ClusterError::InvalidState(format!("dimension {d} is not partitioned"))
                })
            })
            .collect::<Result<Vec<&[f64]>>>()?;

        let mut radices = Vec::with_capacity(cuts.len());
        let mut radix = 1usize;
        for (c, &period) in cuts.iter().zip(self.periods) {
            radices.push(radix);
            radix = radix.checked_mul(n_parts(c, period)).ok_or_else(|| {
                ClusterError::InvalidValueError("too many parts to be combined".to_string())
            })?;
        }

        let keys: Vec<usize> = self
            .data
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(&cuts)
                    .zip(self.periods)
                    .zip(&radices)
                    .map(|(((&x, c), &period), &r)| interval_index(c, period, x) * r)
                    .sum::<usize>()
            })
            .collect();

        let mut labels: BTreeMap<usize, usize> = keys.iter().map(|&k| (k, 0)).collect();
        for (label, value) in labels.values_mut().enumerate() {
            *value = label;
        }
        debug!(
            "Cluster: {} points grouped in {} clusters",
            keys.len(),
            labels.len()
        );
        Ok(keys.iter().map(|k| labels[k]).collect())
    }

    /// Takes the cuts of every dimension
    ///
    /// # Errors
    ///
    /// [ClusterError::InvalidState] if a dimension is not partitioned
    pub fn into_partitions(self) -> Result<Vec<Vec<f64>>> {
        self.partitions
            .into_iter()
            .enumerate()
            .map(|(d, p)| {
                p.ok_or_else(|| {
                    ClusterError::InvalidState(format!("dimension {d} is not partitioned"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, ArrayView1};
    use std::f64::consts::PI;

    /// Cuts every dimension at fixed points
    struct FixedCuts(Vec<f64>);

    impl Partitioner for FixedCuts {
        fn partition(&self, _sample: &ArrayView1<f64>, _period: f64) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_cluster_combines_dimensions() {
        let data = array![[-1., -1.], [1., -1.], [-1., 1.], [1., 1.], [1.5, 1.5], [-2., -2.]];
        let periods = [0., 0.];
        let partitioner = FixedCuts(vec![0.]);
        let mut cluster = Cluster::new(&data, &periods, &partitioner).unwrap();
        assert!(matches!(cluster.cluster(), Err(ClusterError::InvalidState(_))));
        cluster.partition_all().unwrap();
        // keys: x part + 2 * y part
        assert_eq!(cluster.cluster().unwrap(), array![0, 1, 2, 3, 3, 0]);
    }

    #[test]
    fn test_cluster_dense_relabeling() {
        let data = array![[1., 1.], [-1., -1.], [1., 1.]];
        let periods = [0., 0.];
        let partitioner = FixedCuts(vec![0.]);
        let mut cluster = Cluster::new(&data, &periods, &partitioner).unwrap();
        cluster.partition(0).unwrap();
        assert!(matches!(cluster.cluster(), Err(ClusterError::InvalidState(_))));
        assert_eq!(cluster.partition(1).unwrap(), &[0.]);
        // keys 3 and 0 become 1 and 0
        assert_eq!(cluster.cluster().unwrap(), array![1, 0, 1]);
        assert_eq!(cluster.into_partitions().unwrap(), vec![vec![0.], vec![0.]]);
    }

    #[test]
    fn test_cluster_periodic_wrap() {
        // points on both sides of the boundary belong to the same part
        let data = array![[-3.], [3.], [0.], [3.5]];
        let periods = [2. * PI];
        let partitioner = FixedCuts(vec![-1.5, 1.5]);
        let mut cluster = Cluster::new(&data, &periods, &partitioner).unwrap();
        cluster.partition_all().unwrap();
        assert_eq!(cluster.cluster().unwrap(), array![0, 0, 1, 0]);
    }

    #[test]
    fn test_cluster_errors() {
        let data = array![[1., 2.]];
        let partitioner = FixedCuts(vec![]);
        assert!(matches!(
            Cluster::new(&data, &[0.], &partitioner),
            Err(ClusterError::InvalidValueError(_))
        ));
        let periods = [0., 0.];
        let mut cluster = Cluster::new(&data, &periods, &partitioner).unwrap();
        assert!(matches!(
            cluster.partition(2),
            Err(ClusterError::InvalidValueError(_))
        ));
        cluster.partition_all().unwrap();
        assert_eq!(cluster.cluster().unwrap(), array![0]);
    }
}
