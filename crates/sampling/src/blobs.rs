use crate::{Normal, PeriodicNormal, Sampler};
use ndarray::{s, Array1, Array2, ArrayBase, Data, Ix2};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// Generates a labeled dataset made of normal blobs.
///
/// # Parameters
///
/// * `centers`: a (nb, nx) matrix, the ith row is the center of the ith blob
/// * `std`: the standard deviation of every blob along every dimension
/// * `periods`: the period of each of the nx dimensions, `0` for a non periodic one
/// * `n_per_blob`: number of points drawn for each blob
/// * `rng`: random generator used to seed each blob sampler for reproducibility
///
/// # Returns
///
/// * A (nb * n_per_blob, nx) matrix of points, blob after blob
/// * the (nb * n_per_blob,) vector of blob labels
///
/// **Panics** if the number of periods does not match the number of dimensions.
pub fn labeled_blobs<R: Rng>(
    centers: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    std: f64,
    periods: &[f64],
    n_per_blob: usize,
    rng: &mut R,
) -> (Array2<f64>, Array1<usize>) {
    let (nb, nx) = centers.dim();
    if periods.len() != nx {
        panic!(
            "labeled_blobs: expected {nx} periods, one per dimension, got {}",
            periods.len()
        );
    }
    let mut data = Array2::zeros((nb * n_per_blob, nx));
    let mut labels = Array1::zeros(nb * n_per_blob);
    for (b, center) in centers.rows().into_iter().enumerate() {
        let rows = s![b * n_per_blob..(b + 1) * n_per_blob, ..];
        labels.slice_mut(s![b * n_per_blob..(b + 1) * n_per_blob]).fill(b);
        let mut block = data.slice_mut(rows);
        for (d, &period) in periods.iter().enumerate() {
            let seeded = Xoshiro256Plus::seed_from_u64(rng.gen());
            let column = if period > 0. {
                PeriodicNormal::new_with_rng(center[d], std, period, seeded).sample(n_per_blob)
            } else {
                Normal::new_with_rng(center[d], std, seeded).sample(n_per_blob)
            };
            block.column_mut(d).assign(&column);
        }
    }
    (data, labels)
}
