use linfa::ParamGuard;
use ndarray::array;
use ndarray_rand::rand::SeedableRng;
use periclust_sampling::labeled_blobs;
use periclust_tree::{ClusterTree, StepOutcome};
use rand_xoshiro::Xoshiro256Plus;
use std::error::Error;
use std::f64::consts::PI;

fn main() -> Result<(), Box<dyn Error>> {
    // Three clusters of torsion angles (in radians)
    let period = 2. * PI;
    let centers = array![[-PI / 2., PI / 2.], [-PI / 2., -PI / 2.], [PI / 4., 0.]];
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let (data, labels) = labeled_blobs(&centers, 0.2, &[period, period], 2000, &mut rng);

    let params = ClusterTree::params(0.1).seed(42).check()?;
    let mut tree = ClusterTree::new(&data, &[period, period], params)?;
    while !tree.finished() {
        match tree.step()? {
            StepOutcome::Split { node, children } => {
                println!("node {node} split into {children:?}")
            }
            StepOutcome::Leaf { node, reason } => println!("node {node} is a leaf ({reason:?})"),
        }
    }

    let assignment = tree.assignment()?;
    println!("Found {} clusters", tree.n_clusters());
    for (id, node) in tree.nodes().iter().enumerate().filter(|(_, n)| n.is_leaf()) {
        let first = node.indices()[0];
        println!(
            "node {id}: {} points, first point label {} assigned to cluster {}",
            node.indices().len(),
            labels[first],
            assignment[first]
        );
    }
    Ok(())
}
