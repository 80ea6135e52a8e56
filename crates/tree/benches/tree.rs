use criterion::{criterion_group, criterion_main, Criterion};
use linfa::ParamGuard;
use ndarray::array;
use ndarray_rand::rand::SeedableRng;
use periclust_sampling::labeled_blobs;
use periclust_tree::ClusterTree;
use rand_xoshiro::Xoshiro256Plus;
use std::f64::consts::PI;

fn criterion_benchmark(c: &mut Criterion) {
    let period = 2. * PI;
    let centers = array![[-PI / 2., PI / 2.], [-PI / 2., -PI / 2.], [PI / 4., 0.]];
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let (data, _) = labeled_blobs(&centers, 0.15, &[period, period], 1000, &mut rng);
    let params = ClusterTree::params(0.1).images(5).seed(42).check().unwrap();

    let mut group = c.benchmark_group("cluster_tree");
    group.sample_size(10);
    group.bench_function("three_periodic_blobs", |b| {
        b.iter(|| {
            ClusterTree::new(&data, &[period, period], params.clone())
                .unwrap()
                .run()
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
