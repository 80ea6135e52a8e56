/*!
This library generates synthetic one dimensional and labeled multi dimensional samples
drawn from plain or periodic (wrapped) normal distributions. It is used to build
reproducible datasets for periclust tests, examples and benchmarks.

Example:
```
use periclust_sampling::{Normal, PeriodicNormal, Sampler};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

// 100 draws of N(12.3, 4.7^2)
let xs = Normal::new(12.3, 4.7).with_rng(Xoshiro256Plus::seed_from_u64(42)).sample(100);
// 100 angles drawn around pi/2 wrapped into [-pi, pi)
let angles = PeriodicNormal::new(std::f64::consts::FRAC_PI_2, 0.3, 2. * std::f64::consts::PI)
    .with_rng(Xoshiro256Plus::seed_from_u64(42))
    .sample(100);
assert!(angles.iter().all(|a| a.abs() <= std::f64::consts::PI));
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod blobs;
mod normal;
mod traits;

pub use blobs::*;
pub use normal::*;
pub use traits::*;
