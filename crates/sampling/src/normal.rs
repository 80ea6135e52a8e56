use std::sync::{Arc, RwLock};

use crate::Sampler;
use ndarray::{Array, Array1, Zip};
use ndarray_rand::{rand::Rng, rand::SeedableRng, rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;

type RngRef<R> = Arc<RwLock<R>>;

/// Normal law sampled with the Box-Muller transform
#[derive(Clone, Debug)]
pub struct Normal<R: Rng> {
    mean: f64,
    std: f64,
    /// Random generator used for reproducibility
    rng: RngRef<R>,
}

impl Normal<Xoshiro256Plus> {
    /// Constructor of N(mean, std^2) sampler
    ///
    /// **Panics** if `std` is not strictly positive.
    pub fn new(mean: f64, std: f64) -> Self {
        Self::new_with_rng(mean, std, Xoshiro256Plus::from_entropy())
    }
}

impl<R: Rng> Normal<R> {
    /// Constructor of N(mean, std^2) sampler with a random generator for reproducibility
    ///
    /// **Panics** if `std` is not strictly positive.
    pub fn new_with_rng(mean: f64, std: f64, rng: R) -> Self {
        if std <= 0. {
            panic!("standard deviation must be strictly positive, got {std}");
        }
        Normal {
            mean,
            std,
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Set random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> Normal<R2> {
        Normal {
            mean: self.mean,
            std: self.std,
            rng: Arc::new(RwLock::new(rng)),
        }
    }
}

impl<R: Rng> Sampler for Normal<R> {
    fn law(&self) -> (f64, f64) {
        (self.mean, self.std)
    }

    fn standard_sample(&self, ns: usize) -> Array1<f64> {
        let mut rng = self.rng.write().unwrap();
        let npairs = ns.div_ceil(2);
        let u1 = Array::random_using(npairs, Uniform::new(0f64, 1.), &mut *rng);
        let u2 = Array::random_using(npairs, Uniform::new(0f64, 1.), &mut *rng);
        let mut z = Array1::zeros(2 * npairs);
        Zip::indexed(&u1).and(&u2).for_each(|i, &a, &b| {
            // 1 - a lies in (0, 1] so the log is finite
            let radius = (-2. * (1. - a).ln()).sqrt();
            let theta = 2. * std::f64::consts::PI * b;
            z[2 * i] = radius * theta.cos();
            z[2 * i + 1] = radius * theta.sin();
        });
        z.slice_move(ndarray::s![..ns])
    }
}

/// Normal law wrapped on a periodic domain `[-period/2, period/2)`
#[derive(Clone, Debug)]
pub struct PeriodicNormal<R: Rng> {
    normal: Normal<R>,
    period: f64,
}

impl PeriodicNormal<Xoshiro256Plus> {
    /// Constructor of a wrapped N(mean, std^2) sampler on a domain of length `period`
    ///
    /// **Panics** if `std` or `period` are not strictly positive.
    pub fn new(mean: f64, std: f64, period: f64) -> Self {
        Self::new_with_rng(mean, std, period, Xoshiro256Plus::from_entropy())
    }
}

impl<R: Rng> PeriodicNormal<R> {
    /// Constructor of a wrapped N(mean, std^2) sampler with a random generator for reproducibility
    ///
    /// **Panics** if `std` or `period` are not strictly positive.
    pub fn new_with_rng(mean: f64, std: f64, period: f64, rng: R) -> Self {
        if period <= 0. {
            panic!("period must be strictly positive, got {period}");
        }
        PeriodicNormal {
            normal: Normal::new_with_rng(mean, std, rng),
            period,
        }
    }

    /// Set random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> PeriodicNormal<R2> {
        PeriodicNormal {
            normal: self.normal.with_rng(rng),
            period: self.period,
        }
    }
}

impl<R: Rng> Sampler for PeriodicNormal<R> {
    fn law(&self) -> (f64, f64) {
        self.normal.law()
    }

    fn period(&self) -> f64 {
        self.period
    }

    fn standard_sample(&self, ns: usize) -> Array1<f64> {
        self.normal.standard_sample(ns)
    }
}
