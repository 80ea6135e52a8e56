//! This library fits one dimensional gaussian mixtures with an expectation maximization
//! (EM) algorithm and locates the critical points of the fitted density.
//!
//! Data may live on the real line or on a ring (angles, torsions, phases...) in which case
//! the periodic density of a component is approximated by summing translated images
//! of a plain gaussian over a given number of periods on each side.
//!
//! # Implementation
//!
//! * [`Em`] is generic over a [`DensityFamily`]: [`Gaussian`] for plain data and
//!   [`PeriodicGaussian`] for wrapped data. The periodic M-step finds the root of the
//!   log-likelihood partial derivatives with a fixed point iteration.
//! * Guided fits ([`Em::simple_run`], [`Em::guided_run`], [`Em::fit_from`]) interleave EM
//!   iterations with the pruning of components owning too few points or too narrow.
//! * [`find_maxima`] and [`find_minima`] walk the density gradient with an adaptive step,
//!   the minima being the low density cut candidates of a sample.
//!
//! # Features
//!
//! ## serializable
//!
//! The `serializable` feature enables serialization based on [serde crate](https://serde.rs/).
//!
//! # Example
//!
//! ```
//! use periclust_mixture::{find_minima, Component, DensityFamily, Em, Mixture, PeriodicGaussian};
//! use ndarray::Array1;
//! use std::f64::consts::PI;
//!
//! // Angles gathered around -2 and 1 radians
//! let angles = Array1::from_shape_fn(400, |i| {
//!     let spread = 0.2 * ((i % 20) as f64 / 10. - 1.);
//!     if i % 2 == 0 { -2. + spread } else { 1. + spread }
//! });
//! let init = Mixture::new(vec![
//!     Component::new(0.5, -1.5, 0.5),
//!     Component::new(0.5, 0.5, 0.5),
//! ]).expect("valid mixture");
//! let family = PeriodicGaussian::new(2. * PI, 10).expect("valid period");
//! let mut em = Em::new(&angles, family, init).expect("EM engine");
//! em.run(100, 1e-6).expect("EM fit");
//!
//! // One valley between the modes, another one across the -pi/pi boundary
//! let domain = em.family().domain();
//! let minima = find_minima(em.parameters(), &domain).expect("minima search");
//! assert_eq!(minima.len(), 2);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod critical;
mod density;
mod em;
mod errors;
mod family;
mod parameters;
mod periodic;
mod types;

pub use critical::*;
pub use density::*;
pub use em::*;
pub use errors::*;
pub use family::*;
pub use parameters::*;
pub use periodic::*;
pub use types::*;
