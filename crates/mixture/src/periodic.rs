//! Arithmetic on a periodic domain.
//!
//! A period of `0` stands for the real line: every function then falls back
//! to the plain arithmetic, which lets callers handle both kinds of domains
//! with the same code.

/// Wraps `x` into the canonical range `[-period/2, period/2)`.
pub fn wrap(x: f64, period: f64) -> f64 {
    if period > 0. {
        x - period * (x / period + 0.5).floor()
    } else {
        x
    }
}

/// Shortest signed difference `a - b` on the periodic domain.
pub fn periodic_difference(a: f64, b: f64, period: f64) -> f64 {
    wrap(a - b, period)
}

/// Shortest distance between `a` and `b` on the periodic domain.
pub fn periodic_distance(a: f64, b: f64, period: f64) -> f64 {
    periodic_difference(a, b, period).abs()
}

/// Midpoint of the shortest arc going from `a` to `b`, wrapped into the canonical range.
pub fn periodic_midpoint(a: f64, b: f64, period: f64) -> f64 {
    wrap(a + 0.5 * periodic_difference(b, a, period), period)
}
