use ndarray::Array1;

/// Sampling method generating draws of a one dimensional normal law,
/// optionally wrapped on a periodic domain.
pub trait Sampler {
    /// Returns the location and the scale `(mean, std)` of the sampled law
    fn law(&self) -> (f64, f64);

    /// Returns the period of the domain, `0` meaning the domain is not periodic
    fn period(&self) -> f64 {
        0.
    }

    /// Generates `ns` draws of the standard normal law N(0, 1)
    fn standard_sample(&self, ns: usize) -> Array1<f64>;

    /// Generates `ns` draws of the sampled law.
    ///
    /// When the domain is periodic the draws are wrapped into `[-period/2, period/2)`.
    fn sample(&self, ns: usize) -> Array1<f64> {
        let (mean, std) = self.law();
        let period = self.period();
        let xs = self.standard_sample(ns) * std + mean;
        if period > 0. {
            xs.mapv(|x| x - period * (x / period + 0.5).floor())
        } else {
            xs
        }
    }
}
