use ndarray::ArrayD;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use special::Gamma as SpecialGamma;

use crate::core::{NodeError, NodeResult};

// ------------------------------------------------------------------------------------------

/// x * ln(y) with the convention 0 * ln(0) = 0
#[inline(always)]
pub(super) fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0f64 {
        0f64
    } else {
        x * f64::ln(y)
    }
}

/// Negative entropy of a Bernoulli variable
#[inline(always)]
pub(super) fn bernoulli_neg_entropy(theta: f64) -> f64 {
    xlogy(theta, theta) + xlogy(1f64 - theta, 1f64 - theta)
}

/// E_q[ln p(s)] for s ~ q = Bernoulli(theta) and p = Bernoulli(ptheta)
#[inline(always)]
pub(super) fn bernoulli_cross_term(theta: f64, ptheta: f64) -> f64 {
    xlogy(theta, ptheta) + xlogy(1f64 - theta, 1f64 - ptheta)
}

/// E[ln p(x)] for p = Gamma(a, b) given E[x] and E[ln x]
#[inline(always)]
pub(super) fn gamma_log_density_expectation(a: f64, b: f64, e: f64, ln_e: f64) -> f64 {
    a * f64::ln(b) - SpecialGamma::ln_gamma(a).0 + (a - 1f64) * ln_e - b * e
}

// ------------------------------------------------------------------------------------------

/// Returns an initializer filling arrays of a requested shape with samples from N(mean, std^2),
/// e.g. to break the symmetry of latent factor means
///
/// # Arguments
///
/// * `rng` - A random numbers generator
/// * `mean` - Mean of samples
/// * `std` - Standard deviation of samples, finite and non-negative
pub fn random_normal_initializer(
    mut rng: impl Rng,
    mean: f64,
    std: f64,
) -> NodeResult<impl FnMut(&[usize]) -> ArrayD<f64>> {
    if !(std.is_finite() && std >= 0f64) {
        return Err(NodeError::InvalidHyperparameter(format!(
            "N({}, {}^2): standard deviation must be finite and non-negative",
            mean, std
        )));
    }
    let distr = Normal::new(mean, std)
        .map_err(|err| NodeError::InvalidHyperparameter(format!("N({}, {}^2): {}", mean, std, err)))?;
    Ok(move |dim: &[usize]| ArrayD::from_shape_simple_fn(dim, || distr.sample(&mut rng)))
}

/// Returns an initializer filling arrays of a requested shape with samples from U[low, high)
///
/// # Arguments
///
/// * `rng` - A random numbers generator
/// * `low` - Lower bound
/// * `high` - Upper bound, must be greater than `low`
pub fn random_uniform_initializer(
    mut rng: impl Rng,
    low: f64,
    high: f64,
) -> NodeResult<impl FnMut(&[usize]) -> ArrayD<f64>> {
    if !(low < high) {
        return Err(NodeError::InvalidHyperparameter(format!(
            "U[{}, {}) is empty",
            low, high
        )));
    }
    let distr = Uniform::new(low, high);
    Ok(move |dim: &[usize]| ArrayD::from_shape_simple_fn(dim, || distr.sample(&mut rng)))
}
