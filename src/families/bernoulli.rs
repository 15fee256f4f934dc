use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use serde::{Deserialize, Serialize};

use super::common::{bernoulli_cross_term, bernoulli_neg_entropy};
use crate::core::{
    broadcast_view, check_seed, Distribution, Family, NamedArrays, NamedMoments, NodeResult,
    ParamInit, UnobservedNode,
};

// ------------------------------------------------------------------------------------------

/// Elementwise Bernoulli distribution with success probability `theta`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bernoulli {
    dim: Vec<usize>,
    theta: ArrayD<f64>,
    e: ArrayD<f64>,
}

impl Bernoulli {
    /// Creates a distribution
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape of the variable
    /// * `theta` - Success probability, a scalar or an array broadcastable to `dim`
    /// * `e` - Optional first moment, computed from parameters if absent
    pub fn new(dim: &[usize], theta: impl Into<ParamInit>, e: Option<ArrayD<f64>>) -> NodeResult<Self> {
        let theta = theta.into().materialize("theta", dim)?;
        let e = check_seed(e, "E", dim)?.unwrap_or_else(|| theta.clone());
        Ok(Bernoulli {
            dim: dim.to_vec(),
            theta,
            e,
        })
    }

    #[inline]
    pub fn theta(&self) -> ArrayViewD<'_, f64> {
        self.theta.view()
    }

    #[inline]
    pub fn theta_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.theta.view_mut()
    }
}

impl Distribution for Bernoulli {
    #[inline]
    fn dim(&self) -> &[usize] {
        &self.dim
    }

    #[inline]
    fn update_expectations(&mut self) {
        self.e.assign(&self.theta);
    }
}

// ------------------------------------------------------------------------------------------

/// Parameters of a Bernoulli distribution: `theta`
#[derive(Debug, Clone)]
pub struct BernoulliParameters<'a> {
    pub theta: ArrayViewD<'a, f64>,
}

impl<'a> NamedMoments<'a> for BernoulliParameters<'a> {
    const KEYS: &'static [&'static str] = &["theta"];

    fn to_named(&self) -> NamedArrays<'a> {
        NamedArrays::new().with("theta", self.theta.clone())
    }
}

/// Moments of a Bernoulli distribution: `E`
#[derive(Debug, Clone)]
pub struct BernoulliExpectations<'a> {
    pub e: ArrayViewD<'a, f64>,
}

impl<'a> NamedMoments<'a> for BernoulliExpectations<'a> {
    const KEYS: &'static [&'static str] = &["E"];

    fn to_named(&self) -> NamedArrays<'a> {
        NamedArrays::new().with("E", self.e.clone())
    }
}

impl Family for Bernoulli {
    type Prior = Bernoulli;
    type Parameters<'a> = BernoulliParameters<'a> where Self: 'a;
    type Expectations<'a> = BernoulliExpectations<'a> where Self: 'a;

    const NAME: &'static str = "Bernoulli";

    #[inline]
    fn parameters(&self) -> BernoulliParameters<'_> {
        BernoulliParameters {
            theta: self.theta.view(),
        }
    }

    #[inline]
    fn expectations(&self) -> BernoulliExpectations<'_> {
        BernoulliExpectations { e: self.e.view() }
    }

    #[inline]
    fn expectation(&self) -> ArrayViewD<'_, f64> {
        self.e.view()
    }

    fn neg_kl(&self, prior: &Bernoulli) -> NodeResult<f64> {
        let ptheta = broadcast_view(&prior.theta, "ptheta", &self.dim)?;
        let mut elbo = 0f64;
        Zip::from(&self.theta).and(&ptheta).for_each(|&theta, &ptheta| {
            elbo += bernoulli_cross_term(theta, ptheta) - bernoulli_neg_entropy(theta);
        });
        Ok(elbo)
    }
}

// ------------------------------------------------------------------------------------------

/// A node whose prior and posterior are Bernoulli distributions
///
/// # Notes
///
/// The prior has shape `[1]`, its success probability is shared by all elements
pub type BernoulliNode = UnobservedNode<Bernoulli>;

impl UnobservedNode<Bernoulli> {
    /// Creates a Bernoulli node
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape of the variable
    /// * `ptheta` - Prior success probability shared by all elements
    /// * `qtheta` - Initial posterior success probability
    /// * `qe` - Optional initial posterior first moment
    pub fn new(
        dim: &[usize],
        ptheta: impl Into<ParamInit>,
        qtheta: impl Into<ParamInit>,
        qe: Option<ArrayD<f64>>,
    ) -> NodeResult<Self> {
        let prior = Bernoulli::new(&[1], ptheta, None)?;
        let posterior = Bernoulli::new(dim, qtheta, qe)?;
        Ok(UnobservedNode::from_parts(prior, posterior))
    }
}
