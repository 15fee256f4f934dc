use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use serde::{Deserialize, Serialize};
use special::Gamma as SpecialGamma;

use super::common::gamma_log_density_expectation;
use crate::core::{
    broadcast_view, check_seed, Distribution, Family, NamedArrays, NamedMoments, NodeResult,
    ParamInit, UnobservedNode,
};

// ------------------------------------------------------------------------------------------

/// Elementwise Gamma distribution with shape `a` and rate `b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gamma {
    dim: Vec<usize>,
    a: ArrayD<f64>,
    b: ArrayD<f64>,
    e: ArrayD<f64>,
    ln_e: ArrayD<f64>,
}

impl Gamma {
    /// Creates a distribution
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape of the variable
    /// * `a` - Shape parameter, a scalar or an array broadcastable to `dim`
    /// * `b` - Rate parameter, a scalar or an array broadcastable to `dim`
    /// * `e` - Optional first moment, computed from parameters if absent
    pub fn new(
        dim: &[usize],
        a: impl Into<ParamInit>,
        b: impl Into<ParamInit>,
        e: Option<ArrayD<f64>>,
    ) -> NodeResult<Self> {
        let a = a.into().materialize("a", dim)?;
        let b = b.into().materialize("b", dim)?;
        let e = match check_seed(e, "E", dim)? {
            Some(e) => e,
            None => &a / &b,
        };
        let mut ln_e = ArrayD::zeros(dim);
        Zip::from(&mut ln_e)
            .and(&a)
            .and(&b)
            .for_each(|ln_e, &a, &b| *ln_e = a.digamma() - b.ln());
        Ok(Gamma {
            dim: dim.to_vec(),
            a,
            b,
            e,
            ln_e,
        })
    }

    #[inline]
    pub fn a(&self) -> ArrayViewD<'_, f64> {
        self.a.view()
    }

    #[inline]
    pub fn b(&self) -> ArrayViewD<'_, f64> {
        self.b.view()
    }

    #[inline]
    pub fn a_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.a.view_mut()
    }

    #[inline]
    pub fn b_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.b.view_mut()
    }
}

impl Distribution for Gamma {
    #[inline]
    fn dim(&self) -> &[usize] {
        &self.dim
    }

    fn update_expectations(&mut self) {
        Zip::from(&mut self.e)
            .and(&mut self.ln_e)
            .and(&self.a)
            .and(&self.b)
            .par_for_each(|e, ln_e, &a, &b| {
                *e = a / b;
                *ln_e = a.digamma() - b.ln();
            });
    }
}

// ------------------------------------------------------------------------------------------

/// Parameters of a Gamma distribution: `a` and `b`
#[derive(Debug, Clone)]
pub struct GammaParameters<'a> {
    pub a: ArrayViewD<'a, f64>,
    pub b: ArrayViewD<'a, f64>,
}

impl<'a> NamedMoments<'a> for GammaParameters<'a> {
    const KEYS: &'static [&'static str] = &["a", "b"];

    fn to_named(&self) -> NamedArrays<'a> {
        NamedArrays::new()
            .with("a", self.a.clone())
            .with("b", self.b.clone())
    }
}

/// Moments of a Gamma distribution: `E` and `lnE`
#[derive(Debug, Clone)]
pub struct GammaExpectations<'a> {
    pub e: ArrayViewD<'a, f64>,
    pub ln_e: ArrayViewD<'a, f64>,
}

impl<'a> NamedMoments<'a> for GammaExpectations<'a> {
    const KEYS: &'static [&'static str] = &["E", "lnE"];

    fn to_named(&self) -> NamedArrays<'a> {
        NamedArrays::new()
            .with("E", self.e.clone())
            .with("lnE", self.ln_e.clone())
    }
}

impl Family for Gamma {
    type Prior = Gamma;
    type Parameters<'a> = GammaParameters<'a> where Self: 'a;
    type Expectations<'a> = GammaExpectations<'a> where Self: 'a;

    const NAME: &'static str = "Gamma";

    #[inline]
    fn parameters(&self) -> GammaParameters<'_> {
        GammaParameters {
            a: self.a.view(),
            b: self.b.view(),
        }
    }

    #[inline]
    fn expectations(&self) -> GammaExpectations<'_> {
        GammaExpectations {
            e: self.e.view(),
            ln_e: self.ln_e.view(),
        }
    }

    #[inline]
    fn expectation(&self) -> ArrayViewD<'_, f64> {
        self.e.view()
    }

    fn neg_kl(&self, prior: &Gamma) -> NodeResult<f64> {
        let pa = broadcast_view(&prior.a, "pa", &self.dim)?;
        let pb = broadcast_view(&prior.b, "pb", &self.dim)?;
        let mut elbo = 0f64;
        Zip::from(&self.a)
            .and(&self.b)
            .and(&pa)
            .and(&pb)
            .for_each(|&a, &b, &pa, &pb| {
                let e = a / b;
                let ln_e = a.digamma() - b.ln();
                elbo += gamma_log_density_expectation(pa, pb, e, ln_e)
                    - gamma_log_density_expectation(a, b, e, ln_e);
            });
        Ok(elbo)
    }
}

// ------------------------------------------------------------------------------------------

/// A node whose prior and posterior are Gamma distributions, e.g. a precision
/// or an ARD parameter
///
/// # Notes
///
/// The prior has shape `[1]`, its hyper parameters are shared by all elements
pub type GammaNode = UnobservedNode<Gamma>;

impl UnobservedNode<Gamma> {
    /// Creates a Gamma node
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape of the variable
    /// * `pa`, `pb` - Prior hyper parameters shared by all elements
    /// * `qa`, `qb` - Initial posterior parameters
    /// * `qe` - Optional initial posterior first moment
    ///
    /// # Example
    ///
    /// ```
    /// use cavi_nodes::core::VariationalNode;
    /// use cavi_nodes::families::GammaNode;
    ///
    /// let node = GammaNode::new(&[5], 1., 1., vec![2.; 5], vec![1.; 5], None).unwrap();
    /// assert_eq!(node.prior().a().shape(), &[1]);
    /// assert_eq!(node.parameters().keys(), vec!["a", "b"]);
    /// assert!(node.expectation().iter().all(|&e| e == 2.));
    /// ```
    pub fn new(
        dim: &[usize],
        pa: impl Into<ParamInit>,
        pb: impl Into<ParamInit>,
        qa: impl Into<ParamInit>,
        qb: impl Into<ParamInit>,
        qe: Option<ArrayD<f64>>,
    ) -> NodeResult<Self> {
        let prior = Gamma::new(&[1], pa, pb, None)?;
        let posterior = Gamma::new(dim, qa, qb, qe)?;
        Ok(UnobservedNode::from_parts(prior, posterior))
    }
}
