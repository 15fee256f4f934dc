use std::collections::BTreeMap;

use log::debug;
use ndarray::{Array1, ArrayD, ArrayView1, ArrayViewD, ArrayViewMutD, Zip};
use serde::{Deserialize, Serialize};

use super::common::{bernoulli_cross_term, bernoulli_neg_entropy};
use crate::core::{
    check_seed, Distribution, Family, NamedArrays, NamedMoments, NodeError, NodeResult,
    ParamInit, UnobservedNode,
};

/// Moments computed from the distribution's own parameters
const CORE_MOMENTS: &[&str] = &["ES", "ESW", "ESWW"];

// ------------------------------------------------------------------------------------------

/// Prior of a spike-and-slab variable of shape (N, K): only the spike
/// probability per column is kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikePrior {
    theta: Array1<f64>,
}

impl SpikePrior {
    /// Creates a prior
    ///
    /// # Arguments
    ///
    /// * `ptheta` - A scalar (or a single value) shared by all columns, or a vector of
    ///     exactly `columns` values; arrays of rank above 1 are rejected
    /// * `columns` - Second dimension K of the variable
    pub fn new(ptheta: impl Into<ParamInit>, columns: usize) -> NodeResult<Self> {
        let theta = match ptheta.into() {
            ParamInit::Scalar(value) => Array1::from_elem(columns, value),
            ParamInit::Array(arr) if arr.ndim() > 1 => {
                return Err(NodeError::ShapeMismatch {
                    name: "ptheta".to_string(),
                    expected: vec![columns],
                    found: arr.shape().to_vec(),
                })
            }
            ParamInit::Array(arr) => match (arr.len(), arr.iter().next()) {
                (1, Some(&value)) => {
                    debug!("broadcasting a single spike probability to {} columns", columns);
                    Array1::from_elem(columns, value)
                }
                (len, _) if len == columns => arr.iter().copied().collect(),
                (len, _) => {
                    return Err(NodeError::PriorLengthMismatch {
                        expected: columns,
                        found: len,
                    })
                }
            },
        };
        Ok(SpikePrior { theta })
    }

    #[inline]
    pub fn theta(&self) -> ArrayView1<'_, f64> {
        self.theta.view()
    }
}

// ------------------------------------------------------------------------------------------

/// Joint distribution of a Bernoulli spike S and a Gaussian slab W of shape (N, K),
/// q(S = 1) = theta, q(W | S = 1) = N(mean, var)
///
/// # Notes
///
/// Only moments that follow from the distribution's own parameters are computed here:
/// `ES`, `ESW` and `ESWW`. Moments that also depend on other variables
/// (e.g. on an ARD precision through q(W | S = 0)) are supplied by a model's update
/// rule as auxiliary moments and are reported next to the core ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BernoulliGaussian {
    dim: Vec<usize>,
    theta: ArrayD<f64>,
    mean: ArrayD<f64>,
    var: ArrayD<f64>,
    es: ArrayD<f64>,
    esw: ArrayD<f64>,
    esww: ArrayD<f64>,
    auxiliary: BTreeMap<String, ArrayD<f64>>,
}

impl BernoulliGaussian {
    /// Creates a distribution
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape (N, K) of the variable
    /// * `theta` - Spike probability
    /// * `mean` - Slab mean
    /// * `var` - Slab variance
    pub fn new(
        dim: &[usize],
        theta: impl Into<ParamInit>,
        mean: impl Into<ParamInit>,
        var: impl Into<ParamInit>,
    ) -> NodeResult<Self> {
        if dim.len() != 2 {
            return Err(NodeError::InvalidDimension {
                expected_rank: 2,
                dim: dim.to_vec(),
            });
        }
        let mut distr = BernoulliGaussian {
            dim: dim.to_vec(),
            theta: theta.into().materialize("theta", dim)?,
            mean: mean.into().materialize("mean", dim)?,
            var: var.into().materialize("var", dim)?,
            es: ArrayD::zeros(dim),
            esw: ArrayD::zeros(dim),
            esww: ArrayD::zeros(dim),
            auxiliary: BTreeMap::new(),
        };
        distr.update_expectations();
        Ok(distr)
    }

    #[inline]
    pub fn theta(&self) -> ArrayViewD<'_, f64> {
        self.theta.view()
    }

    #[inline]
    pub fn mean(&self) -> ArrayViewD<'_, f64> {
        self.mean.view()
    }

    #[inline]
    pub fn var(&self) -> ArrayViewD<'_, f64> {
        self.var.view()
    }

    #[inline]
    pub fn theta_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.theta.view_mut()
    }

    #[inline]
    pub fn mean_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.mean.view_mut()
    }

    #[inline]
    pub fn var_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.var.view_mut()
    }

    /// Registers (or replaces) a model-specific moment
    ///
    /// # Notes
    ///
    /// The moment must have the shape of the variable. Auxiliary moments are not
    /// touched by [`Distribution::update_expectations`], the rule that registers
    /// them keeps them current
    pub fn set_auxiliary(&mut self, key: &str, value: ArrayD<f64>) -> NodeResult<()> {
        if CORE_MOMENTS.contains(&key) || key == "E" {
            return Err(NodeError::ReservedMoment(key.to_string()));
        }
        if let Some(value) = check_seed(Some(value), key, &self.dim)? {
            self.auxiliary.insert(key.to_string(), value);
        }
        Ok(())
    }

    #[inline]
    pub fn auxiliary(&self, key: &str) -> NodeResult<ArrayViewD<'_, f64>> {
        self.auxiliary
            .get(key)
            .map(|x| x.view())
            .ok_or_else(|| NodeError::MissingMoment(key.to_string()))
    }

    #[inline]
    pub fn remove_auxiliary(&mut self, key: &str) -> Option<ArrayD<f64>> {
        self.auxiliary.remove(key)
    }
}

impl Distribution for BernoulliGaussian {
    #[inline]
    fn dim(&self) -> &[usize] {
        &self.dim
    }

    fn update_expectations(&mut self) {
        self.es.assign(&self.theta);
        Zip::from(&mut self.esw)
            .and(&mut self.esww)
            .and(&self.theta)
            .and(&self.mean)
            .and(&self.var)
            .par_for_each(|esw, esww, &theta, &mean, &var| {
                *esw = theta * mean;
                *esww = theta * (var + mean * mean);
            });
    }
}

// ------------------------------------------------------------------------------------------

/// Parameters of a spike-and-slab distribution: `theta`, `mean` and `var`
#[derive(Debug, Clone)]
pub struct BernoulliGaussianParameters<'a> {
    pub theta: ArrayViewD<'a, f64>,
    pub mean: ArrayViewD<'a, f64>,
    pub var: ArrayViewD<'a, f64>,
}

impl<'a> NamedMoments<'a> for BernoulliGaussianParameters<'a> {
    const KEYS: &'static [&'static str] = &["mean", "theta", "var"];

    fn to_named(&self) -> NamedArrays<'a> {
        NamedArrays::new()
            .with("theta", self.theta.clone())
            .with("mean", self.mean.clone())
            .with("var", self.var.clone())
    }
}

/// Moments of a spike-and-slab distribution: `ES`, `ESW`, `ESWW`
/// and the auxiliary moments registered by a model
#[derive(Debug, Clone)]
pub struct BernoulliGaussianExpectations<'a> {
    pub es: ArrayViewD<'a, f64>,
    pub esw: ArrayViewD<'a, f64>,
    pub esww: ArrayViewD<'a, f64>,
    pub auxiliary: &'a BTreeMap<String, ArrayD<f64>>,
}

impl<'a> NamedMoments<'a> for BernoulliGaussianExpectations<'a> {
    const KEYS: &'static [&'static str] = CORE_MOMENTS;

    fn to_named(&self) -> NamedArrays<'a> {
        let mut named = NamedArrays::new()
            .with("ES", self.es.clone())
            .with("ESW", self.esw.clone())
            .with("ESWW", self.esww.clone());
        for (key, value) in self.auxiliary {
            named.insert(key.as_str(), value.view());
        }
        named
    }
}

impl Family for BernoulliGaussian {
    type Prior = SpikePrior;
    type Parameters<'a> = BernoulliGaussianParameters<'a> where Self: 'a;
    type Expectations<'a> = BernoulliGaussianExpectations<'a> where Self: 'a;

    const NAME: &'static str = "BernoulliGaussian";

    #[inline]
    fn parameters(&self) -> BernoulliGaussianParameters<'_> {
        BernoulliGaussianParameters {
            theta: self.theta.view(),
            mean: self.mean.view(),
            var: self.var.view(),
        }
    }

    #[inline]
    fn expectations(&self) -> BernoulliGaussianExpectations<'_> {
        BernoulliGaussianExpectations {
            es: self.es.view(),
            esw: self.esw.view(),
            esww: self.esww.view(),
            auxiliary: &self.auxiliary,
        }
    }

    /// The joint moment E[S * W]
    #[inline]
    fn expectation(&self) -> ArrayViewD<'_, f64> {
        self.esw.view()
    }

    /// Spike part of the bound only. The slab part depends on the prior
    /// precision of W, which is owned by another node
    fn neg_kl(&self, prior: &SpikePrior) -> NodeResult<f64> {
        let ptheta = prior
            .theta
            .broadcast(self.theta.raw_dim())
            .ok_or_else(|| NodeError::ShapeMismatch {
                name: "ptheta".to_string(),
                expected: self.dim.get(1..).map(|x| x.to_vec()).unwrap_or_default(),
                found: prior.theta.shape().to_vec(),
            })?;
        let mut elbo = 0f64;
        Zip::from(&self.theta).and(&ptheta).for_each(|&theta, &ptheta| {
            elbo += bernoulli_cross_term(theta, ptheta) - bernoulli_neg_entropy(theta);
        });
        Ok(elbo)
    }
}

// ------------------------------------------------------------------------------------------

/// A spike-and-slab node (see Titsias and Lázaro-Gredilla, "Spike and slab
/// variational inference for multi-task and multiple kernel learning")
pub type BernoulliGaussianNode = UnobservedNode<BernoulliGaussian>;

impl UnobservedNode<BernoulliGaussian> {
    /// Creates a spike-and-slab node
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape (N, K) of the variable
    /// * `qmean`, `qvar` - Initial slab parameters of the posterior
    /// * `ptheta` - Prior spike probability: a scalar broadcast over K columns
    ///     or exactly K values
    /// * `qtheta` - Initial posterior spike probability
    ///
    /// # Example
    ///
    /// ```
    /// use cavi_nodes::core::NodeError;
    /// use cavi_nodes::families::BernoulliGaussianNode;
    ///
    /// let node = BernoulliGaussianNode::new(&[10, 3], 0., 1., 0.5, 0.5).unwrap();
    /// assert_eq!(node.prior().theta().to_vec(), vec![0.5; 3]);
    ///
    /// let err = BernoulliGaussianNode::new(&[10, 3], 0., 1., vec![0.5, 0.5], 0.5).unwrap_err();
    /// assert_eq!(err, NodeError::PriorLengthMismatch { expected: 3, found: 2 });
    /// ```
    pub fn new(
        dim: &[usize],
        qmean: impl Into<ParamInit>,
        qvar: impl Into<ParamInit>,
        ptheta: impl Into<ParamInit>,
        qtheta: impl Into<ParamInit>,
    ) -> NodeResult<Self> {
        let posterior = BernoulliGaussian::new(dim, qtheta, qmean, qvar)?;
        let prior = SpikePrior::new(ptheta, dim[1])?;
        Ok(UnobservedNode::from_parts(prior, posterior))
    }
}
