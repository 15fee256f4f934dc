use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use serde::{Deserialize, Serialize};

use crate::core::{
    broadcast_view, check_seed, Distribution, Family, NamedArrays, NamedMoments, NodeResult,
    ParamInit, UnobservedNode,
};

// ------------------------------------------------------------------------------------------

/// Elementwise univariate Gaussian distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnivariateGaussian {
    dim: Vec<usize>,
    mean: ArrayD<f64>,
    var: ArrayD<f64>,
    e: ArrayD<f64>,
    e2: ArrayD<f64>,
}

impl UnivariateGaussian {
    /// Creates a distribution
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape of the variable
    /// * `mean` - Mean, a scalar or an array broadcastable to `dim`
    /// * `var` - Variance, a scalar or an array broadcastable to `dim`
    /// * `e` - Optional first moment, computed from parameters if absent
    /// * `e2` - Optional second moment, computed from parameters if absent
    pub fn new(
        dim: &[usize],
        mean: impl Into<ParamInit>,
        var: impl Into<ParamInit>,
        e: Option<ArrayD<f64>>,
        e2: Option<ArrayD<f64>>,
    ) -> NodeResult<Self> {
        let mean = mean.into().materialize("mean", dim)?;
        let var = var.into().materialize("var", dim)?;
        let e = check_seed(e, "E", dim)?.unwrap_or_else(|| mean.clone());
        let e2 = match check_seed(e2, "E2", dim)? {
            Some(e2) => e2,
            None => second_moment(&mean, &var),
        };
        Ok(UnivariateGaussian {
            dim: dim.to_vec(),
            mean,
            var,
            e,
            e2,
        })
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
    pub fn mean_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.mean.view_mut()
    }

    #[inline]
    pub fn var_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.var.view_mut()
    }
}

#[inline]
fn second_moment(mean: &ArrayD<f64>, var: &ArrayD<f64>) -> ArrayD<f64> {
    let mut e2 = var.clone();
    Zip::from(&mut e2).and(mean).for_each(|e2, &m| *e2 += m * m);
    e2
}

impl Distribution for UnivariateGaussian {
    #[inline]
    fn dim(&self) -> &[usize] {
        &self.dim
    }

    fn update_expectations(&mut self) {
        self.e.assign(&self.mean);
        Zip::from(&mut self.e2)
            .and(&self.mean)
            .and(&self.var)
            .par_for_each(|e2, &m, &v| *e2 = v + m * m);
    }
}

// ------------------------------------------------------------------------------------------

/// Parameters of a univariate Gaussian: `mean` and `var`
#[derive(Debug, Clone)]
pub struct GaussianParameters<'a> {
    pub mean: ArrayViewD<'a, f64>,
    pub var: ArrayViewD<'a, f64>,
}

impl<'a> NamedMoments<'a> for GaussianParameters<'a> {
    const KEYS: &'static [&'static str] = &["mean", "var"];

    fn to_named(&self) -> NamedArrays<'a> {
        NamedArrays::new()
            .with("mean", self.mean.clone())
            .with("var", self.var.clone())
    }
}

/// Moments of a univariate Gaussian: `E` and `E2`
#[derive(Debug, Clone)]
pub struct GaussianExpectations<'a> {
    pub e: ArrayViewD<'a, f64>,
    pub e2: ArrayViewD<'a, f64>,
}

impl<'a> NamedMoments<'a> for GaussianExpectations<'a> {
    const KEYS: &'static [&'static str] = &["E", "E2"];

    fn to_named(&self) -> NamedArrays<'a> {
        NamedArrays::new()
            .with("E", self.e.clone())
            .with("E2", self.e2.clone())
    }
}

impl Family for UnivariateGaussian {
    type Prior = UnivariateGaussian;
    type Parameters<'a> = GaussianParameters<'a> where Self: 'a;
    type Expectations<'a> = GaussianExpectations<'a> where Self: 'a;

    const NAME: &'static str = "UnivariateGaussian";

    #[inline]
    fn parameters(&self) -> GaussianParameters<'_> {
        GaussianParameters {
            mean: self.mean.view(),
            var: self.var.view(),
        }
    }

    #[inline]
    fn expectations(&self) -> GaussianExpectations<'_> {
        GaussianExpectations {
            e: self.e.view(),
            e2: self.e2.view(),
        }
    }

    #[inline]
    fn expectation(&self) -> ArrayViewD<'_, f64> {
        self.e.view()
    }

    fn neg_kl(&self, prior: &UnivariateGaussian) -> NodeResult<f64> {
        let pmean = broadcast_view(&prior.mean, "pmean", &self.dim)?;
        let pvar = broadcast_view(&prior.var, "pvar", &self.dim)?;
        let mut kl = 0f64;
        Zip::from(&self.mean)
            .and(&self.var)
            .and(&pmean)
            .and(&pvar)
            .for_each(|&m, &v, &pm, &pv| {
                kl += 0.5 * (f64::ln(pv / v) + (v + (m - pm).powi(2)) / pv - 1f64);
            });
        Ok(-kl)
    }
}

// ------------------------------------------------------------------------------------------

/// A node whose prior and posterior are both elementwise univariate Gaussians
pub type UnivariateGaussianNode = UnobservedNode<UnivariateGaussian>;

impl UnobservedNode<UnivariateGaussian> {
    /// Creates a univariate Gaussian node
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape of the variable
    /// * `pmean`, `pvar` - Prior parameters, a scalar shared by all elements or
    ///     an array of shape `dim` (an informative prior)
    /// * `qmean`, `qvar` - Initial posterior parameters
    /// * `qe`, `qe2` - Optional initial posterior moments
    ///
    /// # Example
    ///
    /// ```
    /// use cavi_nodes::core::VariationalNode;
    /// use cavi_nodes::families::UnivariateGaussianNode;
    /// use ndarray::Array2;
    ///
    /// let pmean = Array2::<f64>::zeros((4, 2));
    /// let node = UnivariateGaussianNode::new(&[4, 2], pmean, 1., 0.5, 2., None, None).unwrap();
    /// assert_eq!(node.prior().mean().shape(), &[4, 2]);
    /// assert!(node.expectations().require("E2").unwrap().iter().all(|&e2| e2 == 2.25));
    /// ```
    pub fn new(
        dim: &[usize],
        pmean: impl Into<ParamInit>,
        pvar: impl Into<ParamInit>,
        qmean: impl Into<ParamInit>,
        qvar: impl Into<ParamInit>,
        qe: Option<ArrayD<f64>>,
        qe2: Option<ArrayD<f64>>,
    ) -> NodeResult<Self> {
        let prior = UnivariateGaussian::new(dim, pmean, pvar, None, None)?;
        let posterior = UnivariateGaussian::new(dim, qmean, qvar, qe, qe2)?;
        Ok(UnobservedNode::from_parts(prior, posterior))
    }
}
