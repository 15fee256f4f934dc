use ndarray::{Array2, Array3, ArrayD, ArrayViewD, ArrayViewMut2, ArrayViewMut3, Axis, Ix2, Ix3};
use serde::{Deserialize, Serialize};

use crate::core::{
    check_seed, Distribution, Family, NamedArrays, NamedMoments, NodeError, NodeResult, ParamInit,
    UnobservedNode,
};

// ------------------------------------------------------------------------------------------

/// N independent D-dimensional Gaussian vectors, a variable of shape (N, D)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultivariateGaussian {
    dim: Vec<usize>,
    mean: Array2<f64>,
    cov: Array3<f64>,
    e: Array2<f64>,
    e2: Array3<f64>,
}

#[inline]
fn shape_error(name: &str, expected: &[usize], found: &[usize]) -> NodeError {
    NodeError::ShapeMismatch {
        name: name.to_string(),
        expected: expected.to_vec(),
        found: found.to_vec(),
    }
}

impl MultivariateGaussian {
    /// Creates a distribution
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape (N, D) of the variable
    /// * `mean` - Mean, a scalar or an array broadcastable to (N, D)
    /// * `cov` - Covariance: a scalar s standing for s * I in each row,
    ///     a (D, D) matrix shared by all rows or a (N, D, D) array
    /// * `e` - Optional first moment of shape (N, D)
    /// * `e2` - Optional second moment of shape (N, D, D)
    pub fn new(
        dim: &[usize],
        mean: impl Into<ParamInit>,
        cov: impl Into<ParamInit>,
        e: Option<ArrayD<f64>>,
        e2: Option<ArrayD<f64>>,
    ) -> NodeResult<Self> {
        if dim.len() != 2 {
            return Err(NodeError::InvalidDimension {
                expected_rank: 2,
                dim: dim.to_vec(),
            });
        }
        let (n, d) = (dim[0], dim[1]);
        let cov_dim = [n, d, d];
        let mean = mean
            .into()
            .materialize("mean", dim)?
            .into_dimensionality::<Ix2>()
            .map_err(|_| shape_error("mean", dim, &[]))?;
        let cov = match cov.into() {
            ParamInit::Scalar(s) => {
                Array3::from_shape_fn(cov_dim, |(_, i, j)| if i == j { s } else { 0f64 })
            }
            other => other
                .materialize("cov", &cov_dim)?
                .into_dimensionality::<Ix3>()
                .map_err(|_| shape_error("cov", &cov_dim, &[]))?,
        };
        let mut distr = MultivariateGaussian {
            dim: dim.to_vec(),
            e: mean.clone(),
            e2: Array3::zeros(cov_dim),
            mean,
            cov,
        };
        if let Some(e) = check_seed(e, "E", dim)? {
            distr.e = e
                .into_dimensionality::<Ix2>()
                .map_err(|_| shape_error("E", dim, &[]))?;
        }
        match check_seed(e2, "E2", &cov_dim)? {
            Some(e2) => {
                distr.e2 = e2
                    .into_dimensionality::<Ix3>()
                    .map_err(|_| shape_error("E2", &cov_dim, &[]))?
            }
            None => distr.update_second_moment(),
        }
        Ok(distr)
    }

    #[inline]
    pub fn mean(&self) -> ArrayViewD<'_, f64> {
        self.mean.view().into_dyn()
    }

    #[inline]
    pub fn cov(&self) -> ArrayViewD<'_, f64> {
        self.cov.view().into_dyn()
    }

    #[inline]
    pub fn mean_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.mean.view_mut()
    }

    #[inline]
    pub fn cov_mut(&mut self) -> ArrayViewMut3<'_, f64> {
        self.cov.view_mut()
    }

    /// E[x x^T] = cov + mean * mean^T per row
    fn update_second_moment(&mut self) {
        let rows = self
            .e2
            .outer_iter_mut()
            .zip(self.cov.outer_iter())
            .zip(self.mean.outer_iter());
        for ((mut e2, cov), mean) in rows {
            let column = mean.view().insert_axis(Axis(1));
            let row = mean.view().insert_axis(Axis(0));
            e2.assign(&(&cov + &column.dot(&row)));
        }
    }
}

impl Distribution for MultivariateGaussian {
    #[inline]
    fn dim(&self) -> &[usize] {
        &self.dim
    }

    fn update_expectations(&mut self) {
        self.e.assign(&self.mean);
        self.update_second_moment();
    }
}

// ------------------------------------------------------------------------------------------

/// Parameters of a multivariate Gaussian: `mean` (N, D) and `cov` (N, D, D)
#[derive(Debug, Clone)]
pub struct MultivariateGaussianParameters<'a> {
    pub mean: ArrayViewD<'a, f64>,
    pub cov: ArrayViewD<'a, f64>,
}

impl<'a> NamedMoments<'a> for MultivariateGaussianParameters<'a> {
    const KEYS: &'static [&'static str] = &["cov", "mean"];

    fn to_named(&self) -> NamedArrays<'a> {
        NamedArrays::new()
            .with("mean", self.mean.clone())
            .with("cov", self.cov.clone())
    }
}

/// Moments of a multivariate Gaussian: `E` (N, D) and `E2` (N, D, D)
#[derive(Debug, Clone)]
pub struct MultivariateGaussianExpectations<'a> {
    pub e: ArrayViewD<'a, f64>,
    pub e2: ArrayViewD<'a, f64>,
}

impl<'a> NamedMoments<'a> for MultivariateGaussianExpectations<'a> {
    const KEYS: &'static [&'static str] = &["E", "E2"];

    fn to_named(&self) -> NamedArrays<'a> {
        NamedArrays::new()
            .with("E", self.e.clone())
            .with("E2", self.e2.clone())
    }
}

impl Family for MultivariateGaussian {
    type Prior = ();
    type Parameters<'a> = MultivariateGaussianParameters<'a> where Self: 'a;
    type Expectations<'a> = MultivariateGaussianExpectations<'a> where Self: 'a;

    const NAME: &'static str = "MultivariateGaussian";

    #[inline]
    fn parameters(&self) -> MultivariateGaussianParameters<'_> {
        MultivariateGaussianParameters {
            mean: self.mean(),
            cov: self.cov(),
        }
    }

    #[inline]
    fn expectations(&self) -> MultivariateGaussianExpectations<'_> {
        MultivariateGaussianExpectations {
            e: self.e.view().into_dyn(),
            e2: self.e2.view().into_dyn(),
        }
    }

    #[inline]
    fn expectation(&self) -> ArrayViewD<'_, f64> {
        self.e.view().into_dyn()
    }

    /// There is no prior to compare against
    #[inline]
    fn neg_kl(&self, _prior: &()) -> NodeResult<f64> {
        Ok(0f64)
    }
}

// ------------------------------------------------------------------------------------------

/// A node with a multivariate Gaussian posterior per row
///
/// # Notes
///
/// The prior is not materialized: no consumer reads it, so it is omitted
pub type MultivariateGaussianNode = UnobservedNode<MultivariateGaussian>;

impl UnobservedNode<MultivariateGaussian> {
    /// Creates a multivariate Gaussian node
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape (N, D) of the variable
    /// * `qmean`, `qcov` - Initial posterior parameters
    /// * `qe`, `qe2` - Optional initial posterior moments
    pub fn new(
        dim: &[usize],
        qmean: impl Into<ParamInit>,
        qcov: impl Into<ParamInit>,
        qe: Option<ArrayD<f64>>,
        qe2: Option<ArrayD<f64>>,
    ) -> NodeResult<Self> {
        let posterior = MultivariateGaussian::new(dim, qmean, qcov, qe, qe2)?;
        Ok(UnobservedNode::from_parts((), posterior))
    }
}
