use ndarray::{Array, ArrayBase, ArrayD, ArrayViewD, Data, Dimension, IxDyn};

use crate::core::error::{NodeError, NodeResult};

/// Initial value of a distribution parameter: either a single value
/// shared by all elements or an array broadcastable to the target shape
#[derive(Debug, Clone, PartialEq)]
pub enum ParamInit {
    Scalar(f64),
    Array(ArrayD<f64>),
}

impl From<f64> for ParamInit {
    #[inline]
    fn from(value: f64) -> Self {
        ParamInit::Scalar(value)
    }
}

impl From<Vec<f64>> for ParamInit {
    #[inline]
    fn from(value: Vec<f64>) -> Self {
        ParamInit::Array(Array::from_vec(value).into_dyn())
    }
}

impl From<&[f64]> for ParamInit {
    #[inline]
    fn from(value: &[f64]) -> Self {
        ParamInit::from(value.to_vec())
    }
}

impl<D: Dimension> From<Array<f64, D>> for ParamInit {
    #[inline]
    fn from(value: Array<f64, D>) -> Self {
        ParamInit::Array(value.into_dyn())
    }
}

impl ParamInit {
    /// Number of supplied values (1 for a scalar)
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            ParamInit::Scalar(_) => 1,
            ParamInit::Array(arr) => arr.len(),
        }
    }

    /// Returns true if no values were supplied
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materializes a parameter of the given shape
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the parameter, used in errors
    /// * `dim` - Target shape
    ///
    /// # Notes
    ///
    /// A scalar fills the whole array. An array is broadcast to `dim`
    /// following the usual trailing-axes rules; if that is impossible
    /// the method returns an error
    pub fn materialize(self, name: &str, dim: &[usize]) -> NodeResult<ArrayD<f64>> {
        match self {
            ParamInit::Scalar(value) => Ok(ArrayD::from_elem(IxDyn(dim), value)),
            ParamInit::Array(arr) => {
                if arr.shape() == dim {
                    return Ok(arr.as_standard_layout().into_owned());
                }
                Ok(broadcast_view(&arr, name, dim)?.to_owned())
            }
        }
    }
}

/// Broadcasts a view to `dim`, reporting a shape mismatch under `name`
#[inline]
pub fn broadcast_view<'a, S>(
    arr: &'a ArrayBase<S, IxDyn>,
    name: &str,
    dim: &[usize],
) -> NodeResult<ArrayViewD<'a, f64>>
where
    S: Data<Elem = f64>,
{
    arr.broadcast(IxDyn(dim))
        .ok_or_else(|| NodeError::ShapeMismatch {
            name: name.to_string(),
            expected: dim.to_vec(),
            found: arr.shape().to_vec(),
        })
}

/// Checks that a pre-seeded moment has exactly the node's shape
#[inline]
pub fn check_seed(seed: Option<ArrayD<f64>>, name: &str, dim: &[usize]) -> NodeResult<Option<ArrayD<f64>>> {
    match seed {
        Some(arr) if arr.shape() != dim => Err(NodeError::ShapeMismatch {
            name: name.to_string(),
            expected: dim.to_vec(),
            found: arr.shape().to_vec(),
        }),
        other => Ok(other),
    }
}
