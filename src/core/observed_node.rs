use ndarray::{ArrayD, ArrayViewD};
use std::any::Any;

use crate::core::{
    error::{NodeError, NodeResult},
    named::NamedArrays,
    node::Node,
    variational_node::VariationalNode,
};

/// A variable fixed to observed data
///
/// # Notes
///
/// The data are exposed as the node's expectation, so that collaborators
/// read observed and unobserved variables in the same way. Update hooks
/// keep their no-op defaults, the data never change after construction
#[derive(Debug, Clone)]
pub struct ObservedNode {
    node: Node,
    obs: ArrayD<f64>,
}

impl ObservedNode {
    /// Creates an observed node
    ///
    /// # Arguments
    ///
    /// * `dim` - Shape of the variable
    /// * `obs` - Observations, must have shape `dim`
    ///
    /// # Example
    ///
    /// ```
    /// use cavi_nodes::core::{ObservedNode, VariationalNode};
    /// use ndarray::array;
    ///
    /// let data = array![[1., 2.], [3., 4.]].into_dyn();
    /// let node = ObservedNode::new(&[2, 2], data.clone()).unwrap();
    /// assert_eq!(node.expectation(), data.view());
    /// ```
    pub fn new(dim: &[usize], obs: ArrayD<f64>) -> NodeResult<Self> {
        if obs.shape() != dim {
            return Err(NodeError::ShapeMismatch {
                name: "obs".to_string(),
                expected: dim.to_vec(),
                found: obs.shape().to_vec(),
            });
        }
        Ok(ObservedNode {
            node: Node::new(dim),
            obs,
        })
    }

    /// Creates an observed node taking its shape from the data
    #[inline]
    pub fn from_data(obs: ArrayD<f64>) -> Self {
        ObservedNode {
            node: Node::new(obs.shape()),
            obs,
        }
    }

    #[inline]
    pub fn observations(&self) -> ArrayViewD<'_, f64> {
        self.obs.view()
    }
}

impl VariationalNode for ObservedNode {
    #[inline]
    fn node(&self) -> &Node {
        &self.node
    }

    #[inline]
    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    #[inline]
    fn kind(&self) -> &'static str {
        "Observed"
    }

    #[inline]
    fn is_observed(&self) -> bool {
        true
    }

    #[inline]
    fn parameters(&self) -> NamedArrays<'_> {
        NamedArrays::new()
    }

    #[inline]
    fn expectation(&self) -> ArrayViewD<'_, f64> {
        self.observations()
    }

    #[inline]
    fn expectations(&self) -> NamedArrays<'_> {
        NamedArrays::new().with("E", self.observations())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
