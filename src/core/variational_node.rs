use ndarray::ArrayViewD;
use std::{any::Any, fmt::Debug};

use crate::core::{
    error::NodeResult,
    named::NamedArrays,
    neighbours::Neighbours,
    node::{MarkovBlanket, Node},
};

/// A random variable of a model taking part in coordinate ascent variational inference
///
/// # Notes
///
/// Methods receive [`Neighbours`], a read-only window on all other nodes of a model,
/// through which a node resolves the handles stored in its Markov blanket.
/// A node never sees itself among its neighbours
pub trait VariationalNode: Debug + Send + Sync {
    /// Returns the shared node state
    fn node(&self) -> &Node;

    /// Returns the shared node state mutably
    fn node_mut(&mut self) -> &mut Node;

    /// Name of the distribution family of a node
    fn kind(&self) -> &'static str;

    /// Returns true if a node is fixed to data
    fn is_observed(&self) -> bool {
        false
    }

    /// Contribution of a node to the evidence lower bound
    fn calculate_elbo(&self, _neighbours: &Neighbours) -> NodeResult<f64> {
        Ok(0f64)
    }

    /// Recomputes posterior parameters from the expectations of collaborators
    fn update_parameters(&mut self, _neighbours: &Neighbours) -> NodeResult<()> {
        Ok(())
    }

    /// Recomputes posterior moments from posterior parameters
    fn update_expectations(&mut self) {}

    /// Updates parameters and then moments
    fn update(&mut self, neighbours: &Neighbours) -> NodeResult<()> {
        self.update_parameters(neighbours)?;
        self.update_expectations();
        Ok(())
    }

    /// Current posterior parameters
    fn parameters(&self) -> NamedArrays<'_>;

    /// The moment most collaborators need
    fn expectation(&self) -> ArrayViewD<'_, f64>;

    /// All moments relevant to a node's family
    fn expectations(&self) -> NamedArrays<'_>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    #[inline]
    fn dim(&self) -> &[usize] {
        self.node().dim()
    }

    #[inline]
    fn markov_blanket(&self) -> &MarkovBlanket {
        self.node().markov_blanket()
    }
}
