use std::collections::{BTreeMap, HashMap};

use log::{debug, trace};
use ndarray::ArrayD;
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::core::{
    error::{NodeError, NodeResult},
    neighbours::Neighbours,
    node::NodeId,
    schedule::Schedule,
    variational_node::VariationalNode,
};

// ------------------------------------------------------------------------------------------

/// A node of a model together with its bookkeeping
#[derive(Debug)]
pub(crate) struct NodeSlot {
    pub(crate) name: String,
    pub(crate) node: Box<dyn VariationalNode>,
    pub(crate) refreshed_at: Option<usize>,
}

/// Fitted state of a single node, detached from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Name the node was registered under
    pub name: String,

    /// Distribution family of the node
    pub kind: String,

    /// Shape of the variable
    pub dim: Vec<usize>,

    /// Posterior parameters
    pub parameters: BTreeMap<String, ArrayD<f64>>,

    /// Posterior moments
    pub expectations: BTreeMap<String, ArrayD<f64>>,
}

// ------------------------------------------------------------------------------------------

/// An arena of variational nodes wired by their Markov blankets
///
/// # Notes
///
/// Nodes are updated one at a time. While a node is updated, it is the
/// only mutable node of the arena, all its collaborators are read-only
#[derive(Debug)]
pub struct Model {
    pub(crate) slots: Vec<NodeSlot>,
    pub(crate) names: HashMap<String, NodeId>,
    pub(crate) sweep: usize,
}

impl Model {
    /// Number of nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of finished sweeps
    #[inline]
    pub fn sweep_count(&self) -> usize {
        self.sweep
    }

    /// Returns the handle of a node by name
    #[inline]
    pub fn id(&self, name: &str) -> NodeResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| NodeError::NodeNotFound(name.to_string()))
    }

    /// Handles of all nodes in the order they were added
    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.slots.len()).map(NodeId)
    }

    /// Handles of all unobserved nodes in the order they were added
    pub fn unobserved_ids(&self) -> Vec<NodeId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.node.is_observed())
            .map(|(pos, _)| NodeId(pos))
            .collect()
    }

    #[inline]
    fn slot(&self, id: NodeId) -> NodeResult<&NodeSlot> {
        self.slots
            .get(id.index())
            .ok_or(NodeError::OutOfRangeNode(self.slots.len(), id.index()))
    }

    #[inline]
    pub fn name(&self, id: NodeId) -> NodeResult<&str> {
        Ok(self.slot(id)?.name.as_str())
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> NodeResult<&dyn VariationalNode> {
        Ok(self.slot(id)?.node.as_ref())
    }

    /// Returns a node downcast to its concrete type
    pub fn get<T: VariationalNode + 'static>(&self, id: NodeId) -> NodeResult<&T> {
        let slot = self.slot(id)?;
        slot.node
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| NodeError::UnexpectedNodeType {
                role: slot.name.clone(),
                found: slot.node.kind().to_string(),
            })
    }

    /// Returns a node downcast to its concrete type, mutably
    pub fn get_mut<T: VariationalNode + 'static>(&mut self, id: NodeId) -> NodeResult<&mut T> {
        let size = self.slots.len();
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(NodeError::OutOfRangeNode(size, id.index()))?;
        let found = slot.node.kind().to_string();
        let role = slot.name.clone();
        slot.node
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(NodeError::UnexpectedNodeType { role, found })
    }

    /// Sweep during which a node's moments were refreshed last time
    #[inline]
    pub fn refreshed_at(&self, id: NodeId) -> NodeResult<Option<usize>> {
        Ok(self.slot(id)?.refreshed_at)
    }

    /// Splits the arena into the node `id` and read-only neighbours
    #[inline]
    fn split(&mut self, id: NodeId) -> NodeResult<(&mut NodeSlot, Neighbours<'_>)> {
        let pos = id.index();
        if pos >= self.slots.len() {
            return Err(NodeError::OutOfRangeNode(self.slots.len(), pos));
        }
        let (before, rest) = self.slots.split_at_mut(pos);
        let (slot, after) = rest
            .split_first_mut()
            .ok_or(NodeError::OutOfRangeNode(pos, pos))?;
        Ok((slot, Neighbours::new(id, before, after, self.sweep)))
    }

    /// Read-only neighbours of the node `id`
    #[inline]
    fn neighbours(&self, id: NodeId) -> NodeResult<(&NodeSlot, Neighbours<'_>)> {
        let pos = id.index();
        let slot = self.slot(id)?;
        let before = &self.slots[..pos];
        let after = &self.slots[pos + 1..];
        Ok((slot, Neighbours::new(id, before, after, self.sweep)))
    }

    /// Recomputes posterior parameters of a node from its collaborators
    pub fn update_parameters(&mut self, id: NodeId) -> NodeResult<()> {
        let (slot, neighbours) = self.split(id)?;
        trace!("updating parameters of '{}' ({})", slot.name, slot.node.kind());
        slot.node.update_parameters(&neighbours)
    }

    /// Recomputes posterior moments of a node from its parameters
    pub fn update_expectations(&mut self, id: NodeId) -> NodeResult<()> {
        let sweep = self.sweep;
        let (slot, _) = self.split(id)?;
        trace!("updating expectations of '{}' ({})", slot.name, slot.node.kind());
        slot.node.update_expectations();
        slot.refreshed_at = Some(sweep);
        Ok(())
    }

    /// Updates parameters and then moments of a node
    pub fn update_node(&mut self, id: NodeId) -> NodeResult<()> {
        let sweep = self.sweep;
        let (slot, neighbours) = self.split(id)?;
        trace!("updating '{}' ({})", slot.name, slot.node.kind());
        slot.node.update(&neighbours)?;
        slot.refreshed_at = Some(sweep);
        Ok(())
    }

    /// Runs one Gauss-Seidel sweep: nodes are updated one by one in the schedule's
    /// order, each reading the freshest moments of its collaborators
    ///
    /// # Arguments
    ///
    /// * `schedule` - Validated update order
    ///
    /// # Notes
    ///
    /// Returns the index of the finished sweep (starts from 1).
    /// If a node fails, the sweep stops there and the error is returned. The sweep
    /// is still counted, since nodes updated before the failure carry its index.
    /// The failing node keeps whatever parameters its rule had written and its
    /// moments are not refreshed
    ///
    /// # Example
    ///
    /// ```
    /// use cavi_nodes::core::{ModelBuilder, Schedule};
    /// use cavi_nodes::families::GammaNode;
    ///
    /// let mut builder = ModelBuilder::new();
    /// let tau = builder
    ///     .add_node("tau", GammaNode::new(&[3], 1., 1., 2., 1., None).unwrap())
    ///     .unwrap();
    /// let mut model = builder.build();
    /// let schedule = Schedule::new(&model, &[tau]).unwrap();
    /// assert_eq!(model.sweep(&schedule).unwrap(), 1);
    /// assert_eq!(model.refreshed_at(tau).unwrap(), Some(1));
    /// ```
    pub fn sweep(&mut self, schedule: &Schedule) -> NodeResult<usize> {
        if schedule.model_size() != self.slots.len() {
            return Err(NodeError::OutOfRangeNode(
                self.slots.len(),
                schedule.model_size().saturating_sub(1),
            ));
        }
        self.sweep += 1;
        for id in schedule.order() {
            self.update_node(*id)?;
        }
        debug!("sweep {} finished, {} nodes updated", self.sweep, schedule.len());
        Ok(self.sweep)
    }

    /// Sums ELBO contributions of the given nodes
    ///
    /// # Notes
    ///
    /// Contributions are pure functions of the current state,
    /// so they are evaluated in parallel
    pub fn calculate_elbo(&self, ids: &[NodeId]) -> NodeResult<f64> {
        let terms = ids
            .par_iter()
            .map(|id| {
                let (slot, neighbours) = self.neighbours(*id)?;
                slot.node.calculate_elbo(&neighbours)
            })
            .collect::<NodeResult<Vec<f64>>>()?;
        let elbo: f64 = terms.iter().sum();
        debug!("ELBO over {} nodes: {}", ids.len(), elbo);
        Ok(elbo)
    }

    /// Sums ELBO contributions of all nodes
    #[inline]
    pub fn total_elbo(&self) -> NodeResult<f64> {
        let ids: Vec<_> = self.ids().collect();
        self.calculate_elbo(&ids)
    }

    /// Copies parameters and moments of all nodes
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.slots
            .iter()
            .map(|slot| NodeSnapshot {
                name: slot.name.clone(),
                kind: slot.node.kind().to_string(),
                dim: slot.node.dim().to_vec(),
                parameters: slot.node.parameters().to_owned_map(),
                expectations: slot.node.expectations().to_owned_map(),
            })
            .collect()
    }
}
