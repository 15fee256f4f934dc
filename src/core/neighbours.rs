use ndarray::ArrayViewD;

use crate::core::{
    error::{NodeError, NodeResult},
    model::NodeSlot,
    named::NamedArrays,
    node::{MarkovBlanket, NodeId},
    variational_node::VariationalNode,
};

/// Read-only access to every node of a model except one (the owner)
///
/// # Notes
///
/// A model splits its arena around the node being updated, so the owner
/// can be mutated while all other nodes are read
#[derive(Debug, Clone, Copy)]
pub struct Neighbours<'a> {
    owner: NodeId,
    before: &'a [NodeSlot],
    after: &'a [NodeSlot],
    sweep: usize,
}

impl<'a> Neighbours<'a> {
    #[inline(always)]
    pub(crate) fn new(owner: NodeId, before: &'a [NodeSlot], after: &'a [NodeSlot], sweep: usize) -> Self {
        Neighbours {
            owner,
            before,
            after,
            sweep,
        }
    }

    /// Neighbours of a standalone node that is not a member of any model
    #[inline]
    pub fn detached() -> Neighbours<'static> {
        Neighbours {
            owner: NodeId(0),
            before: &[],
            after: &[],
            sweep: 0,
        }
    }

    #[inline(always)]
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Index of the sweep that is currently running
    #[inline(always)]
    pub fn current_sweep(&self) -> usize {
        self.sweep
    }

    /// Total number of nodes, including the owner
    #[inline(always)]
    pub fn model_size(&self) -> usize {
        if self.before.is_empty() && self.after.is_empty() {
            0
        } else {
            self.before.len() + self.after.len() + 1
        }
    }

    #[inline]
    fn slot(&self, id: NodeId) -> NodeResult<&'a NodeSlot> {
        let pos = id.index();
        if pos == self.owner.index() && self.model_size() != 0 {
            return Err(NodeError::SelfReference(pos));
        }
        let slot = if pos < self.owner.index() {
            self.before.get(pos)
        } else {
            pos.checked_sub(self.owner.index() + 1)
                .and_then(|x| self.after.get(x))
        };
        slot.ok_or(NodeError::OutOfRangeNode(self.model_size(), pos))
    }

    /// Returns a node by its handle
    #[inline]
    pub fn get(&self, id: NodeId) -> NodeResult<&'a dyn VariationalNode> {
        Ok(self.slot(id)?.node.as_ref())
    }

    /// Returns the name a node was registered under
    #[inline]
    pub fn name(&self, id: NodeId) -> NodeResult<&'a str> {
        Ok(self.slot(id)?.name.as_str())
    }

    /// Returns the sweep during which a node's moments were refreshed last time,
    /// `None` if they were never refreshed inside a model
    #[inline]
    pub fn refreshed_at(&self, id: NodeId) -> NodeResult<Option<usize>> {
        Ok(self.slot(id)?.refreshed_at)
    }
}

/// Role-aware view on the collaborators of a node
#[derive(Debug, Clone, Copy)]
pub struct BlanketView<'a> {
    blanket: &'a MarkovBlanket,
    neighbours: &'a Neighbours<'a>,
}

impl<'a> BlanketView<'a> {
    #[inline(always)]
    pub fn new(blanket: &'a MarkovBlanket, neighbours: &'a Neighbours<'a>) -> Self {
        BlanketView {
            blanket,
            neighbours,
        }
    }

    #[inline(always)]
    pub fn neighbours(&self) -> &'a Neighbours<'a> {
        self.neighbours
    }

    #[inline(always)]
    pub fn current_sweep(&self) -> usize {
        self.neighbours.current_sweep()
    }

    /// Handles registered under a role
    #[inline]
    pub fn ids(&self, role: &str) -> NodeResult<&'a [NodeId]> {
        match self.blanket.get(role) {
            Some(ids) if !ids.is_empty() => Ok(ids),
            _ => Err(NodeError::MissingRole(role.to_string())),
        }
    }

    /// The first collaborator registered under a role
    #[inline]
    pub fn node(&self, role: &str) -> NodeResult<&'a dyn VariationalNode> {
        self.neighbours.get(self.ids(role)?[0])
    }

    /// All collaborators registered under a role, in registration order
    pub fn nodes(&self, role: &str) -> NodeResult<Vec<&'a dyn VariationalNode>> {
        self.ids(role)?
            .iter()
            .map(|id| self.neighbours.get(*id))
            .collect()
    }

    /// The first collaborator under a role, downcast to its concrete type
    pub fn node_as<T: VariationalNode + 'static>(&self, role: &str) -> NodeResult<&'a T> {
        let node = self.node(role)?;
        node.as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| NodeError::UnexpectedNodeType {
                role: role.to_string(),
                found: node.kind().to_string(),
            })
    }

    #[inline]
    pub fn expectation(&self, role: &str) -> NodeResult<ArrayViewD<'a, f64>> {
        Ok(self.node(role)?.expectation())
    }

    /// Canonical moment of a collaborator, required to have exactly shape `dim`
    pub fn expectation_with_shape(&self, role: &str, dim: &[usize]) -> NodeResult<ArrayViewD<'a, f64>> {
        let expectation = self.expectation(role)?;
        if expectation.shape() != dim {
            return Err(NodeError::ShapeMismatch {
                name: role.to_string(),
                expected: dim.to_vec(),
                found: expectation.shape().to_vec(),
            });
        }
        Ok(expectation)
    }

    #[inline]
    pub fn expectations(&self, role: &str) -> NodeResult<NamedArrays<'a>> {
        Ok(self.node(role)?.expectations())
    }

    /// Returns true if every collaborator under a role refreshed
    /// its moments during the current sweep
    pub fn is_fresh(&self, role: &str) -> NodeResult<bool> {
        for id in self.ids(role)? {
            if self.neighbours.refreshed_at(*id)? != Some(self.current_sweep()) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
