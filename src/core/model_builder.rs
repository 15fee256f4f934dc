use std::collections::HashMap;

use log::trace;

use crate::core::{
    error::{NodeError, NodeResult},
    model::{Model, NodeSlot},
    node::NodeId,
    variational_node::VariationalNode,
};

// public methods ---------------------------------------------------------------------------

#[derive(Debug, Default)]
/// Assembles nodes into a model and wires their Markov blankets
pub struct ModelBuilder {
    slots: Vec<NodeSlot>,
    names: HashMap<String, NodeId>,
}

impl ModelBuilder {
    /// Creates an empty builder
    #[inline]
    pub fn new() -> Self {
        ModelBuilder {
            slots: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Creates an empty builder with preallocated memory for nodes
    #[inline]
    pub fn with_capacity(nodes_capacity: usize) -> Self {
        ModelBuilder {
            slots: Vec::with_capacity(nodes_capacity),
            names: HashMap::with_capacity(nodes_capacity),
        }
    }

    /// Adds a node to a model
    ///
    /// # Arguments
    ///
    /// * `name` - Unique name of the node
    /// * `node` - The node
    ///
    /// # Notes
    ///
    /// Returns the handle collaborators use to refer to the node
    ///
    /// # Example
    ///
    /// ```
    /// use cavi_nodes::core::{ModelBuilder, NodeError};
    /// use cavi_nodes::families::BernoulliNode;
    ///
    /// let mut builder = ModelBuilder::new();
    /// let s = BernoulliNode::new(&[3], 0.5, vec![0.1, 0.5, 0.9], None).unwrap();
    /// let id = builder.add_node("S", s).unwrap();
    /// assert_eq!(id.index(), 0);
    ///
    /// let dup = BernoulliNode::new(&[3], 0.5, 0.5, None).unwrap();
    /// assert_eq!(
    ///     builder.add_node("S", dup),
    ///     Err(NodeError::DuplicateName("S".to_string()))
    /// );
    /// ```
    pub fn add_node(&mut self, name: &str, node: impl VariationalNode + 'static) -> NodeResult<NodeId> {
        self.add_boxed(name, Box::new(node))
    }

    /// Adds an already boxed node to a model
    pub fn add_boxed(&mut self, name: &str, node: Box<dyn VariationalNode>) -> NodeResult<NodeId> {
        if self.names.contains_key(name) {
            return Err(NodeError::DuplicateName(name.to_string()));
        }
        let id = NodeId(self.slots.len());
        trace!("adding node '{}' ({}) as {}", name, node.kind(), id);
        self.slots.push(NodeSlot {
            name: name.to_string(),
            node,
            refreshed_at: None,
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Returns the handle of a node by name
    #[inline]
    pub fn id(&self, name: &str) -> NodeResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| NodeError::NodeNotFound(name.to_string()))
    }

    /// Puts collaborators into the Markov blanket of a node under a role
    ///
    /// # Arguments
    ///
    /// * `id` - The node whose blanket is extended
    /// * `role` - Role name the node's update rule looks collaborators up by
    /// * `collaborators` - Handles of collaborators
    ///
    /// # Notes
    ///
    /// If a handle is out of range of the nodes list or refers to the node itself,
    /// the method returns an error and the blanket is left untouched
    pub fn connect(&mut self, id: NodeId, role: &str, collaborators: &[NodeId]) -> NodeResult<()> {
        let size = self.slots.len();
        for collaborator in collaborators {
            if collaborator.index() >= size {
                return Err(NodeError::OutOfRangeNode(size, collaborator.index()));
            }
            if *collaborator == id {
                return Err(NodeError::SelfReference(id.index()));
            }
        }
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(NodeError::OutOfRangeNode(size, id.index()))?;
        trace!("'{}': role '{}' -> {:?}", slot.name, role, collaborators);
        slot.node.node_mut().markov_blanket_mut().extend(role, collaborators);
        Ok(())
    }

    /// Same as [`ModelBuilder::connect`] with nodes referred to by names
    pub fn connect_by_name(&mut self, name: &str, role: &str, collaborators: &[&str]) -> NodeResult<()> {
        let id = self.id(name)?;
        let collaborators = collaborators
            .iter()
            .map(|x| self.id(x))
            .collect::<NodeResult<Vec<_>>>()?;
        self.connect(id, role, &collaborators)
    }

    /// Returns a model
    #[inline]
    pub fn build(self) -> Model {
        Model {
            slots: self.slots,
            names: self.names,
            sweep: 0,
        }
    }
}
