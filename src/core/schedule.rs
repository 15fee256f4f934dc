use serde::{Deserialize, Serialize};

use crate::core::{
    error::{NodeError, NodeResult},
    model::Model,
    node::NodeId,
};

/// A validated order in which unobserved nodes are updated during one sweep
///
/// # Notes
///
/// The order decides which moments each node reads: a node scheduled
/// later sees moments refreshed earlier in the same sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    order: Vec<NodeId>,
    model_size: usize,
}

impl Schedule {
    /// Validates an update order against a model
    ///
    /// # Arguments
    ///
    /// * `model` - A model the schedule is run on
    /// * `order` - Handles of nodes in update order
    ///
    /// # Notes
    ///
    /// Returns an error if a handle is out of range, refers to an observed node,
    /// or appears more than once
    pub fn new(model: &Model, order: &[NodeId]) -> NodeResult<Self> {
        let mut seen = vec![false; model.len()];
        for id in order {
            let node = model.node(*id)?;
            if node.is_observed() {
                return Err(NodeError::ObservedInSchedule(id.index()));
            }
            if seen[id.index()] {
                return Err(NodeError::DuplicateInSchedule(id.index()));
            }
            seen[id.index()] = true;
        }
        Ok(Schedule {
            order: order.to_vec(),
            model_size: model.len(),
        })
    }

    /// Validates an update order given by node names
    pub fn from_names(model: &Model, names: &[&str]) -> NodeResult<Self> {
        let order = names
            .iter()
            .map(|name| model.id(name))
            .collect::<NodeResult<Vec<_>>>()?;
        Schedule::new(model, &order)
    }

    /// Updates every unobserved node once, in the order nodes were added
    pub fn all_unobserved(model: &Model) -> Self {
        Schedule {
            order: model.unobserved_ids(),
            model_size: model.len(),
        }
    }

    #[inline(always)]
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline(always)]
    pub(crate) fn model_size(&self) -> usize {
        self.model_size
    }
}
