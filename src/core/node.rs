use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Handle of a node inside a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Collaborators of a node keyed by role name
///
/// # Notes
///
/// Handles are non-owning. They are resolved through the model arena,
/// so cycles between nodes never imply ownership
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkovBlanket(BTreeMap<String, Vec<NodeId>>);

impl MarkovBlanket {
    #[inline]
    pub fn new() -> Self {
        MarkovBlanket(BTreeMap::new())
    }

    /// Adds collaborators under a role, keeping already registered ones
    pub fn extend(&mut self, role: &str, ids: &[NodeId]) {
        let members = self.0.entry(role.to_string()).or_default();
        for id in ids {
            if !members.contains(id) {
                members.push(*id);
            }
        }
    }

    #[inline]
    pub fn get(&self, role: &str) -> Option<&[NodeId]> {
        self.0.get(role).map(|x| x.as_slice())
    }

    #[inline]
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|x| x.as_str())
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.0.values().any(|ids| ids.contains(&id))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Shared state of every node: shape of the random variable and its Markov blanket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    dim: Vec<usize>,
    markov_blanket: MarkovBlanket,
}

impl Node {
    #[inline]
    pub fn new(dim: &[usize]) -> Self {
        Node {
            dim: dim.to_vec(),
            markov_blanket: MarkovBlanket::new(),
        }
    }

    #[inline(always)]
    pub fn dim(&self) -> &[usize] {
        &self.dim
    }

    #[inline(always)]
    pub fn markov_blanket(&self) -> &MarkovBlanket {
        &self.markov_blanket
    }

    #[inline(always)]
    pub fn markov_blanket_mut(&mut self) -> &mut MarkovBlanket {
        &mut self.markov_blanket
    }
}
