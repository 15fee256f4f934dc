use std::{error::Error, fmt::Display};

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Errors that could appear while constructing, wiring or updating variational nodes
pub enum NodeError {
    /// An array does not match (and cannot be broadcast to) the required shape
    ShapeMismatch {
        /// Name of the offending parameter or moment
        name: String,

        /// Required shape
        expected: Vec<usize>,

        /// Shape that was supplied
        found: Vec<usize>,
    },

    /// Length of the prior spike probability does not match the second dimension of a node
    PriorLengthMismatch {
        /// Second dimension of the node
        expected: usize,

        /// Supplied length
        found: usize,
    },

    /// A node dimensionality has an unsupported rank
    InvalidDimension {
        /// Required rank
        expected_rank: usize,

        /// Supplied dimensionality
        dim: Vec<usize>,
    },

    /// A hyper parameter is outside of its domain
    InvalidHyperparameter(String),

    /// A role is absent from the Markov blanket of a node
    MissingRole(String),

    /// A moment or parameter key is absent from a named collection
    MissingMoment(String),

    /// An auxiliary moment would shadow a moment the family computes itself
    ReservedMoment(String),

    /// A collaborator node is not of the requested concrete type
    UnexpectedNodeType {
        /// Role under which the collaborator was looked up
        role: String,

        /// Kind of the collaborator that was found
        found: String,
    },

    /// Index of a node is out of range
    OutOfRangeNode(usize, usize),

    /// A node was put into its own Markov blanket
    SelfReference(usize),

    /// A node name is registered twice
    DuplicateName(String),

    /// No node is registered under a name
    NodeNotFound(String),

    /// An observed node was put into an update schedule
    ObservedInSchedule(usize),

    /// A node appears twice in an update schedule
    DuplicateInSchedule(usize),
}

impl Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::ShapeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "Shape of '{}' is {:?}, it can not be used where shape {:?} is required",
                name, found, expected,
            ),
            NodeError::PriorLengthMismatch { expected, found } => write!(
                f,
                "ptheta dimension mismatch: expected a scalar or {} values, got {}",
                expected, found,
            ),
            NodeError::InvalidDimension { expected_rank, dim } => write!(
                f,
                "Node dimensionality {:?} has rank {}, but rank {} is required",
                dim,
                dim.len(),
                expected_rank,
            ),
            NodeError::InvalidHyperparameter(msg) => write!(f, "Invalid hyper parameter: {}", msg),
            NodeError::MissingRole(role) => {
                write!(f, "Role '{}' is absent from the Markov blanket", role)
            }
            NodeError::MissingMoment(key) => write!(f, "Moment '{}' is not available", key),
            NodeError::ReservedMoment(key) => write!(
                f,
                "Moment '{}' is computed by the distribution and can not be overridden",
                key,
            ),
            NodeError::UnexpectedNodeType { role, found } => write!(
                f,
                "Node under role '{}' has unexpected kind '{}'",
                role, found,
            ),
            NodeError::OutOfRangeNode(size, pos) => write!(
                f,
                "ID (index) of a node {} is out of range of [0..{}] nodes",
                pos, size,
            ),
            NodeError::SelfReference(pos) => write!(
                f,
                "Node {} can not be a member of its own Markov blanket",
                pos,
            ),
            NodeError::DuplicateName(name) => {
                write!(f, "A node named '{}' is already registered", name)
            }
            NodeError::NodeNotFound(name) => write!(f, "No node named '{}'", name),
            NodeError::ObservedInSchedule(pos) => write!(
                f,
                "Node {} is observed and can not be scheduled for updates",
                pos,
            ),
            NodeError::DuplicateInSchedule(pos) => {
                write!(f, "Node {} is scheduled more than once per sweep", pos)
            }
        }
    }
}

impl Error for NodeError {}

/// Result type of node methods
pub type NodeResult<T> = Result<T, NodeError>;
