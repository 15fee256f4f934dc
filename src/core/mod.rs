mod distribution;
mod error;
mod model;
mod model_builder;
mod named;
mod neighbours;
mod node;
mod observed_node;
mod param;
mod schedule;
mod unobserved_node;
mod variational_node;

pub use distribution::{Distribution, Family};
pub use error::{NodeError, NodeResult};
pub use model::{Model, NodeSnapshot};
pub use model_builder::ModelBuilder;
pub use named::{NamedArrays, NamedMoments};
pub use neighbours::{BlanketView, Neighbours};
pub use node::{MarkovBlanket, Node, NodeId};
pub use observed_node::ObservedNode;
pub use param::{broadcast_view, check_seed, ParamInit};
pub use schedule::Schedule;
pub use unobserved_node::{UnobservedNode, UpdateRule};
pub use variational_node::VariationalNode;
