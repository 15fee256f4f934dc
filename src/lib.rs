/// A module containing general logic of variational nodes and models built from them
pub mod core;
/// A module containing distribution families of variational nodes
pub mod families;

#[cfg(test)]
mod tests;
