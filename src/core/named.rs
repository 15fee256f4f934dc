use std::collections::BTreeMap;

use ndarray::{ArrayD, ArrayViewD};

use crate::core::error::{NodeError, NodeResult};

/// Read-only views of a node's arrays keyed by their conventional names
/// (`mean`, `var`, `E`, `lnE`, ...)
#[derive(Debug, Clone, Default)]
pub struct NamedArrays<'a>(BTreeMap<&'a str, ArrayViewD<'a, f64>>);

impl<'a> NamedArrays<'a> {
    #[inline]
    pub fn new() -> Self {
        NamedArrays(BTreeMap::new())
    }

    #[inline]
    pub fn insert(&mut self, key: &'a str, value: ArrayViewD<'a, f64>) {
        self.0.insert(key, value);
    }

    #[inline]
    pub fn with(mut self, key: &'a str, value: ArrayViewD<'a, f64>) -> Self {
        self.insert(key, value);
        self
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&ArrayViewD<'a, f64>> {
        self.0.get(key)
    }

    /// Returns a view by key or `MissingMoment` error if the key is absent
    #[inline]
    pub fn require(&self, key: &str) -> NodeResult<ArrayViewD<'a, f64>> {
        self.0
            .get(key)
            .cloned()
            .ok_or_else(|| NodeError::MissingMoment(key.to_string()))
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys in sorted order
    #[inline]
    pub fn keys(&self) -> Vec<&'a str> {
        self.0.keys().copied().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&&'a str, &ArrayViewD<'a, f64>)> {
        self.0.iter()
    }

    /// Copies all arrays, detaching them from the node
    pub fn to_owned_map(&self) -> BTreeMap<String, ArrayD<f64>> {
        self.0
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_owned()))
            .collect()
    }
}

/// A family-specific bundle of parameters or moments with a fixed key set
pub trait NamedMoments<'a> {
    /// Keys that [`NamedMoments::to_named`] always produces
    const KEYS: &'static [&'static str];

    fn to_named(&self) -> NamedArrays<'a>;
}
