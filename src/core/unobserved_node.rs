use ndarray::ArrayViewD;
use std::{any::Any, fmt::Debug};

use crate::core::{
    distribution::Family,
    error::NodeResult,
    named::{NamedArrays, NamedMoments},
    neighbours::{BlanketView, Neighbours},
    node::Node,
    variational_node::VariationalNode,
};

/// Model-specific closed-form update of a posterior
///
/// # Notes
///
/// A rule reads collaborators through a [`BlanketView`] and writes
/// only the posterior parameters. Moments are refreshed by the node
/// afterwards, so a rule must not rely on them being current
pub trait UpdateRule<Q: Family>: Debug + Send + Sync {
    /// Computes new posterior parameters
    ///
    /// # Arguments
    ///
    /// * `prior` - The node's prior
    /// * `posterior` - The node's posterior, parameters are updated in place
    /// * `blanket` - Collaborators of the node
    fn update_parameters(
        &mut self,
        prior: &Q::Prior,
        posterior: &mut Q,
        blanket: &BlanketView,
    ) -> NodeResult<()>;

    /// Contribution of the node to the evidence lower bound.
    /// Defaults to minus KL divergence between the posterior and the prior
    fn calculate_elbo(&self, prior: &Q::Prior, posterior: &Q, _blanket: &BlanketView) -> NodeResult<f64> {
        posterior.neg_kl(prior)
    }
}

/// A latent variable with a prior `P` and a variational posterior `Q`
#[derive(Debug)]
pub struct UnobservedNode<Q: Family> {
    node: Node,
    prior: Q::Prior,
    posterior: Q,
    rule: Option<Box<dyn UpdateRule<Q>>>,
}

impl<Q: Family> UnobservedNode<Q> {
    /// Assembles a node from an already constructed prior and posterior
    #[inline]
    pub fn from_parts(prior: Q::Prior, posterior: Q) -> Self {
        UnobservedNode {
            node: Node::new(posterior.dim()),
            prior,
            posterior,
            rule: None,
        }
    }

    /// Attaches a closed-form update rule
    #[inline]
    pub fn with_rule(mut self, rule: impl UpdateRule<Q> + 'static) -> Self {
        self.rule = Some(Box::new(rule));
        self
    }

    #[inline]
    pub fn set_rule(&mut self, rule: impl UpdateRule<Q> + 'static) {
        self.rule = Some(Box::new(rule));
    }

    #[inline]
    pub fn has_rule(&self) -> bool {
        self.rule.is_some()
    }

    #[inline(always)]
    pub fn prior(&self) -> &Q::Prior {
        &self.prior
    }

    #[inline(always)]
    pub fn posterior(&self) -> &Q {
        &self.posterior
    }

    /// Mutable access to the posterior; moments go stale until
    /// [`VariationalNode::update_expectations`] runs
    #[inline(always)]
    pub fn posterior_mut(&mut self) -> &mut Q {
        &mut self.posterior
    }

    /// Typed parameters of the posterior
    #[inline]
    pub fn typed_parameters(&self) -> Q::Parameters<'_> {
        self.posterior.parameters()
    }

    /// Typed moments of the posterior
    #[inline]
    pub fn typed_expectations(&self) -> Q::Expectations<'_> {
        self.posterior.expectations()
    }
}

impl<Q: Family> VariationalNode for UnobservedNode<Q> {
    #[inline]
    fn node(&self) -> &Node {
        &self.node
    }

    #[inline]
    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    #[inline]
    fn kind(&self) -> &'static str {
        Q::NAME
    }

    fn calculate_elbo(&self, neighbours: &Neighbours) -> NodeResult<f64> {
        match &self.rule {
            Some(rule) => {
                let blanket = BlanketView::new(self.node.markov_blanket(), neighbours);
                rule.calculate_elbo(&self.prior, &self.posterior, &blanket)
            }
            None => Ok(0f64),
        }
    }

    fn update_parameters(&mut self, neighbours: &Neighbours) -> NodeResult<()> {
        if let Some(rule) = &mut self.rule {
            let blanket = BlanketView::new(self.node.markov_blanket(), neighbours);
            rule.update_parameters(&self.prior, &mut self.posterior, &blanket)?;
        }
        Ok(())
    }

    #[inline]
    fn update_expectations(&mut self) {
        self.posterior.update_expectations()
    }

    #[inline]
    fn parameters(&self) -> NamedArrays<'_> {
        self.posterior.parameters().to_named()
    }

    #[inline]
    fn expectation(&self) -> ArrayViewD<'_, f64> {
        self.posterior.expectation()
    }

    #[inline]
    fn expectations(&self) -> NamedArrays<'_> {
        self.posterior.expectations().to_named()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
