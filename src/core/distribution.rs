use ndarray::ArrayViewD;
use std::fmt::Debug;

use crate::core::error::NodeResult;
use crate::core::named::NamedMoments;

/// A distribution holding family parameters together with the moments derived from them
pub trait Distribution: Debug + Send + Sync {
    /// Shape of the random variable
    fn dim(&self) -> &[usize];

    /// Recomputes moments from current parameters
    ///
    /// # Notes
    ///
    /// Implementations must not depend on previous moment values,
    /// so calling this method twice in a row gives identical moments
    fn update_expectations(&mut self);
}

/// A distribution family usable as the variational posterior of an unobserved node
pub trait Family: Distribution + Sized + 'static {
    /// Prior kept next to the posterior
    type Prior: Debug + Send + Sync;

    /// Named parameters of the family
    type Parameters<'a>: NamedMoments<'a>
    where
        Self: 'a;

    /// Named moments of the family
    type Expectations<'a>: NamedMoments<'a>
    where
        Self: 'a;

    /// Name of the family
    const NAME: &'static str;

    fn parameters(&self) -> Self::Parameters<'_>;

    fn expectations(&self) -> Self::Expectations<'_>;

    /// The moment most consumers need
    fn expectation(&self) -> ArrayViewD<'_, f64>;

    /// Evaluates E_q[ln p(x)] - E_q[ln q(x)], i.e. minus KL divergence
    /// between the posterior and the prior
    ///
    /// # Arguments
    ///
    /// * `prior` - The prior this posterior is compared against
    fn neg_kl(&self, prior: &Self::Prior) -> NodeResult<f64>;
}
