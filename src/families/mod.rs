mod bernoulli;
mod bernoulli_gaussian;
mod common;
mod gamma;
mod gaussian;
mod multivariate_gaussian;

pub use bernoulli::{Bernoulli, BernoulliExpectations, BernoulliNode, BernoulliParameters};
pub use bernoulli_gaussian::{
    BernoulliGaussian, BernoulliGaussianExpectations, BernoulliGaussianNode,
    BernoulliGaussianParameters, SpikePrior,
};
pub use common::{random_normal_initializer, random_uniform_initializer};
pub use gamma::{Gamma, GammaExpectations, GammaNode, GammaParameters};
pub use gaussian::{GaussianExpectations, GaussianParameters, UnivariateGaussian, UnivariateGaussianNode};
pub use multivariate_gaussian::{
    MultivariateGaussian, MultivariateGaussianExpectations, MultivariateGaussianNode,
    MultivariateGaussianParameters,
};
