use approx::assert_abs_diff_eq;
use ndarray::{array, ArrayD, Axis, Ix3};
use special::Gamma as SpecialGamma;

use crate::core::{
    Distribution, Family, NamedMoments, Neighbours, NodeError, ObservedNode, VariationalNode,
};
use crate::families::{
    BernoulliExpectations, BernoulliGaussian, BernoulliGaussianExpectations, BernoulliGaussianNode,
    BernoulliGaussianParameters, BernoulliNode, BernoulliParameters, Gamma, GammaExpectations,
    GammaNode, GammaParameters, GaussianExpectations, GaussianParameters,
    MultivariateGaussianExpectations, MultivariateGaussianNode, MultivariateGaussianParameters,
    SpikePrior, UnivariateGaussian, UnivariateGaussianNode,
};

use super::utils::init_logger;

// ------------------------------------------------------------------------------------------

fn assert_keys(node: &dyn VariationalNode, parameters: &[&str], expectations: &[&str]) {
    assert_eq!(node.parameters().keys(), parameters.to_vec());
    assert_eq!(node.expectations().keys(), expectations.to_vec());
}

fn assert_idempotent(node: &mut dyn VariationalNode) {
    node.update_expectations();
    let first = node.expectations().to_owned_map();
    node.update_expectations();
    let second = node.expectations().to_owned_map();
    assert_eq!(first, second);
}

// ------------------------------------------------------------------------------------------

#[test]
fn test_key_sets() {
    let ug = UnivariateGaussianNode::new(&[4], 0., 1., 0., 1., None, None).unwrap();
    assert_keys(&ug, GaussianParameters::KEYS, GaussianExpectations::KEYS);
    let mvg = MultivariateGaussianNode::new(&[4, 2], 0., 1., None, None).unwrap();
    assert_keys(
        &mvg,
        MultivariateGaussianParameters::KEYS,
        MultivariateGaussianExpectations::KEYS,
    );
    let gamma = GammaNode::new(&[4], 1., 1., 1., 1., None).unwrap();
    assert_keys(&gamma, GammaParameters::KEYS, GammaExpectations::KEYS);
    let bernoulli = BernoulliNode::new(&[4], 0.5, 0.5, None).unwrap();
    assert_keys(&bernoulli, BernoulliParameters::KEYS, BernoulliExpectations::KEYS);
    let bg = BernoulliGaussianNode::new(&[4, 2], 0., 1., 0.5, 0.5).unwrap();
    assert_keys(
        &bg,
        BernoulliGaussianParameters::KEYS,
        BernoulliGaussianExpectations::KEYS,
    );
    assert_eq!(gamma.expectations().keys(), vec!["E", "lnE"]);
    assert_eq!(bg.parameters().keys(), vec!["mean", "theta", "var"]);
}

#[test]
fn test_update_expectations_is_idempotent() {
    let mut nodes: Vec<Box<dyn VariationalNode>> = vec![
        Box::new(UnivariateGaussianNode::new(&[3], 0., 1., vec![1., 2., 3.], 0.5, None, None).unwrap()),
        Box::new(MultivariateGaussianNode::new(&[2, 2], array![[1., 2.], [3., 4.]], 0.5, None, None).unwrap()),
        Box::new(GammaNode::new(&[3], 1., 1., vec![1., 2., 3.], 2., None).unwrap()),
        Box::new(BernoulliNode::new(&[3], 0.5, vec![0.1, 0.5, 0.9], None).unwrap()),
        Box::new(BernoulliGaussianNode::new(&[2, 3], 1., 2., 0.5, 0.25).unwrap()),
        Box::new(ObservedNode::from_data(array![1., 2.].into_dyn())),
    ];
    for node in nodes.iter_mut() {
        assert_idempotent(node.as_mut());
    }
}

#[test]
fn test_expectations_follow_parameters() {
    let mut node = UnivariateGaussianNode::new(&[2], 0., 1., 0., 1., None, None).unwrap();
    node.posterior_mut().mean_mut().fill(3.);
    node.posterior_mut().var_mut().fill(0.5);
    // stale until refreshed
    assert!(node.expectation().iter().all(|&e| e == 0.));
    node.update_expectations();
    assert!(node.expectation().iter().all(|&e| e == 3.));
    let e2 = node.expectations().require("E2").unwrap();
    assert!(e2.iter().all(|&e2| e2 == 9.5));

    let mut node = MultivariateGaussianNode::new(&[2, 2], 0., 1., None, None).unwrap();
    node.posterior_mut().mean_mut().assign(&array![[1., 2.], [0., -1.]]);
    node.posterior_mut().cov_mut().fill(0.5);
    assert!(node.expectation().iter().all(|&e| e == 0.));
    node.update_expectations();
    assert_eq!(node.expectation(), array![[1., 2.], [0., -1.]].into_dyn().view());
    let e2 = node
        .expectations()
        .require("E2")
        .unwrap()
        .into_dimensionality::<Ix3>()
        .unwrap();
    assert_eq!(e2.index_axis(Axis(0), 0), array![[1.5, 2.5], [2.5, 4.5]]);
    assert_eq!(e2.index_axis(Axis(0), 1), array![[0.5, 0.5], [0.5, 1.5]]);

    let mut node = BernoulliGaussianNode::new(&[3, 2], 2., 1., 0.5, 0.5).unwrap();
    node.posterior_mut().theta_mut().fill(0.25);
    node.update_expectations();
    let expectations = node.typed_expectations();
    assert!(expectations.es.iter().all(|&x| x == 0.25));
    assert!(expectations.esw.iter().all(|&x| x == 0.5));
    assert!(expectations.esww.iter().all(|&x| x == 1.25));
}

#[test]
fn test_seeded_moments() {
    let e = ArrayD::from_elem(vec![3], 7.);
    let node = GammaNode::new(&[3], 1., 1., 2., 1., Some(e.clone())).unwrap();
    assert_eq!(node.expectation(), e.view());
    let err = GammaNode::new(&[3], 1., 1., 2., 1., Some(ArrayD::zeros(vec![2]))).unwrap_err();
    assert_eq!(
        err,
        NodeError::ShapeMismatch {
            name: "E".to_string(),
            expected: vec![3],
            found: vec![2],
        }
    );
}

// ------------------------------------------------------------------------------------------

#[test]
fn test_gamma_node() {
    init_logger();
    let mut node = GammaNode::new(&[5], 1., 1., vec![2.; 5], vec![1.; 5], None).unwrap();
    assert_eq!(node.prior().a().shape(), &[1]);
    let parameters = node.parameters().to_owned_map();
    assert_eq!(parameters["a"], ArrayD::from_elem(vec![5], 2.));
    assert_eq!(parameters["b"], ArrayD::from_elem(vec![5], 1.));
    assert_eq!(node.kind(), "Gamma");
    assert!(!node.is_observed());
    assert_eq!(node.calculate_elbo(&Neighbours::detached()).unwrap(), 0.);
    node.update(&Neighbours::detached()).unwrap();
    let expectations = node.typed_expectations();
    assert_eq!(expectations.e.shape(), &[5]);
    for (&e, &ln_e) in expectations.e.iter().zip(expectations.ln_e.iter()) {
        assert_abs_diff_eq!(e, 2., epsilon = 1e-12);
        assert_abs_diff_eq!(ln_e, 2f64.digamma() - 1f64.ln(), epsilon = 1e-12);
    }
}

#[test]
fn test_gamma_neg_kl() {
    let prior = Gamma::new(&[1], 2., 3., None).unwrap();
    let same = Gamma::new(&[4], 2., 3., None).unwrap();
    assert_abs_diff_eq!(same.neg_kl(&prior).unwrap(), 0., epsilon = 1e-12);
    let other = Gamma::new(&[4], 5., 1., None).unwrap();
    assert!(other.neg_kl(&prior).unwrap() < 0.);
}

#[test]
fn test_bernoulli_node() {
    let node = BernoulliNode::new(&[3], 0.5, vec![0.1, 0.5, 0.9], None).unwrap();
    assert_eq!(node.prior().theta().shape(), &[1]);
    assert_eq!(node.expectation().to_owned(), array![0.1, 0.5, 0.9].into_dyn());
    // q(s) = Bernoulli(0.5) against p(s) = Bernoulli(0.5)
    let uniform = BernoulliNode::new(&[3], 0.5, 0.5, None).unwrap();
    assert_abs_diff_eq!(
        uniform.posterior().neg_kl(uniform.prior()).unwrap(),
        0.,
        epsilon = 1e-12
    );
    // degenerate probabilities do not produce NaNs
    let sharp = BernoulliNode::new(&[2], 0.5, vec![0., 1.], None).unwrap();
    let neg_kl = sharp.posterior().neg_kl(sharp.prior()).unwrap();
    assert_abs_diff_eq!(neg_kl, 2. * 0.5f64.ln(), epsilon = 1e-12);
}

#[test]
fn test_univariate_gaussian_neg_kl() {
    let prior = UnivariateGaussian::new(&[1], 0., 1., None, None).unwrap();
    let posterior = UnivariateGaussian::new(&[3], 1., 1., None, None).unwrap();
    assert_abs_diff_eq!(posterior.neg_kl(&prior).unwrap(), -1.5, epsilon = 1e-12);
    let bad_prior = UnivariateGaussian::new(&[2], 0., 1., None, None).unwrap();
    assert!(matches!(
        posterior.neg_kl(&bad_prior),
        Err(NodeError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_univariate_gaussian_informative_prior() {
    let pmean = array![[1., 2.], [3., 4.], [5., 6.]];
    let node = UnivariateGaussianNode::new(&[3, 2], pmean.clone(), 2., 0., 1., None, None).unwrap();
    assert_eq!(node.prior().mean(), pmean.into_dyn().view());
    assert_eq!(node.prior().var().shape(), &[3, 2]);
    assert_eq!(node.posterior().mean().shape(), &[3, 2]);
    assert_eq!(node.posterior().var().shape(), &[3, 2]);
    // a row of prior means is broadcast over the first axis
    let row = UnivariateGaussianNode::new(&[3, 2], vec![1., 2.], 2., 0., 1., None, None).unwrap();
    assert_eq!(row.prior().mean().shape(), &[3, 2]);
    let err = UnivariateGaussianNode::new(&[3, 2], vec![1., 2., 3.], 2., 0., 1., None, None).unwrap_err();
    assert!(matches!(err, NodeError::ShapeMismatch { ref name, .. } if name == "mean"));
}

#[test]
fn test_multivariate_gaussian_node() {
    let mean = array![[1., 2.], [3., 4.]];
    let node = MultivariateGaussianNode::new(&[2, 2], mean.clone(), 0.5, None, None).unwrap();
    assert_eq!(node.expectation(), mean.into_dyn().view());
    let e2 = node
        .expectations()
        .require("E2")
        .unwrap()
        .into_dimensionality::<Ix3>()
        .unwrap();
    assert_eq!(e2.shape(), &[2, 2, 2]);
    assert_abs_diff_eq!(e2[[0, 0, 0]], 1.5, epsilon = 1e-12);
    assert_abs_diff_eq!(e2[[0, 0, 1]], 2., epsilon = 1e-12);
    assert_abs_diff_eq!(e2[[0, 1, 0]], 2., epsilon = 1e-12);
    assert_abs_diff_eq!(e2[[0, 1, 1]], 4.5, epsilon = 1e-12);
    assert_abs_diff_eq!(e2[[1, 1, 1]], 16.5, epsilon = 1e-12);
    assert_eq!(node.parameters().require("cov").unwrap().shape(), &[2, 2, 2]);
    assert_eq!(node.calculate_elbo(&Neighbours::detached()).unwrap(), 0.);

    let shared_cov = array![[1., 0.5], [0.5, 1.]];
    let node = MultivariateGaussianNode::new(&[3, 2], 0., shared_cov, None, None).unwrap();
    let cov = node.parameters().require("cov").unwrap();
    assert_eq!(cov.shape(), &[3, 2, 2]);
    assert!(cov.iter().all(|&x| x == 1. || x == 0.5));

    let err = MultivariateGaussianNode::new(&[2, 2, 2], 0., 1., None, None).unwrap_err();
    assert_eq!(
        err,
        NodeError::InvalidDimension {
            expected_rank: 2,
            dim: vec![2, 2, 2],
        }
    );
}

// ------------------------------------------------------------------------------------------

#[test]
fn test_spike_prior() {
    assert_eq!(SpikePrior::new(0.3, 4).unwrap().theta().to_vec(), vec![0.3; 4]);
    assert_eq!(SpikePrior::new(vec![0.3], 4).unwrap().theta().to_vec(), vec![0.3; 4]);
    assert_eq!(
        SpikePrior::new(vec![0.1, 0.2, 0.3], 3).unwrap().theta().to_vec(),
        vec![0.1, 0.2, 0.3]
    );
    assert_eq!(
        SpikePrior::new(array![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]], 6).unwrap_err(),
        NodeError::ShapeMismatch {
            name: "ptheta".to_string(),
            expected: vec![6],
            found: vec![2, 3],
        }
    );
    assert_eq!(
        SpikePrior::new(vec![0.1, 0.2], 3).unwrap_err(),
        NodeError::PriorLengthMismatch {
            expected: 3,
            found: 2,
        }
    );
}

#[test]
fn test_bernoulli_gaussian_node() {
    init_logger();
    let node = BernoulliGaussianNode::new(&[10, 3], 2., 1., 0.5, 0.25).unwrap();
    assert_eq!(node.prior().theta().shape(), &[3]);
    assert_eq!(node.kind(), "BernoulliGaussian");
    let expectations = node.typed_expectations();
    assert!(expectations.es.iter().all(|&x| x == 0.25));
    assert!(expectations.esw.iter().all(|&x| x == 0.5));
    assert!(expectations.esww.iter().all(|&x| x == 1.25));
    // the canonical moment is E[S * W]
    assert_eq!(node.expectation(), expectations.esw);

    let err = BernoulliGaussianNode::new(&[10], 2., 1., 0.5, 0.25).unwrap_err();
    assert!(matches!(err, NodeError::InvalidDimension { expected_rank: 2, .. }));
}

#[test]
fn test_bernoulli_gaussian_auxiliary_moments() {
    let mut distr = BernoulliGaussian::new(&[2, 2], 0.5, 1., 1.).unwrap();
    assert_eq!(
        distr.set_auxiliary("ESW", ArrayD::zeros(vec![2, 2])),
        Err(NodeError::ReservedMoment("ESW".to_string()))
    );
    assert_eq!(
        distr.set_auxiliary("EWW", ArrayD::zeros(vec![7, 3])),
        Err(NodeError::ShapeMismatch {
            name: "EWW".to_string(),
            expected: vec![2, 2],
            found: vec![7, 3],
        })
    );
    assert!(!distr.expectations().to_named().contains("EWW"));
    distr
        .set_auxiliary("EWW", ArrayD::from_elem(vec![2, 2], 3.))
        .unwrap();
    assert_eq!(
        distr.expectations().to_named().keys(),
        vec!["ES", "ESW", "ESWW", "EWW"]
    );
    distr.update_expectations();
    assert!(distr.auxiliary("EWW").unwrap().iter().all(|&x| x == 3.));
    assert!(distr.remove_auxiliary("EWW").is_some());
    assert_eq!(
        distr.auxiliary("EWW"),
        Err(NodeError::MissingMoment("EWW".to_string()))
    );
}

#[test]
fn test_bernoulli_gaussian_spike_neg_kl() {
    let node = BernoulliGaussianNode::new(&[4, 2], 0., 1., vec![0.2, 0.7], vec![0.2, 0.7]).unwrap();
    assert_abs_diff_eq!(
        node.posterior().neg_kl(node.prior()).unwrap(),
        0.,
        epsilon = 1e-12
    );
}

// ------------------------------------------------------------------------------------------

#[test]
fn test_observed_node() {
    let data = array![[1., 2., 3.], [4., 5., 6.]].into_dyn();
    let mut node = ObservedNode::new(&[2, 3], data.clone()).unwrap();
    assert!(node.is_observed());
    assert_eq!(node.kind(), "Observed");
    assert!(node.parameters().is_empty());
    assert_eq!(node.expectations().keys(), vec!["E"]);
    node.update(&Neighbours::detached()).unwrap();
    assert_eq!(node.expectation(), node.observations());
    assert_eq!(node.observations(), data.view());
    assert_eq!(node.calculate_elbo(&Neighbours::detached()).unwrap(), 0.);
    assert_eq!(
        ObservedNode::new(&[3, 2], data).unwrap_err(),
        NodeError::ShapeMismatch {
            name: "obs".to_string(),
            expected: vec![3, 2],
            found: vec![2, 3],
        }
    );
}
