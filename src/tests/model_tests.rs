use std::sync::{Arc, Mutex};

use ndarray::array;

use crate::core::{
    BlanketView, Distribution, ModelBuilder, NodeError, NodeId, NodeResult, ObservedNode,
    Schedule, UpdateRule,
};
use crate::families::{BernoulliNode, Gamma, GammaNode};

use super::utils::{init_logger, scalar};

// Rules that record or copy what a node sees while it is updated ---------------------------------

/// Records whether the collaborator under the role "source" was refreshed in the current sweep
#[derive(Debug, Default)]
struct FreshnessRecorder(Arc<Mutex<Vec<bool>>>);

impl UpdateRule<Gamma> for FreshnessRecorder {
    fn update_parameters(&mut self, _: &Gamma, _: &mut Gamma, blanket: &BlanketView) -> NodeResult<()> {
        let fresh = blanket.is_fresh("source")?;
        self.0.lock().unwrap().push(fresh);
        Ok(())
    }
}

/// Copies the first moment of the collaborator under the role "source" into the shape parameter
#[derive(Debug)]
struct CopySource;

impl UpdateRule<Gamma> for CopySource {
    fn update_parameters(&mut self, _: &Gamma, posterior: &mut Gamma, blanket: &BlanketView) -> NodeResult<()> {
        let source = blanket.expectation_with_shape("source", posterior.dim())?;
        posterior.a_mut().assign(&source);
        Ok(())
    }
}

/// Writes the shape parameter and then fails
#[derive(Debug)]
struct FailAfterWrite;

impl UpdateRule<Gamma> for FailAfterWrite {
    fn update_parameters(&mut self, _: &Gamma, posterior: &mut Gamma, _: &BlanketView) -> NodeResult<()> {
        posterior.a_mut().fill(99.);
        Err(NodeError::MissingMoment("EWW".to_string()))
    }
}

fn gamma(dim: &[usize], qa: f64) -> GammaNode {
    GammaNode::new(dim, 1., 1., qa, 1., None).unwrap()
}

// ------------------------------------------------------------------------------------------

#[test]
fn test_builder_errors() {
    init_logger();
    let mut builder = ModelBuilder::with_capacity(2);
    let a = builder.add_node("a", gamma(&[2], 1.)).unwrap();
    let b = builder.add_node("b", gamma(&[2], 1.)).unwrap();
    assert_eq!(
        builder.add_node("a", gamma(&[2], 1.)),
        Err(NodeError::DuplicateName("a".to_string()))
    );
    assert_eq!(
        builder.connect(a, "source", &[NodeId(5)]),
        Err(NodeError::OutOfRangeNode(2, 5))
    );
    assert_eq!(
        builder.connect(NodeId(3), "source", &[a]),
        Err(NodeError::OutOfRangeNode(2, 3))
    );
    assert_eq!(
        builder.connect(a, "source", &[b, a]),
        Err(NodeError::SelfReference(0))
    );
    assert_eq!(
        builder.connect_by_name("a", "source", &["c"]),
        Err(NodeError::NodeNotFound("c".to_string()))
    );
    builder.connect(a, "source", &[b]).unwrap();
    // a repeated connection does not duplicate the collaborator
    builder.connect_by_name("a", "source", &["b"]).unwrap();
    let model = builder.build();
    assert_eq!(model.node(a).unwrap().markov_blanket().get("source"), Some(&[b][..]));
    assert!(model.node(b).unwrap().markov_blanket().is_empty());
}

#[test]
fn test_model_lookup() {
    let mut builder = ModelBuilder::new();
    let x = builder
        .add_node("x", ObservedNode::from_data(array![1., 2.].into_dyn()))
        .unwrap();
    let s = builder
        .add_node("s", BernoulliNode::new(&[2], 0.5, 0.5, None).unwrap())
        .unwrap();
    let model = builder.build();
    assert_eq!(model.len(), 2);
    assert_eq!(model.id("s"), Ok(s));
    assert_eq!(model.name(x), Ok("x"));
    assert_eq!(model.unobserved_ids(), vec![s]);
    assert!(model.get::<BernoulliNode>(s).is_ok());
    assert_eq!(
        model.get::<GammaNode>(s).unwrap_err(),
        NodeError::UnexpectedNodeType {
            role: "s".to_string(),
            found: "Bernoulli".to_string(),
        }
    );
    assert!(matches!(model.node(NodeId(2)), Err(NodeError::OutOfRangeNode(2, 2))));
    // nodes without update rules do not contribute
    assert_eq!(model.total_elbo(), Ok(0.));
}

#[test]
fn test_schedule_validation() {
    let mut builder = ModelBuilder::new();
    let x = builder
        .add_node("x", ObservedNode::from_data(array![1., 2.].into_dyn()))
        .unwrap();
    let a = builder.add_node("a", gamma(&[2], 1.)).unwrap();
    let b = builder.add_node("b", gamma(&[2], 1.)).unwrap();
    let model = builder.build();
    assert_eq!(
        Schedule::new(&model, &[a, x]),
        Err(NodeError::ObservedInSchedule(0))
    );
    assert_eq!(
        Schedule::new(&model, &[a, b, a]),
        Err(NodeError::DuplicateInSchedule(1))
    );
    assert_eq!(
        Schedule::new(&model, &[NodeId(7)]),
        Err(NodeError::OutOfRangeNode(3, 7))
    );
    assert_eq!(
        Schedule::from_names(&model, &["b", "a"]).unwrap().order(),
        &[b, a]
    );
    assert_eq!(Schedule::all_unobserved(&model).order(), &[a, b]);
}

#[test]
fn test_schedule_of_another_model() {
    let mut builder = ModelBuilder::new();
    builder.add_node("a", gamma(&[2], 1.)).unwrap();
    let small = builder.build();
    let mut builder = ModelBuilder::new();
    builder.add_node("a", gamma(&[2], 1.)).unwrap();
    builder.add_node("b", gamma(&[2], 1.)).unwrap();
    let mut big = builder.build();
    let schedule = Schedule::all_unobserved(&small);
    assert!(big.sweep(&schedule).is_err());
    assert_eq!(big.sweep_count(), 0);
}

#[test]
fn test_missing_role() {
    let mut builder = ModelBuilder::new();
    let a = builder
        .add_node("a", gamma(&[2], 1.).with_rule(CopySource))
        .unwrap();
    let mut model = builder.build();
    let schedule = Schedule::new(&model, &[a]).unwrap();
    assert_eq!(
        model.sweep(&schedule),
        Err(NodeError::MissingRole("source".to_string()))
    );
}

#[test]
fn test_collaborator_shape_is_checked() {
    let mut builder = ModelBuilder::new();
    let source = builder
        .add_node("source", ObservedNode::from_data(array![1., 2., 3.].into_dyn()))
        .unwrap();
    let a = builder
        .add_node("a", gamma(&[2], 1.).with_rule(CopySource))
        .unwrap();
    builder.connect(a, "source", &[source]).unwrap();
    let mut model = builder.build();
    assert_eq!(
        model.update_parameters(a),
        Err(NodeError::ShapeMismatch {
            name: "source".to_string(),
            expected: vec![2],
            found: vec![3],
        })
    );
}

#[test]
fn test_gauss_seidel_order() {
    init_logger();
    let mut builder = ModelBuilder::new();
    let x = builder
        .add_node("x", ObservedNode::from_data(array![4.].into_dyn()))
        .unwrap();
    let a = builder
        .add_node("a", gamma(&[1], 1.).with_rule(CopySource))
        .unwrap();
    let b = builder
        .add_node("b", gamma(&[1], 1.).with_rule(CopySource))
        .unwrap();
    builder.connect(a, "source", &[x]).unwrap();
    builder.connect(b, "source", &[a]).unwrap();
    let mut model = builder.build();

    // b runs first and sees the stale moment of a
    let backward = Schedule::new(&model, &[b, a]).unwrap();
    model.sweep(&backward).unwrap();
    assert_eq!(scalar(model.node(a).unwrap().expectation()), 4.);
    assert_eq!(scalar(model.node(b).unwrap().expectation()), 1.);

    // a runs first, b reads the moment refreshed in the same sweep
    let forward = Schedule::new(&model, &[a, b]).unwrap();
    assert_eq!(model.sweep(&forward), Ok(2));
    assert_eq!(scalar(model.node(b).unwrap().expectation()), 4.);
    assert_eq!(model.refreshed_at(a), Ok(Some(2)));
    assert_eq!(model.refreshed_at(x), Ok(None));
}

#[test]
fn test_freshness() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut builder = ModelBuilder::new();
    let source = builder.add_node("source", gamma(&[1], 1.)).unwrap();
    let reader = builder
        .add_node("reader", gamma(&[1], 1.).with_rule(FreshnessRecorder(seen.clone())))
        .unwrap();
    builder.connect(reader, "source", &[source]).unwrap();
    let mut model = builder.build();

    let reader_first = Schedule::new(&model, &[reader, source]).unwrap();
    let source_first = Schedule::new(&model, &[source, reader]).unwrap();
    let reader_only = Schedule::new(&model, &[reader]).unwrap();
    model.sweep(&reader_first).unwrap();
    model.sweep(&source_first).unwrap();
    model.sweep(&reader_only).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
    assert_eq!(model.refreshed_at(source), Ok(Some(2)));
    assert_eq!(model.refreshed_at(reader), Ok(Some(3)));
}

#[test]
fn test_manual_updates() {
    let mut builder = ModelBuilder::new();
    let a = builder.add_node("a", gamma(&[3], 2.)).unwrap();
    let mut model = builder.build();
    model.get_mut::<GammaNode>(a).unwrap().posterior_mut().a_mut().fill(6.);
    // parameters alone leave the moments stale
    model.update_parameters(a).unwrap();
    assert_eq!(model.refreshed_at(a), Ok(None));
    assert!(model.node(a).unwrap().expectation().iter().all(|&e| e == 2.));
    model.update_expectations(a).unwrap();
    assert_eq!(model.refreshed_at(a), Ok(Some(0)));
    assert!(model.node(a).unwrap().expectation().iter().all(|&e| e == 6.));
}

#[test]
fn test_failed_sweep() {
    let mut builder = ModelBuilder::new();
    let a = builder.add_node("a", gamma(&[2], 2.)).unwrap();
    let b = builder
        .add_node("b", gamma(&[2], 2.).with_rule(FailAfterWrite))
        .unwrap();
    let c = builder.add_node("c", gamma(&[2], 2.)).unwrap();
    let mut model = builder.build();
    let schedule = Schedule::new(&model, &[a, b, c]).unwrap();
    assert_eq!(
        model.sweep(&schedule),
        Err(NodeError::MissingMoment("EWW".to_string()))
    );
    // the sweep is counted, nodes before the failure carry its index
    assert_eq!(model.sweep_count(), 1);
    assert_eq!(model.refreshed_at(a), Ok(Some(1)));
    assert_eq!(model.refreshed_at(b), Ok(None));
    assert_eq!(model.refreshed_at(c), Ok(None));
    // written parameters stay, moments are stale
    let node = model.get::<GammaNode>(b).unwrap();
    assert!(node.posterior().a().iter().all(|&a| a == 99.));
    assert!(node.typed_expectations().e.iter().all(|&e| e == 2.));
}
