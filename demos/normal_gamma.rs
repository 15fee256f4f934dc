use std::{error::Error, f64::consts::PI, path::PathBuf};

use cavi_nodes::core::{
    BlanketView, Family, ModelBuilder, NodeResult, ObservedNode, Schedule, UpdateRule,
    VariationalNode,
};
use cavi_nodes::families::{Gamma, GammaNode, UnivariateGaussian, UnivariateGaussianNode};
use clap::Parser;
use log::info;
use ndarray::{ArrayD, ArrayViewD};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Prints the default config and exits
    #[arg(long)]
    dump_default_config: bool,

    /// Overrides the number of sweeps
    #[arg(long)]
    sweeps: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct Config {
    // synthetic data
    samples: usize,
    true_mean: f64,
    true_precision: f64,
    seed: u64,
    // hyper parameters of mu ~ N(m0, v0) and tau ~ Gamma(a0, b0)
    m0: f64,
    v0: f64,
    a0: f64,
    b0: f64,
    // stopping criterion
    sweeps: usize,
    tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            samples: 1000,
            true_mean: -1.5,
            true_precision: 4.,
            seed: 42,
            m0: 0.,
            v0: 1e6,
            a0: 1e-3,
            b0: 1e-3,
            sweeps: 100,
            tolerance: 1e-10,
        }
    }
}

// model specific update rules ---------------------------------------------------------------

#[inline]
fn scalar(arr: ArrayViewD<f64>) -> f64 {
    arr.iter().copied().sum()
}

/// sum_i E[(x_i - mu)^2]
fn expected_squared_error(x: ArrayViewD<f64>, blanket: &BlanketView) -> NodeResult<f64> {
    let mu = blanket.expectations("mean")?;
    let (e, e2) = (scalar(mu.require("E")?), scalar(mu.require("E2")?));
    Ok(x.iter().map(|&x| x * x - 2. * x * e + e2).sum())
}

#[derive(Debug)]
struct MeanRule;

impl UpdateRule<UnivariateGaussian> for MeanRule {
    fn update_parameters(
        &mut self,
        prior: &UnivariateGaussian,
        posterior: &mut UnivariateGaussian,
        blanket: &BlanketView,
    ) -> NodeResult<()> {
        let (m0, v0) = (scalar(prior.mean()), scalar(prior.var()));
        let x = blanket.expectation("data")?;
        let tau = scalar(blanket.expectation("precision")?);
        let precision = 1. / v0 + tau * x.len() as f64;
        posterior.mean_mut().fill((m0 / v0 + tau * x.sum()) / precision);
        posterior.var_mut().fill(1. / precision);
        Ok(())
    }
}

#[derive(Debug)]
struct PrecisionRule;

impl UpdateRule<Gamma> for PrecisionRule {
    fn update_parameters(&mut self, prior: &Gamma, posterior: &mut Gamma, blanket: &BlanketView) -> NodeResult<()> {
        let x = blanket.expectation("data")?;
        let sq = expected_squared_error(x.view(), blanket)?;
        posterior.a_mut().fill(scalar(prior.a()) + 0.5 * x.len() as f64);
        posterior.b_mut().fill(scalar(prior.b()) + 0.5 * sq);
        Ok(())
    }

    // the likelihood term is accounted here
    fn calculate_elbo(&self, prior: &Gamma, posterior: &Gamma, blanket: &BlanketView) -> NodeResult<f64> {
        let x = blanket.expectation("data")?;
        let expectations = posterior.expectations();
        let (tau, ln_tau) = (scalar(expectations.e), scalar(expectations.ln_e));
        let sq = expected_squared_error(x.view(), blanket)?;
        let likelihood = 0.5 * x.len() as f64 * (ln_tau - f64::ln(2. * PI)) - 0.5 * tau * sq;
        Ok(posterior.neg_kl(prior)? + likelihood)
    }
}

// ------------------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    if cli.dump_default_config {
        print!("{}", serde_yaml::to_string(&Config::default())?);
        return Ok(());
    }
    let mut config = match cli.config {
        Some(path) => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if let Some(sweeps) = cli.sweeps {
        config.sweeps = sweeps;
    }
    info!("{:?}", config);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let distr = Normal::new(config.true_mean, 1. / config.true_precision.sqrt())?;
    let data = ArrayD::from_shape_simple_fn(vec![config.samples], || distr.sample(&mut rng));

    let mut builder = ModelBuilder::with_capacity(3);
    let x = builder.add_node("x", ObservedNode::from_data(data))?;
    let mu = builder.add_node(
        "mu",
        UnivariateGaussianNode::new(&[1], config.m0, config.v0, 0., 1., None, None)?.with_rule(MeanRule),
    )?;
    let tau = builder.add_node(
        "tau",
        GammaNode::new(&[1], config.a0, config.b0, 1., 1., None)?.with_rule(PrecisionRule),
    )?;
    builder.connect_by_name("mu", "data", &["x"])?;
    builder.connect_by_name("mu", "precision", &["tau"])?;
    builder.connect(tau, "data", &[x])?;
    builder.connect(tau, "mean", &[mu])?;
    let mut model = builder.build();
    let schedule = Schedule::new(&model, &[mu, tau])?;

    let mut elbo = model.total_elbo()?;
    for _ in 0..config.sweeps {
        let sweep = model.sweep(&schedule)?;
        let new_elbo = model.total_elbo()?;
        info!("sweep {}: ELBO = {}", sweep, new_elbo);
        let converged = (new_elbo - elbo).abs() < config.tolerance * new_elbo.abs().max(1.);
        elbo = new_elbo;
        if converged {
            break;
        }
    }
    println!(
        "E[mu] = {}, E[tau] = {} after {} sweeps (true values {} and {})",
        scalar(model.node(mu)?.expectation()),
        scalar(model.node(tau)?.expectation()),
        model.sweep_count(),
        config.true_mean,
        config.true_precision,
    );
    print!("{}", serde_yaml::to_string(&model.snapshot()[1..])?);
    Ok(())
}
