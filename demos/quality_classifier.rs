//! Regress a good/bad label of simulation outcomes onto the parameters that produced them.
//!
//! A run is "good" when the simulated output lands inside `[-0.5, 0.5]`. The fitted network
//! ends in a sigmoid, so its prediction reads as the probability of a good run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use surrogate_mlp::{Activation, FitConfig, MlpBuilder, SampleSet, fit_regression_net};

fn simulate(theta: [f32; 2], rng: &mut StdRng) -> f32 {
    theta[0] * theta[0] + theta[1] + 0.1 * rng.gen_range(-1.0_f32..1.0)
}

fn main() -> surrogate_mlp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut rng = StdRng::seed_from_u64(7);
    let n = 3_000;
    let mut thetas = Vec::with_capacity(2 * n);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let theta: [f32; 2] = [rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5)];
        let x = simulate(theta, &mut rng);
        labels.push(if x.abs() <= 0.5 { 1.0 } else { 0.0 });
        thetas.extend_from_slice(&theta);
    }
    let good = labels.iter().filter(|&&l| l > 0.5).count();
    println!("{good}/{n} simulations are good");

    let samples = SampleSet::with_scalar_targets(thetas, labels, 2)?;
    let net = MlpBuilder::new(2)?
        .add_layer(32, Activation::ReLU)?
        .add_layer(32, Activation::ReLU)?
        .add_layer(1, Activation::Sigmoid)?
        .build_with_seed(0)?;
    let cfg = FitConfig::default()
        .with_batch_size(64)
        .with_learning_rate(3e-3)
        .with_validation_fraction(0.2)
        .with_stop_after_epochs(15)
        .with_max_epochs(400)
        .with_seed(7);

    let outcome = fit_regression_net(net, &samples, &cfg)?;
    println!(
        "{} epochs, best validation loss {:.5} at epoch {}",
        outcome.report.epochs, outcome.report.best_validation_loss, outcome.report.best_epoch
    );

    for theta in [[0.0_f32, 0.0], [0.0, 1.2], [1.2, 0.0], [0.5, -0.25]] {
        let p = outcome.network.predict(&theta)?[0];
        println!("theta={theta:?} p(good)={p:.2}");
    }
    Ok(())
}
