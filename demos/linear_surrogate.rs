//! Fit a small network to a noisy linear simulator and report the early-stopping run.
//!
//! Set `RUST_LOG=surrogate_mlp=debug` for per-epoch detail.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use surrogate_mlp::{Activation, Device, FitConfig, MlpBuilder, SampleSet, fit_regression_net};

fn parse_usize(args: &[String], key: &str, default: usize) -> usize {
    let mut i = 0;
    while i + 1 < args.len() {
        if args[i] == key {
            return args[i + 1]
                .parse::<usize>()
                .unwrap_or_else(|_| panic!("failed to parse {key} as usize"));
        }
        i += 1;
    }
    default
}

fn main() -> surrogate_mlp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let num_samples = parse_usize(&args, "--samples", 2_000);
    let num_train = parse_usize(&args, "--num-train", 1_500);
    let max_epochs = parse_usize(&args, "--max-epochs", 300);

    // theta ~ U(-1, 1)^3, x = <w, theta> + 0.05 * noise
    let weights = [1.5_f32, -0.7, 0.3];
    let mut rng = StdRng::seed_from_u64(0);
    let mut thetas = Vec::with_capacity(num_samples * weights.len());
    let mut xs = Vec::with_capacity(num_samples);
    for _ in 0..num_samples {
        let theta: Vec<f32> = (0..weights.len()).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let noise: f32 = rng.gen_range(-1.0..1.0);
        xs.push(theta.iter().zip(&weights).map(|(t, w)| t * w).sum::<f32>() + 0.05 * noise);
        thetas.extend(theta);
    }
    let samples = SampleSet::with_scalar_targets(thetas, xs, weights.len())?;

    let net = MlpBuilder::regressor(weights.len(), 1, 32, 2, Activation::Tanh)?.build_with_seed(1)?;
    let cfg = FitConfig::default()
        .with_num_train(num_train)
        .with_batch_size(50)
        .with_learning_rate(1e-3)
        .with_max_epochs(max_epochs)
        .with_device(Device::best_available())
        .with_seed(2);

    let outcome = fit_regression_net(net, &samples, &cfg)?;
    let report = &outcome.report;
    println!(
        "stopped after {} epochs ({:?}); best validation loss {:.6} at epoch {}",
        report.epochs, report.stop_reason, report.best_validation_loss, report.best_epoch
    );

    for theta in [[0.0_f32, 0.0, 0.0], [0.5, 0.5, -0.5], [-1.0, 0.2, 0.9]] {
        let truth: f32 = theta.iter().zip(&weights).map(|(t, w)| t * w).sum();
        let pred = outcome.network.predict(&theta)?;
        println!("theta={theta:?} truth={truth:.3} pred={:.3}", pred[0]);
    }
    Ok(())
}
