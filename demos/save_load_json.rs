#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example save_load_json --features serde");
}

#[cfg(feature = "serde")]
fn main() -> surrogate_mlp::Result<()> {
    use surrogate_mlp::{
        Activation, FitConfig, Mlp, MlpBuilder, NetworkState, Regressor, SampleSet,
        fit_regression_net,
    };

    let cfg = FitConfig::from_json_str(
        r#"{"batch_size": 16, "learning_rate": 0.01, "max_epochs": 50, "seed": 0}"#,
    )?;

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for i in 0..160 {
        let x = i as f32 / 80.0 - 1.0;
        xs.push(x);
        ys.push(x * x);
    }
    let samples = SampleSet::with_scalar_targets(xs, ys, 1)?;
    let net = MlpBuilder::regressor(1, 1, 16, 1, Activation::Tanh)?.build_with_seed(0)?;
    let outcome = fit_regression_net(net, &samples, &cfg)?;
    println!("{}", outcome.report.to_json_string_pretty()?);

    std::fs::create_dir_all("target").map_err(|source| surrogate_mlp::Error::Io {
        path: "target".to_owned(),
        source,
    })?;
    let model_path = "target/tmp_surrogate.json";
    let state_path = "target/tmp_surrogate_state.json";
    outcome.network.save_json(model_path)?;
    outcome.network.state().save_json(state_path)?;

    let loaded = Mlp::load_json(model_path)?;
    let mut fresh = MlpBuilder::regressor(1, 1, 16, 1, Activation::Tanh)?.build_with_seed(9)?;
    fresh.load_state(&NetworkState::load_json(state_path)?)?;

    let x = [0.5_f32];
    println!(
        "fitted={:.4} loaded={:.4} restored={:.4}",
        outcome.network.predict(&x)?[0],
        loaded.predict(&x)?[0],
        fresh.predict(&x)?[0]
    );
    Ok(())
}
