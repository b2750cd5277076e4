use std::collections::HashSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use surrogate_mlp::split::num_training_examples;
use surrogate_mlp::{EarlyStopping, LoaderConfig, SampleSet, Split, StopReason, data_loaders};

/// Row `i` has input `i` and target `-i`, so batches reveal which rows they hold.
fn indexed(n: usize) -> SampleSet {
    let inputs = (0..n).map(|i| i as f32).collect();
    let targets = (0..n).map(|i| -(i as f32)).collect();
    SampleSet::with_scalar_targets(inputs, targets, 1).unwrap()
}

proptest! {
    #[test]
    fn prop_split_is_a_partition(
        n in 2usize..400,
        vf in 0.01f64..0.95,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let expected_train = num_training_examples(n, vf);
        match Split::random(n, vf, &mut rng) {
            Ok(split) => {
                prop_assert_eq!(split.num_training_examples(), expected_train);
                prop_assert_eq!(split.num_validation_examples(), n - expected_train);

                let train: HashSet<usize> = split.train().iter().copied().collect();
                let validation: HashSet<usize> = split.validation().iter().copied().collect();
                prop_assert_eq!(train.len(), split.num_training_examples());
                prop_assert_eq!(validation.len(), split.num_validation_examples());
                prop_assert!(train.is_disjoint(&validation));
                prop_assert!(train.union(&validation).all(|&i| i < n));
                prop_assert_eq!(train.len() + validation.len(), n);
            }
            Err(_) => prop_assert!(expected_train == 0 || expected_train == n),
        }
    }

    #[test]
    fn prop_batches_stay_inside_their_split(
        n in 10usize..200,
        batch_size in 1usize..32,
        vf in 0.1f64..0.5,
        seed in any::<u64>()
    ) {
        let data = indexed(n);
        let cfg = LoaderConfig { num_train: None, batch_size, validation_fraction: vf };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut loaders = data_loaders(&data, &cfg, &mut rng).unwrap();
        let split = loaders.split();
        let train: HashSet<usize> = split.train().iter().copied().collect();
        let validation: HashSet<usize> = split.validation().iter().copied().collect();

        let mut seen = HashSet::new();
        for batch in loaders.train.epoch(&loaders.data, &mut rng) {
            prop_assert_eq!(batch.len, batch_size);
            for (&x, &y) in batch.inputs.iter().zip(&batch.targets) {
                prop_assert_eq!(y, -x);
                let row = x as usize;
                prop_assert!(train.contains(&row));
                prop_assert!(seen.insert(row));
            }
        }
        prop_assert_eq!(seen.len(), (train.len() / batch_size) * batch_size);

        let val_batch = loaders.validation.batch_size();
        prop_assert_eq!(val_batch, batch_size.min(validation.len()));
        let mut visited = 0;
        for batch in loaders.validation.iter(&loaders.data) {
            prop_assert_eq!(batch.len, val_batch);
            for &x in &batch.inputs {
                prop_assert!(validation.contains(&(x as usize)));
            }
            visited += batch.len;
        }
        prop_assert_eq!(visited, (validation.len() / val_batch) * val_batch);
    }

    #[test]
    fn prop_early_stopping_bounds(
        losses in proptest::collection::vec(0.0f64..10.0, 1..300),
        patience in 0usize..30,
        max_epochs in 0usize..100
    ) {
        let mut es = EarlyStopping::new(patience, max_epochs);
        let mut reason = None;
        for &loss in &losses {
            if let Some(r) = es.observe(loss).stop {
                reason = Some(r);
                break;
            }
        }

        prop_assert!(es.epochs() <= max_epochs + 1);
        let observed = &losses[..es.epochs()];
        let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
        prop_assert_eq!(es.best_loss(), min);
        prop_assert_eq!(observed[es.best_epoch() - 1], min);

        match reason {
            Some(StopReason::Patience) => {
                prop_assert_eq!(es.epochs() - es.best_epoch(), patience);
            }
            Some(StopReason::MaxEpochs) => prop_assert_eq!(es.epochs(), max_epochs + 1),
            None => prop_assert_eq!(es.epochs(), losses.len()),
        }
    }
}
