//! Train/validation splitting and minibatch loading.
//!
//! The sample set is truncated to its first `num_train` rows, the row indices are
//! permuted at random, and the permutation is cut into a training part and a validation
//! part. Both loaders read from the same truncated sample set:
//!
//! - training batches are reshuffled every epoch
//! - validation batches keep a fixed order
//!
//! Both drop a trailing partial batch.

use std::slice::ChunksExact;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::{Error, Result, SampleSet};

/// Sizing parameters of a split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderConfig {
    /// Number of leading samples to use; `None` uses every sample.
    pub num_train: Option<usize>,
    pub batch_size: usize,
    pub validation_fraction: f64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            num_train: None,
            batch_size: 100,
            validation_fraction: 0.1,
        }
    }
}

impl LoaderConfig {
    /// Validate everything that does not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.num_train == Some(0) {
            return Err(Error::InvalidConfig("num_train must be > 0".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        let vf = self.validation_fraction;
        if !(vf.is_finite() && (0.0..1.0).contains(&vf)) {
            return Err(Error::InvalidConfig(format!(
                "validation_fraction must be finite and in [0, 1), got {vf}"
            )));
        }
        Ok(())
    }
}

/// Number of training examples for `num_examples` rows: `floor((1 - fraction) * n)`.
#[inline]
pub fn num_training_examples(num_examples: usize, validation_fraction: f64) -> usize {
    ((1.0 - validation_fraction) * num_examples as f64) as usize
}

/// A disjoint partition of `[0, n)` into training and validation indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    train: Vec<usize>,
    validation: Vec<usize>,
}

impl Split {
    /// Draw a fresh random partition of `[0, num_examples)`.
    pub fn random<R: Rng + ?Sized>(
        num_examples: usize,
        validation_fraction: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let num_train = num_training_examples(num_examples, validation_fraction);
        let num_validation = num_examples - num_train;
        if num_validation == 0 {
            return Err(Error::InvalidConfig(format!(
                "validation set is empty: {num_examples} examples with validation_fraction \
                 {validation_fraction} leave no validation examples"
            )));
        }
        if num_train == 0 {
            return Err(Error::InvalidConfig(format!(
                "training set is empty: {num_examples} examples with validation_fraction \
                 {validation_fraction} leave no training examples"
            )));
        }

        let mut permuted: Vec<usize> = (0..num_examples).collect();
        permuted.shuffle(rng);
        let validation = permuted.split_off(num_train);
        Ok(Self {
            train: permuted,
            validation,
        })
    }

    /// Build a split from explicit index lists.
    pub fn from_indices(train: Vec<usize>, validation: Vec<usize>) -> Self {
        Self { train, validation }
    }

    #[inline]
    pub fn train(&self) -> &[usize] {
        &self.train
    }

    #[inline]
    pub fn validation(&self) -> &[usize] {
        &self.validation
    }

    #[inline]
    pub fn num_training_examples(&self) -> usize {
        self.train.len()
    }

    #[inline]
    pub fn num_validation_examples(&self) -> usize {
        self.validation.len()
    }
}

/// Order in which a loader visits its indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Reshuffled at the start of every epoch.
    Shuffled,
    /// Fixed order.
    Sequential,
}

/// Minibatch loader over a subset of a sample set.
///
/// The loader owns its index order. A shuffled loader permutes that order in place at
/// the start of every epoch, so iterating an epoch allocates nothing.
#[derive(Debug, Clone)]
pub struct BatchLoader {
    indices: Vec<usize>,
    batch_size: usize,
    order: Order,
}

impl BatchLoader {
    pub fn new(indices: Vec<usize>, batch_size: usize, order: Order) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        Self {
            indices,
            batch_size,
            order,
        }
    }

    /// Number of examples this loader draws from.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    /// Indices in their current order.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Full batches per epoch (the trailing partial batch is dropped).
    #[inline]
    pub fn num_batches(&self) -> usize {
        self.indices.len() / self.batch_size
    }

    /// Start a new epoch: reshuffle the index order if the loader is shuffled.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.order == Order::Shuffled {
            self.indices.shuffle(rng);
        }
    }

    /// Row indices of each full batch, in the current order.
    #[inline]
    pub fn batches(&self) -> ChunksExact<'_, usize> {
        self.indices.chunks_exact(self.batch_size)
    }

    /// Shuffle (if the order asks for it) and iterate one epoch of gathered batches.
    pub fn epoch<'a, R: Rng + ?Sized>(
        &'a mut self,
        data: &'a SampleSet,
        rng: &mut R,
    ) -> Batches<'a> {
        self.shuffle(rng);
        self.iter(data)
    }

    /// Iterate gathered batches over `data` in the current order.
    ///
    /// Each item owns freshly allocated buffers; hot loops should walk
    /// [`BatchLoader::batches`] and [`Batch::fill`] a reused batch instead.
    pub fn iter<'a>(&'a self, data: &'a SampleSet) -> Batches<'a> {
        Batches {
            data,
            rows: self.batches(),
        }
    }
}

/// One minibatch, gathered into contiguous row-major buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// `(len, input_dim)`
    pub inputs: Vec<f32>,
    /// `(len, target_dim)`
    pub targets: Vec<f32>,
    pub len: usize,
}

impl Batch {
    /// An empty batch with room for `batch_size` rows of `data`.
    pub fn with_capacity(data: &SampleSet, batch_size: usize) -> Self {
        Self {
            inputs: Vec::with_capacity(batch_size * data.input_dim()),
            targets: Vec::with_capacity(batch_size * data.target_dim()),
            len: 0,
        }
    }

    /// Overwrite this batch with the rows of `data` named by `rows`.
    ///
    /// Does not allocate once the buffers have held a batch of this size.
    #[inline]
    pub fn fill(&mut self, data: &SampleSet, rows: &[usize]) {
        data.gather_into(rows, &mut self.inputs, &mut self.targets);
        self.len = rows.len();
    }
}

/// Iterator over one epoch of full batches.
#[derive(Debug)]
pub struct Batches<'a> {
    data: &'a SampleSet,
    rows: ChunksExact<'a, usize>,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let rows = self.rows.next()?;
        let mut batch = Batch::with_capacity(self.data, rows.len());
        batch.fill(self.data, rows);
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for Batches<'_> {}

/// The truncated samples and the two loaders over them.
#[derive(Debug, Clone)]
pub struct DataLoaders {
    pub data: SampleSet,
    pub train: BatchLoader,
    pub validation: BatchLoader,
}

impl DataLoaders {
    /// Wire loaders for an existing split of `data`.
    ///
    /// The validation batch size is `min(batch_size, num_validation_examples)`.
    pub fn from_split(data: SampleSet, split: Split, batch_size: usize) -> Self {
        let val_batch = batch_size.min(split.num_validation_examples()).max(1);
        let Split { train, validation } = split;
        Self {
            data,
            train: BatchLoader::new(train, batch_size, Order::Shuffled),
            validation: BatchLoader::new(validation, val_batch, Order::Sequential),
        }
    }

    #[inline]
    pub fn num_training_examples(&self) -> usize {
        self.train.len()
    }

    #[inline]
    pub fn num_validation_examples(&self) -> usize {
        self.validation.len()
    }

    /// The split these loaders were built from.
    ///
    /// Training indices come back in the loader's current order.
    pub fn split(&self) -> Split {
        Split::from_indices(self.train.indices().to_vec(), self.validation.indices().to_vec())
    }
}

/// Truncate `data` to `cfg.num_train` rows, split at random and build both loaders.
pub fn data_loaders<R: Rng + ?Sized>(
    data: &SampleSet,
    cfg: &LoaderConfig,
    rng: &mut R,
) -> Result<DataLoaders> {
    cfg.validate()?;
    let num_train = cfg.num_train.unwrap_or(data.len());
    if num_train == 0 {
        return Err(Error::InvalidData("sample set must not be empty".to_owned()));
    }
    let data = data.truncated(num_train)?;

    let split = Split::random(num_train, cfg.validation_fraction, rng)?;
    tracing::debug!(
        num_train,
        training = split.num_training_examples(),
        validation = split.num_validation_examples(),
        "split samples"
    );

    let loaders = DataLoaders::from_split(data, split, cfg.batch_size);
    if loaders.train.num_batches() == 0 {
        tracing::warn!(
            training = loaders.num_training_examples(),
            batch_size = cfg.batch_size,
            "training split is smaller than one batch; no optimizer steps will run"
        );
    }
    Ok(loaders)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ramp(n: usize) -> SampleSet {
        SampleSet::with_scalar_targets(
            (0..n).map(|v| v as f32).collect(),
            (0..n).map(|v| v as f32 * 2.0).collect(),
            1,
        )
        .unwrap()
    }

    fn cfg(num_train: usize, batch_size: usize, validation_fraction: f64) -> LoaderConfig {
        LoaderConfig {
            num_train: Some(num_train),
            batch_size,
            validation_fraction,
        }
    }

    #[test]
    fn hundred_samples_ten_percent_validation() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut loaders = data_loaders(&ramp(100), &cfg(100, 10, 0.1), &mut rng).unwrap();

        assert_eq!(loaders.train.order(), Order::Shuffled);
        assert_eq!(loaders.validation.order(), Order::Sequential);
        assert_eq!(loaders.num_training_examples(), 90);
        assert_eq!(loaders.num_validation_examples(), 10);
        assert_eq!(loaders.train.num_batches(), 9);
        assert_eq!(loaders.validation.num_batches(), 1);
        assert_eq!(loaders.train.epoch(&loaders.data, &mut rng).count(), 9);
        assert_eq!(loaders.validation.epoch(&loaders.data, &mut rng).count(), 1);
    }

    #[test]
    fn uses_leading_rows_only() {
        let mut rng = StdRng::seed_from_u64(1);
        let loaders = data_loaders(&ramp(50), &cfg(20, 5, 0.25), &mut rng).unwrap();
        assert_eq!(loaders.data.len(), 20);
        let split = loaders.split();
        assert!(split.train().iter().chain(split.validation()).all(|&i| i < 20));
    }

    #[test]
    fn same_seed_same_split() {
        let data = ramp(64);
        let a = data_loaders(&data, &cfg(64, 8, 0.2), &mut StdRng::seed_from_u64(42)).unwrap();
        let b = data_loaders(&data, &cfg(64, 8, 0.2), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.split(), b.split());
    }

    #[test]
    fn validation_batch_is_capped_by_validation_size() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut loaders = data_loaders(&ramp(30), &cfg(30, 100, 0.1), &mut rng).unwrap();
        assert_eq!(loaders.num_validation_examples(), 3);
        assert_eq!(loaders.validation.batch_size(), 3);
        assert_eq!(loaders.validation.num_batches(), 1);
        // 27 training examples never fill a batch of 100.
        assert_eq!(loaders.train.num_batches(), 0);
        assert_eq!(loaders.train.epoch(&loaders.data, &mut rng).count(), 0);
    }

    #[test]
    fn validation_order_is_fixed_and_partial_batches_dropped() {
        let data = ramp(10);
        let split = Split::from_indices(vec![0, 1, 2, 3, 4, 5, 6], vec![9, 7, 8]);
        let mut loaders = DataLoaders::from_split(data, split, 2);
        let mut rng = StdRng::seed_from_u64(3);

        let batches: Vec<Batch> = loaders.validation.epoch(&loaders.data, &mut rng).collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].inputs, vec![9.0, 7.0]);
        assert_eq!(batches[0].targets, vec![18.0, 14.0]);

        let train: Vec<Batch> = loaders.train.epoch(&loaders.data, &mut rng).collect();
        assert_eq!(train.len(), 3);
        assert!(train.iter().all(|b| b.len == 2 && b.inputs.len() == 2));
    }

    #[test]
    fn training_order_is_reshuffled_each_epoch() {
        let data = ramp(200);
        let split = Split::from_indices((0..190).collect(), (190..200).collect());
        let mut loaders = DataLoaders::from_split(data, split, 190);
        let mut rng = StdRng::seed_from_u64(4);

        let mut epoch_inputs = || -> Vec<f32> {
            loaders
                .train
                .epoch(&loaders.data, &mut rng)
                .flat_map(|b| b.inputs)
                .collect()
        };
        let first = epoch_inputs();
        let second = epoch_inputs();
        assert_ne!(first, second);

        let mut sorted = first.clone();
        sorted.sort_by(f32::total_cmp);
        assert_eq!(sorted, (0..190).map(|v| v as f32).collect::<Vec<_>>());
    }

    #[test]
    fn reused_batch_matches_gathered_batches() {
        let data = ramp(40);
        let split = Split::from_indices((0..30).collect(), (30..40).collect());
        let mut loaders = DataLoaders::from_split(data, split, 4);
        let mut rng = StdRng::seed_from_u64(6);
        loaders.train.shuffle(&mut rng);

        let expected: Vec<Batch> = loaders.train.iter(&loaders.data).collect();
        let mut batch = Batch::with_capacity(&loaders.data, 4);
        let capacity = batch.inputs.capacity();
        for (rows, want) in loaders.train.batches().zip(&expected) {
            batch.fill(&loaders.data, rows);
            assert_eq!(&batch, want);
        }
        assert_eq!(loaders.train.batches().len(), 7);
        assert_eq!(batch.inputs.capacity(), capacity);
    }

    #[test]
    fn rejects_degenerate_configs() {
        let data = ramp(10);
        let mut rng = StdRng::seed_from_u64(5);

        for bad in [
            cfg(0, 2, 0.1),
            cfg(10, 0, 0.1),
            cfg(10, 2, 1.0),
            cfg(10, 2, -0.1),
            cfg(10, 2, f64::NAN),
            cfg(11, 2, 0.1),
            cfg(10, 2, 0.0),
        ] {
            let err = data_loaders(&data, &bad, &mut rng).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)), "{bad:?}: {err}");
        }

        let err = data_loaders(&data, &cfg(10, 2, 0.0), &mut rng).unwrap_err();
        assert!(format!("{err}").contains("validation set is empty"));
    }

    #[test]
    fn training_count_uses_floor() {
        assert_eq!(num_training_examples(100, 0.1), 90);
        assert_eq!(num_training_examples(10, 0.25), 7);
        assert_eq!(num_training_examples(3, 0.5), 1);
    }
}
