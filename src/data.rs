//! Contiguous sample storage.
//!
//! A `SampleSet` pairs parameter vectors (X, shape `(len, input_dim)`) with regression
//! targets (Y, shape `(len, target_dim)`). Both are stored row-major in flat `f32` buffers
//! so batches can be gathered without per-sample allocations.

use crate::{Error, Result};

/// Parameter vectors and their targets.
///
/// Invariants:
/// - `inputs.len() == len * input_dim`
/// - `targets.len() == len * target_dim`
/// - `input_dim > 0` and `target_dim > 0`
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    inputs: Vec<f32>,
    targets: Vec<f32>,
    len: usize,
    input_dim: usize,
    target_dim: usize,
}

impl SampleSet {
    /// Build a sample set from flat buffers.
    ///
    /// `inputs` is `(len, input_dim)` and `targets` is `(len, target_dim)`.
    pub fn from_flat(
        inputs: Vec<f32>,
        targets: Vec<f32>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidShape("input_dim must be > 0".to_owned()));
        }
        if target_dim == 0 {
            return Err(Error::InvalidShape("target_dim must be > 0".to_owned()));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidShape(format!(
                "inputs length {} is not divisible by input_dim {}",
                inputs.len(),
                input_dim
            )));
        }

        let len = inputs.len() / input_dim;
        if targets.len() != len * target_dim {
            return Err(Error::InvalidShape(format!(
                "targets length {} does not match len * target_dim ({} * {})",
                targets.len(),
                len,
                target_dim
            )));
        }

        Ok(Self {
            inputs,
            targets,
            len,
            input_dim,
            target_dim,
        })
    }

    /// Build a sample set with one scalar target per row (`target_dim == 1`).
    pub fn with_scalar_targets(inputs: Vec<f32>, targets: Vec<f32>, input_dim: usize) -> Result<Self> {
        Self::from_flat(inputs, targets, input_dim, 1)
    }

    /// Build a sample set from per-sample rows.
    ///
    /// This copies into contiguous storage.
    pub fn from_rows(inputs: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidShape(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }

        let input_dim = rows_width(inputs, "input")?;
        let target_dim = rows_width(targets, "target")?;

        let inputs = inputs.iter().flatten().copied().collect();
        let targets = targets.iter().flatten().copied().collect();
        Self::from_flat(inputs, targets, input_dim, target_dim)
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    /// Returns the per-sample parameter dimension (D).
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    /// Returns the per-sample target dimension (K).
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    #[inline]
    /// Returns the `idx`-th parameter row.
    ///
    /// Panics if `idx >= len`.
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    #[inline]
    /// Returns the `idx`-th target row.
    ///
    /// Panics if `idx >= len`.
    pub fn target(&self, idx: usize) -> &[f32] {
        let start = idx * self.target_dim;
        &self.targets[start..start + self.target_dim]
    }

    /// Keep only the first `num_rows` samples, in their original order.
    pub fn truncated(&self, num_rows: usize) -> Result<Self> {
        if num_rows > self.len {
            return Err(Error::InvalidConfig(format!(
                "num_train {num_rows} exceeds the {} available samples",
                self.len
            )));
        }

        Ok(Self {
            inputs: self.inputs[..num_rows * self.input_dim].to_vec(),
            targets: self.targets[..num_rows * self.target_dim].to_vec(),
            len: num_rows,
            input_dim: self.input_dim,
            target_dim: self.target_dim,
        })
    }

    /// Copy the rows named by `indices` into `inputs` and `targets` (cleared first).
    pub(crate) fn gather_into(&self, indices: &[usize], inputs: &mut Vec<f32>, targets: &mut Vec<f32>) {
        inputs.clear();
        targets.clear();
        for &idx in indices {
            inputs.extend_from_slice(self.input(idx));
            targets.extend_from_slice(self.target(idx));
        }
    }
}

fn rows_width(rows: &[Vec<f32>], what: &str) -> Result<usize> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if width == 0 {
        return Err(Error::InvalidShape(format!("{what} rows must be non-empty")));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(Error::InvalidShape(format!(
                "{what} row {i} has len {}, expected {width}",
                row.len()
            )));
        }
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_validates_shapes() {
        let ok = SampleSet::from_flat(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0], 2, 1);
        assert!(ok.is_ok());

        let err = SampleSet::from_flat(vec![0.0, 1.0, 2.0], vec![0.0], 2, 1);
        assert!(matches!(err, Err(Error::InvalidShape(_))));
    }

    #[test]
    fn mismatched_row_counts_are_rejected() {
        let xs = vec![vec![0.0, 1.0], vec![2.0, 3.0]];
        let ys = vec![vec![1.0]];
        let err = SampleSet::from_rows(&xs, &ys).unwrap_err();
        assert!(format!("{err}").contains("mismatch"));

        let err = SampleSet::with_scalar_targets(vec![0.0; 6], vec![1.0; 2], 2).unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let xs = vec![vec![0.0, 1.0], vec![2.0]];
        let ys = vec![vec![1.0], vec![0.0]];
        assert!(SampleSet::from_rows(&xs, &ys).is_err());
    }

    #[test]
    fn truncation_keeps_leading_rows_in_order() {
        let data = SampleSet::from_flat(
            (0..10).map(|v| v as f32).collect(),
            (0..5).map(|v| v as f32 * 10.0).collect(),
            2,
            1,
        )
        .unwrap();

        let head = data.truncated(3).unwrap();
        assert_eq!(head.len(), 3);
        assert_eq!(head.input(2), &[4.0, 5.0]);
        assert_eq!(head.target(2), &[20.0]);

        assert!(data.truncated(6).is_err());
    }

    #[test]
    fn gather_copies_selected_rows() {
        let data = SampleSet::from_rows(
            &[vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]],
            &[vec![10.0], vec![20.0], vec![30.0]],
        )
        .unwrap();

        let mut xs = vec![9.0];
        let mut ys = Vec::new();
        data.gather_into(&[2, 0], &mut xs, &mut ys);
        assert_eq!(xs, vec![3.0, 3.0, 1.0, 1.0]);
        assert_eq!(ys, vec![30.0, 10.0]);
    }
}
