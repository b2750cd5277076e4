use crate::network::Regressor;
use crate::{Device, Error, Layer, Result, matmul};

/// A dense feed-forward network with all parameters in one flat buffer.
///
/// Layout: for each layer in order, `weights (out_dim, in_dim)` row-major followed by
/// `biases (out_dim)`. Gradients produced by [`Regressor::backward_batch`] use the same
/// layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<Layer>,
    params: Vec<f32>,
}

/// Reusable buffers for batched forward/backward passes of an [`Mlp`].
///
/// The outputs of the most recent forward pass live here; `backward_batch` reads them.
#[derive(Debug, Clone)]
pub struct MlpWorkspace {
    device: Device,
    // Post-activation outputs per layer, `(batch, out_dim)`.
    layer_outputs: Vec<Vec<f32>>,
    // Backprop intermediates: gradient w.r.t. the current layer output and its input.
    delta: Vec<f32>,
    delta_prev: Vec<f32>,
}

impl Mlp {
    /// Assemble a network from layer descriptors and a matching parameter buffer.
    pub(crate) fn from_parts(layers: Vec<Layer>, params: Vec<f32>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::InvalidConfig(
                "mlp must have at least one layer".to_owned(),
            ));
        }
        let mut expected_offset = 0;
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[1].in_dim() != pair[0].out_dim() {
                return Err(Error::InvalidShape(format!(
                    "layer {} in_dim {} does not match previous out_dim {}",
                    i + 1,
                    pair[1].in_dim(),
                    pair[0].out_dim()
                )));
            }
        }
        for (i, layer) in layers.iter().enumerate() {
            if layer.offset() != expected_offset {
                return Err(Error::InvalidShape(format!(
                    "layer {i} starts at parameter {}, expected {expected_offset}",
                    layer.offset()
                )));
            }
            expected_offset = layer.end();
        }
        if params.len() != expected_offset {
            return Err(Error::InvalidShape(format!(
                "parameter buffer has {} values, layers need {expected_offset}",
                params.len()
            )));
        }
        if params.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "parameters must contain only finite values".to_owned(),
            ));
        }
        Ok(Self { layers, params })
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Weights and biases of layer `idx`.
    pub fn layer_parameters(&self, idx: usize) -> Option<(&[f32], &[f32])> {
        self.layers.get(idx).map(|layer| layer.split(&self.params))
    }

    /// Shape-checked inference for a single sample.
    pub fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        self.predict_batch(input, Device::Cpu)
    }

    /// Shape-checked inference for a flat `(batch, input_dim)` buffer.
    ///
    /// Returns a flat buffer with shape `(batch, output_dim)`.
    pub fn predict_batch(&self, inputs: &[f32], device: Device) -> Result<Vec<f32>> {
        let in_dim = self.input_dim();
        if inputs.is_empty() || !inputs.len().is_multiple_of(in_dim) {
            return Err(Error::InvalidShape(format!(
                "inputs length {} is not a positive multiple of input_dim {in_dim}",
                inputs.len()
            )));
        }
        let batch_size = inputs.len() / in_dim;
        let mut ws = self.workspace(batch_size, device);
        Ok(self.forward_batch(inputs, batch_size, &mut ws).to_vec())
    }

    #[inline]
    fn last_layer(&self) -> &Layer {
        // `from_parts` rejects empty layer lists.
        &self.layers[self.layers.len() - 1]
    }
}

impl MlpWorkspace {
    fn new(mlp: &Mlp, batch_size: usize, device: Device) -> Self {
        let max_dim = mlp
            .layers
            .iter()
            .map(|l| l.in_dim().max(l.out_dim()))
            .max()
            .unwrap_or(0);
        Self {
            device,
            layer_outputs: mlp
                .layers
                .iter()
                .map(|l| Vec::with_capacity(batch_size * l.out_dim()))
                .collect(),
            delta: Vec::with_capacity(batch_size * max_dim),
            delta_prev: Vec::with_capacity(batch_size * max_dim),
        }
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }
}

impl Regressor for Mlp {
    type Workspace = MlpWorkspace;

    #[inline]
    fn input_dim(&self) -> usize {
        self.layers[0].in_dim()
    }

    #[inline]
    fn output_dim(&self) -> usize {
        self.last_layer().out_dim()
    }

    #[inline]
    fn parameters(&self) -> &[f32] {
        &self.params
    }

    #[inline]
    fn parameters_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    fn workspace(&self, batch_size: usize, device: Device) -> MlpWorkspace {
        MlpWorkspace::new(self, batch_size, device.resolve())
    }

    fn forward_batch<'w>(
        &self,
        inputs: &[f32],
        batch_size: usize,
        ws: &'w mut MlpWorkspace,
    ) -> &'w [f32] {
        assert!(batch_size > 0, "batch_size must be > 0");
        assert_eq!(
            inputs.len(),
            batch_size * self.input_dim(),
            "inputs len {} does not match batch_size * input_dim ({batch_size} * {})",
            inputs.len(),
            self.input_dim()
        );
        assert_eq!(
            ws.layer_outputs.len(),
            self.layers.len(),
            "workspace has {} layer outputs, model has {} layers",
            ws.layer_outputs.len(),
            self.layers.len()
        );

        let device = ws.device;
        for (idx, layer) in self.layers.iter().enumerate() {
            // Borrow the previous output immutably and the current output mutably.
            let (left, right) = ws.layer_outputs.split_at_mut(idx);
            let x: &[f32] = if idx == 0 { inputs } else { &left[idx - 1] };
            let out = &mut right[0];
            out.resize(batch_size * layer.out_dim(), 0.0);

            let (w, b) = layer.split(&self.params);
            let (in_dim, out_dim) = (layer.in_dim(), layer.out_dim());
            matmul::gemm_f32(
                device, batch_size, out_dim, in_dim, 1.0, x, in_dim, 1, w, 1, in_dim, 0.0, out,
                out_dim, 1,
            );
            for row in out.chunks_exact_mut(out_dim) {
                for (v, &bias) in row.iter_mut().zip(b) {
                    *v += bias;
                }
            }
            layer.activation().apply(out);
        }

        ws.layer_outputs[self.layers.len() - 1].as_slice()
    }

    fn backward_batch(
        &self,
        inputs: &[f32],
        batch_size: usize,
        ws: &mut MlpWorkspace,
        d_output: &[f32],
        grads: &mut [f32],
    ) {
        assert_eq!(
            inputs.len(),
            batch_size * self.input_dim(),
            "inputs len {} does not match batch_size * input_dim ({batch_size} * {})",
            inputs.len(),
            self.input_dim()
        );
        assert_eq!(
            d_output.len(),
            batch_size * self.output_dim(),
            "d_output len {} does not match batch_size * output_dim ({batch_size} * {})",
            d_output.len(),
            self.output_dim()
        );
        assert_eq!(
            grads.len(),
            self.params.len(),
            "grads len {} does not match parameter count {}",
            grads.len(),
            self.params.len()
        );

        let MlpWorkspace {
            device,
            layer_outputs,
            delta,
            delta_prev,
        } = ws;
        let device = *device;

        assert_eq!(
            layer_outputs[self.layers.len() - 1].len(),
            d_output.len(),
            "workspace does not hold a forward pass for this batch"
        );

        delta.clear();
        delta.extend_from_slice(d_output);

        for idx in (0..self.layers.len()).rev() {
            let layer = &self.layers[idx];
            let (in_dim, out_dim) = (layer.in_dim(), layer.out_dim());
            let x: &[f32] = if idx == 0 {
                inputs
            } else {
                &layer_outputs[idx - 1]
            };

            // dL/dz from dL/dy.
            layer.activation().backprop(&layer_outputs[idx], delta);

            let (d_w, d_b) = layer.split_mut(grads);
            // dW = dZ^T * X
            matmul::gemm_f32(
                device, out_dim, in_dim, batch_size, 1.0, delta, 1, out_dim, x, in_dim, 1, 0.0,
                d_w, in_dim, 1,
            );
            d_b.fill(0.0);
            for row in delta.chunks_exact(out_dim) {
                for (g, &d) in d_b.iter_mut().zip(row) {
                    *g += d;
                }
            }

            if idx > 0 {
                // dX = dZ * W, which becomes dL/dy of the previous layer.
                let (w, _) = layer.split(&self.params);
                delta_prev.resize(batch_size * in_dim, 0.0);
                matmul::gemm_f32(
                    device, batch_size, in_dim, out_dim, 1.0, delta, out_dim, 1, w, in_dim, 1,
                    0.0, delta_prev, in_dim, 1,
                );
                std::mem::swap(delta, delta_prev);
            }
        }
    }
}
