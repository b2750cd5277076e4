//! Model builder.
//!
//! `MlpBuilder` is the way to define the dense network that ships with the crate.
//!
//! It makes model structure explicit (layer sizes + activations) and chooses a
//! default weight initializer per activation:
//!
//! - `tanh` / `sigmoid` / `identity`: Xavier/Glorot
//! - `relu` / `leaky relu`: He/Kaiming

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Init, Layer, Mlp, Result};

#[derive(Debug, Clone, Copy)]
struct LayerSpec {
    out_dim: usize,
    activation: Activation,
    init: Init,
}

#[derive(Debug, Clone)]
/// Builder for an `Mlp`.
///
/// ```rust
/// use surrogate_mlp::{Activation, MlpBuilder};
///
/// # fn main() -> surrogate_mlp::Result<()> {
/// let mlp = MlpBuilder::new(3)?
///     .add_layer(16, Activation::ReLU)?
///     .add_layer(1, Activation::Identity)?
///     .build_with_seed(0)?;
/// # let _ = mlp;
/// # Ok(())
/// # }
/// ```
pub struct MlpBuilder {
    input_dim: usize,
    layers: Vec<LayerSpec>,
}

impl MlpBuilder {
    /// Start building an MLP that accepts parameter vectors of length `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            layers: Vec::new(),
        })
    }

    /// Convenience constructor: `hidden` layers of width `width` with `activation`,
    /// followed by a linear output layer of `output_dim` units.
    pub fn regressor(
        input_dim: usize,
        output_dim: usize,
        width: usize,
        hidden: usize,
        activation: Activation,
    ) -> Result<Self> {
        let mut b = Self::new(input_dim)?;
        for _ in 0..hidden {
            b = b.add_layer(width, activation)?;
        }
        b.add_layer(output_dim, Activation::Identity)
    }

    /// Add a dense layer with `out_dim` outputs, initialized for its activation.
    pub fn add_layer(self, out_dim: usize, activation: Activation) -> Result<Self> {
        self.add_layer_with_init(out_dim, activation, Init::for_activation(activation))
    }

    /// Add a dense layer with an explicit weight initializer.
    pub fn add_layer_with_init(
        mut self,
        out_dim: usize,
        activation: Activation,
        init: Init,
    ) -> Result<Self> {
        if out_dim == 0 {
            return Err(Error::InvalidConfig("layer out_dim must be > 0".to_owned()));
        }
        activation.validate()?;

        self.layers.push(LayerSpec {
            out_dim,
            activation,
            init,
        });
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Mlp> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Mlp> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(
                "mlp must have at least one layer".to_owned(),
            ));
        }

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut in_dim = self.input_dim;
        let mut offset = 0;
        for spec in &self.layers {
            let layer = Layer::new(in_dim, spec.out_dim, spec.activation, offset)?;
            offset = layer.end();
            in_dim = spec.out_dim;
            layers.push(layer);
        }

        let mut params = vec![0.0_f32; offset];
        for (layer, spec) in layers.iter().zip(&self.layers) {
            layer.initialize(spec.init, &mut params, rng);
        }

        Mlp::from_parts(layers, params)
    }
}
