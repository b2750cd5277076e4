//! Dense layer descriptors.
//!
//! A `Layer` owns no parameters. It records its shape, its activation and where its
//! weights and biases live inside the owning network's flat parameter buffer:
//!
//! `[ W (out_dim * in_dim, row-major) | b (out_dim) ]` starting at `offset`.

use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::{Activation, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Weight initialization scheme.
pub enum Init {
    /// Xavier/Glorot uniform: `U(-sqrt(6 / (in + out)), +sqrt(6 / (in + out)))`.
    Xavier,
    /// He/Kaiming uniform: `U(-sqrt(6 / in), +sqrt(6 / in))`.
    He,
}

impl Init {
    /// Default initializer for an activation.
    pub fn for_activation(act: Activation) -> Self {
        match act {
            Activation::Tanh | Activation::Sigmoid | Activation::Identity => Init::Xavier,
            Activation::ReLU | Activation::LeakyReLU { .. } => Init::He,
        }
    }

    fn limit(self, in_dim: usize, out_dim: usize) -> f32 {
        match self {
            Init::Xavier => (6.0 / (in_dim + out_dim) as f32).sqrt(),
            Init::He => (6.0 / in_dim as f32).sqrt(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    activation: Activation,
    offset: usize,
}

impl Layer {
    pub(crate) fn new(in_dim: usize, out_dim: usize, activation: Activation, offset: usize) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        activation.validate()?;
        Ok(Self {
            in_dim,
            out_dim,
            activation,
            offset,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Number of parameters (weights + biases).
    #[inline]
    pub fn num_parameters(&self) -> usize {
        self.out_dim * self.in_dim + self.out_dim
    }

    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub(crate) fn end(&self) -> usize {
        self.offset + self.num_parameters()
    }

    /// Split this layer's slice of `params` into `(weights, biases)`.
    #[inline]
    pub(crate) fn split<'p>(&self, params: &'p [f32]) -> (&'p [f32], &'p [f32]) {
        params[self.offset..self.end()].split_at(self.out_dim * self.in_dim)
    }

    #[inline]
    pub(crate) fn split_mut<'p>(&self, params: &'p mut [f32]) -> (&'p mut [f32], &'p mut [f32]) {
        params[self.offset..self.end()].split_at_mut(self.out_dim * self.in_dim)
    }

    /// Fill this layer's weights from `init` and zero its biases.
    pub(crate) fn initialize<R: Rng + ?Sized>(&self, init: Init, params: &mut [f32], rng: &mut R) {
        let limit = init.limit(self.in_dim, self.out_dim);
        let dist = Uniform::new_inclusive(-limit, limit);
        let (weights, biases) = self.split_mut(params);
        for w in weights {
            *w = dist.sample(rng);
        }
        biases.fill(0.0);
    }
}
