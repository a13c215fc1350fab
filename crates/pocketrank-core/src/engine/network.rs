//! Affinity model: a residual graph convolution over each molecule followed
//! by a distance-filtered ligand/pocket interaction sum.
//!
//! Zero-padded atoms stay exactly zero through every layer (the embedding and
//! projection carry no bias and padded adjacency rows are empty), so padding a
//! batch never changes a member's prediction.

use super::config::ModelConfig;
use super::dataset::Batch;
use super::featurize::{NUM_ATOM_FEATURES, NUM_AUX_FEATURES};
use candle_core::{Device, Module, Result, Tensor};
use candle_nn::{Dropout, Linear, VarBuilder, VarMap};

struct GraphConv {
    weight: Linear,
}

impl GraphConv {
    fn new(vb: VarBuilder, dim: usize) -> Result<Self> {
        Ok(Self {
            weight: candle_nn::linear(dim, dim, vb.pp("weight"))?,
        })
    }

    /// `x + relu(A · W(x))` for `x: [B, N, D]`, `a: [B, N, N]`.
    fn forward(&self, x: &Tensor, a: &Tensor) -> Result<Tensor> {
        let message = a.matmul(&self.weight.forward(x)?)?.relu()?;
        message + x
    }
}

pub struct AffinityNet {
    embed: Linear,
    convs: Vec<GraphConv>,
    projection: Linear,
    filter: Linear,
    aux: Linear,
    dropout: Dropout,
    /// Radial basis centers, `[1, 1, 1, K]`.
    centers: Tensor,
    gamma: f64,
    dim: usize,
}

impl AffinityNet {
    pub fn new(vb: VarBuilder, config: &ModelConfig, device: &Device) -> Result<Self> {
        let dim = config.dim_gnn;
        let num_filters = config.num_filters();
        let embed = candle_nn::linear_no_bias(NUM_ATOM_FEATURES, dim, vb.pp("embed"))?;
        let convs = (0..config.n_gnn)
            .map(|i| GraphConv::new(vb.pp(format!("conv{i}")), dim))
            .collect::<Result<Vec<_>>>()?;
        let projection = candle_nn::linear_no_bias(dim, dim, vb.pp("projection"))?;
        let filter = candle_nn::linear(num_filters, 1, vb.pp("filter"))?;
        let aux = candle_nn::linear(NUM_AUX_FEATURES, 1, vb.pp("aux"))?;

        let centers: Vec<f32> = (0..num_filters)
            .map(|k| (k as f64 * config.filter_spacing) as f32)
            .collect();
        let centers = Tensor::from_vec(centers, (1, 1, 1, num_filters), device)?;

        Ok(Self {
            embed,
            convs,
            projection,
            filter,
            aux,
            dropout: Dropout::new(config.dropout as f32),
            centers,
            gamma: config.filter_gamma,
            dim,
        })
    }

    fn encode(&self, h: &Tensor, a: &Tensor, train: bool) -> Result<Tensor> {
        let mut x = self.embed.forward(h)?;
        for conv in &self.convs {
            x = conv.forward(&x, a)?;
            x = self.dropout.forward(&x, train)?;
        }
        Ok(x)
    }

    /// Per-pair weights `[B, N1, N2]` from a Gaussian expansion of `dm`.
    fn distance_weights(&self, dm: &Tensor) -> Result<Tensor> {
        let expanded = dm
            .unsqueeze(3)?
            .broadcast_sub(&self.centers)?
            .sqr()?
            .affine(-self.gamma, 0.0)?
            .exp()?;
        self.filter.forward(&expanded)?.squeeze(3)
    }

    /// Predicted affinity `[B]` for the graphs of `batch` scored against the
    /// ligand/pocket distances `dm`, which is `batch.dm` for the native pose
    /// or `batch.dm_rot` for the decoy.
    pub fn forward(&self, batch: &Batch, dm: &Tensor, train: bool) -> Result<Tensor> {
        let x1 = self.encode(&batch.h1, &batch.a1, train)?;
        let x2 = self.encode(&batch.h2, &batch.a2, train)?;
        let p2 = self.projection.forward(&x2)?.transpose(1, 2)?.contiguous()?;
        let scores = x1.matmul(&p2)?.affine(1.0 / self.dim as f64, 0.0)?;
        let interaction = (scores * self.distance_weights(dm)?)?.sum((1, 2))?;
        let aux = self.aux.forward(&batch.v)?.squeeze(1)?;
        interaction + aux
    }
}

/// Number of trainable scalars.
pub fn parameter_count(varmap: &VarMap) -> usize {
    varmap.all_vars().iter().map(|v| v.elem_count()).sum()
}
