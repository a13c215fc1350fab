//! The dual objective: regression on the native pose plus a margin ranking
//! term that pushes the decoy pose's prediction above the native one.

use candle_core::backprop::GradStore;
use candle_core::{DType, Result, Tensor, Var};

/// Required gap between the decoy and native predictions.
pub const MARGIN: f64 = 10.0;

/// Which pass a loss is computed for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Training pass with the configured ranking-loss weight.
    Train { ratio: f64 },
    /// Evaluation pass. The ranking loss is always weighted by 1 here,
    /// whatever ratio training uses.
    Eval,
}

impl Phase {
    pub fn ranking_weight(&self) -> f64 {
        match self {
            Phase::Train { ratio } => *ratio,
            Phase::Eval => 1.0,
        }
    }

    pub fn is_train(&self) -> bool {
        matches!(self, Phase::Train { .. })
    }
}

/// Mean squared error between `pred` and `target`, both `[B]`.
pub fn mse_loss(pred: &Tensor, target: &Tensor) -> Result<Tensor> {
    candle_nn::loss::mse(pred, target)
}

/// `mean(max(0, pred1 - pred2 + MARGIN))` with `pred1` detached, so only the
/// decoy prediction receives gradient from this term.
pub fn margin_ranking_loss(pred1: &Tensor, pred2: &Tensor) -> Result<Tensor> {
    let gap = (pred1.detach() - pred2)?;
    gap.affine(1.0, MARGIN)?.relu()?.mean_all()
}

pub fn combined_loss(loss1: &Tensor, loss2: &Tensor, phase: Phase) -> Result<Tensor> {
    loss1 + loss2.affine(phase.ranking_weight(), 0.0)?
}

/// Rescales the gradients of `vars` in place so their joint L2 norm is at
/// most `max_norm`. Returns the norm before clipping.
pub fn clip_grad_norm(grads: &mut GradStore, vars: &[Var], max_norm: f64) -> Result<f64> {
    let mut total = 0.0f64;
    for var in vars {
        if let Some(g) = grads.get(var.as_tensor()) {
            total += g.sqr()?.sum_all()?.to_dtype(DType::F64)?.to_scalar::<f64>()?;
        }
    }
    let norm = total.sqrt();
    let scale = max_norm / (norm + 1e-6);
    if scale < 1.0 {
        for var in vars {
            if let Some(g) = grads.remove(var.as_tensor()) {
                grads.insert(var.as_tensor(), g.affine(scale, 0.0)?);
            }
        }
    }
    Ok(norm)
}

/// Adds the gradient of the L2 penalty `weight_decay / 2 * ||w||^2`, that is
/// `weight_decay * w`, to the gradient of every var that has one. Applied after
/// clipping, so the penalty then goes through Adam's moment estimates like any
/// other gradient term.
pub fn add_l2_penalty(grads: &mut GradStore, vars: &[Var], weight_decay: f64) -> Result<()> {
    if weight_decay == 0.0 {
        return Ok(());
    }
    for var in vars {
        if let Some(g) = grads.remove(var.as_tensor()) {
            let decayed = (g + var.as_tensor().affine(weight_decay, 0.0)?)?;
            grads.insert(var.as_tensor(), decayed);
        }
    }
    Ok(())
}
