use candle_nn::Optimizer;

/// `lr(epoch) = base_lr * decay^epoch`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    pub base_lr: f64,
    pub decay: f64,
}

impl ExponentialDecay {
    pub fn new(base_lr: f64, decay: f64) -> Self {
        Self { base_lr, decay }
    }

    pub fn lr_at(&self, epoch: usize) -> f64 {
        self.base_lr * self.decay.powi(epoch as i32)
    }

    /// Sets the rate for the epoch following `epoch` and returns it.
    ///
    /// Every parameter is owned by a single optimizer, so this covers all
    /// parameter groups at once.
    pub fn apply<O: Optimizer>(&self, optimizer: &mut O, epoch: usize) -> f64 {
        let lr = self.lr_at(epoch);
        optimizer.set_learning_rate(lr);
        lr
    }
}
