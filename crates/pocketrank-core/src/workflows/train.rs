use crate::engine::checkpoint::{restore, save_atomic};
use crate::engine::config::TrainingConfig;
use crate::engine::dataset::{BatchLoader, ComplexDataset};
use crate::engine::error::EngineError;
use crate::engine::labels::{read_key_split, read_label_index};
use crate::engine::metrics::{mean, r2_score};
use crate::engine::network::{AffinityNet, parameter_count};
use crate::engine::objective::{
    Phase, add_l2_penalty, clip_grad_norm, combined_loss, margin_ranking_loss, mse_loss,
};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::{PredictionTable, write_predictions};
use crate::engine::schedule::ExponentialDecay;
use candle_core::{DType, Device, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

const MAX_GRAD_NORM: f64 = 1.0;

/// Statistics of one epoch, in the order they are printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub train_loss1: f64,
    pub train_loss2: f64,
    pub test_loss1: f64,
    pub test_loss2: f64,
    pub train_r2: f64,
    pub test_r2: f64,
    pub seconds: f64,
}

impl EpochSummary {
    /// Tab-separated progress line with three decimals per value.
    pub fn line(&self) -> String {
        format!(
            "{}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}",
            self.epoch,
            self.train_loss1,
            self.train_loss2,
            self.test_loss1,
            self.test_loss2,
            self.train_r2,
            self.test_r2,
            self.seconds
        )
    }
}

/// Losses and predictions accumulated over one pass. Built fresh for every
/// pass and dropped once the epoch's reports are written.
#[derive(Debug, Default)]
pub struct PassStats {
    pub loss1: Vec<f64>,
    pub loss2: Vec<f64>,
    /// Combined loss per batch, weighted according to the pass phase.
    pub total: Vec<f64>,
    pub predictions: PredictionTable,
}

impl PassStats {
    pub fn r2(&self) -> f64 {
        r2_score(&self.predictions.labels(), &self.predictions.native_predictions())
    }
}

fn select_device(ngpu: usize) -> Result<Device, EngineError> {
    if ngpu > 0 {
        Ok(Device::cuda_if_available(0)?)
    } else {
        Ok(Device::Cpu)
    }
}

/// Optimizer state for a training pass: Adam (AdamW with its decoupled decay
/// switched off) plus the coefficient of the L2 penalty added to the gradients.
struct Step<'a> {
    optimizer: &'a mut AdamW,
    vars: &'a [Var],
    weight_decay: f64,
}

/// One pass over `loader`. With a step every batch takes a clipped gradient
/// step; without one the pass only evaluates.
fn run_pass(
    model: &AffinityNet,
    loader: &BatchLoader,
    mut step: Option<Step<'_>>,
    epoch: usize,
    phase: Phase,
    reporter: &ProgressReporter,
) -> Result<PassStats, EngineError> {
    let train = phase.is_train();
    let mut stats = PassStats::default();
    reporter.report(Progress::TaskStart {
        total_steps: loader.num_batches() as u64,
    });

    for batch in loader.iter(epoch) {
        reporter.report(Progress::TaskIncrement);
        let Some(batch) = batch? else {
            continue;
        };

        let mut pred1 = model.forward(&batch, &batch.dm, train)?;
        let mut pred2 = model.forward(&batch, &batch.dm_rot, train)?;
        if !train {
            pred1 = pred1.detach();
            pred2 = pred2.detach();
        }
        let loss1 = mse_loss(&pred1, &batch.y)?;
        let loss2 = margin_ranking_loss(&pred1, &pred2)?;
        let loss = combined_loss(&loss1, &loss2, phase)?;

        if let Some(step) = step.as_mut() {
            let mut grads = loss.backward()?;
            let norm = clip_grad_norm(&mut grads, step.vars, MAX_GRAD_NORM)?;
            add_l2_penalty(&mut grads, step.vars, step.weight_decay)?;
            step.optimizer.step(&grads)?;
            debug!(grad_norm = norm, "Optimizer step.");
        }

        stats.loss1.push(loss1.to_scalar::<f32>()? as f64);
        stats.loss2.push(loss2.to_scalar::<f32>()? as f64);
        stats.total.push(loss.to_scalar::<f32>()? as f64);

        let labels = batch.y.to_vec1::<f32>()?;
        let native = pred1.to_vec1::<f32>()?;
        let decoy = pred2.to_vec1::<f32>()?;
        for (i, key) in batch.keys.iter().enumerate() {
            stats
                .predictions
                .record(key, labels[i] as f64, native[i] as f64, decoy[i] as f64);
        }
    }

    reporter.report(Progress::TaskFinish);
    Ok(stats)
}

/// Owns the model, optimizer and data loaders for a training run.
pub struct Trainer {
    config: TrainingConfig,
    varmap: VarMap,
    model: AffinityNet,
    optimizer: AdamW,
    schedule: ExponentialDecay,
    train_loader: BatchLoader,
    test_loader: BatchLoader,
}

impl Trainer {
    /// Reads labels and key lists, builds the model on the selected device
    /// and loads the restart checkpoint if one is configured.
    pub fn new(config: TrainingConfig) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&config.save_dir)?;

        let labels = Arc::new(read_label_index(&config.label_index_path)?);
        let (train_keys, test_keys) = read_key_split(&config.key_dir)?;
        info!(
            "Loaded {} labels, {} training and {} test keys.",
            labels.len(),
            train_keys.len(),
            test_keys.len()
        );

        let device = select_device(config.ngpu)?;
        info!("Training on {device:?}.");

        let mut varmap = VarMap::new();
        let model = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            AffinityNet::new(vb, &config.model, &device)?
        };
        if let Some(path) = &config.restart_file {
            restore(&mut varmap, path)?;
            info!("Restarted from {}.", path.display());
        }
        info!("Number of parameters: {}", parameter_count(&varmap));

        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: config.lr,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let train_loader = BatchLoader::new(
            ComplexDataset::new(train_keys, config.data_dir.clone(), Arc::clone(&labels)),
            config.batch_size,
            true,
            config.workers,
            seed,
            device.clone(),
        )?;
        let test_loader = BatchLoader::new(
            ComplexDataset::new(test_keys, config.data_dir.clone(), labels),
            config.batch_size,
            false,
            config.workers,
            seed,
            device,
        )?;

        Ok(Self {
            schedule: ExponentialDecay::new(config.lr, config.lr_decay),
            config,
            varmap,
            model,
            optimizer,
            train_loader,
            test_loader,
        })
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn learning_rate(&self) -> f64 {
        self.optimizer.learning_rate()
    }

    /// The training pass followed by the evaluation pass, without reports,
    /// checkpoint, or learning-rate update.
    pub fn run_passes(
        &mut self,
        epoch: usize,
        reporter: &ProgressReporter,
    ) -> Result<(PassStats, PassStats), EngineError> {
        let vars = self.varmap.all_vars();

        reporter.report(Progress::PhaseStart { name: "Train" });
        let step = Step {
            optimizer: &mut self.optimizer,
            vars: &vars,
            weight_decay: self.config.weight_decay,
        };
        let train = run_pass(
            &self.model,
            &self.train_loader,
            Some(step),
            epoch,
            Phase::Train {
                ratio: self.config.loss2_ratio,
            },
            reporter,
        )?;
        reporter.report(Progress::PhaseFinish);

        reporter.report(Progress::PhaseStart { name: "Evaluate" });
        let test = run_pass(&self.model, &self.test_loader, None, epoch, Phase::Eval, reporter)?;
        reporter.report(Progress::PhaseFinish);
        Ok((train, test))
    }

    /// Train pass, eval pass, reports, checkpoint, learning-rate decay.
    pub fn run_epoch(&mut self, epoch: usize, reporter: &ProgressReporter) -> Result<EpochSummary, EngineError> {
        let start = Instant::now();
        let (train, test) = self.run_passes(epoch, reporter)?;

        write_predictions(&self.config.train_output, &train.predictions)?;
        write_predictions(&self.config.test_output, &test.predictions)?;

        let summary = EpochSummary {
            epoch,
            train_loss1: mean(&train.loss1),
            train_loss2: mean(&train.loss2),
            test_loss1: mean(&test.loss1),
            test_loss2: mean(&test.loss2),
            train_r2: train.r2(),
            test_r2: test.r2(),
            seconds: start.elapsed().as_secs_f64(),
        };
        let line = summary.line();
        info!("{line}");
        reporter.report(Progress::Message(line));

        let path = save_atomic(&self.varmap, &self.config.save_dir, epoch)?;
        debug!("Saved checkpoint {}.", path.display());

        let lr = self.schedule.apply(&mut self.optimizer, epoch);
        debug!(lr, "Learning rate updated.");
        Ok(summary)
    }
}

/// Trains for `config.epochs` epochs and returns every epoch's summary.
///
/// There is no failure isolation here: any error ends the run.
#[instrument(skip_all, name = "train_workflow")]
pub fn run(config: &TrainingConfig, reporter: &ProgressReporter) -> Result<Vec<EpochSummary>, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Setup" });
    let mut trainer = Trainer::new(config.clone())?;
    reporter.report(Progress::PhaseFinish);

    let mut summaries = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        summaries.push(trainer.run_epoch(epoch, reporter)?);
    }
    info!("Training complete after {} epochs.", config.epochs);
    Ok(summaries)
}
