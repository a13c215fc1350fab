use super::featurize::{NUM_ATOM_FEATURES, NUM_AUX_FEATURES, Sample, featurize};
use super::record;
use candle_core::{Device, Tensor};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Keys backed by record files in `data_dir`, labelled from an index.
#[derive(Debug, Clone)]
pub struct ComplexDataset {
    keys: Vec<String>,
    data_dir: PathBuf,
    labels: Arc<HashMap<String, f64>>,
}

impl ComplexDataset {
    pub fn new(keys: Vec<String>, data_dir: PathBuf, labels: Arc<HashMap<String, f64>>) -> Self {
        Self {
            keys,
            data_dir,
            labels,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Featurizes item `index`, or `None` when its label or record is
    /// missing or unusable.
    pub fn get<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Option<Sample> {
        let key = self.keys.get(index)?;
        let Some(&label) = self.labels.get(key) else {
            debug!("No label for {key}.");
            return None;
        };
        let record = match record::load(&self.data_dir, key) {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping {key}: {e}");
                return None;
            }
        };
        featurize(key, &record, label, rng)
    }
}

/// Zero-padded batch tensors. Shapes use `B` for the batch, `N1`/`N2` for
/// the largest ligand/pocket in the batch and `F` for [`NUM_ATOM_FEATURES`].
#[derive(Debug, Clone)]
pub struct Batch {
    pub keys: Vec<String>,
    /// `[B, N1, F]`
    pub h1: Tensor,
    /// `[B, N1, N1]`
    pub a1: Tensor,
    /// `[B, N2, F]`
    pub h2: Tensor,
    /// `[B, N2, N2]`
    pub a2: Tensor,
    /// `[B, N1, N2]`
    pub dm: Tensor,
    /// `[B, N1, N2]`
    pub dm_rot: Tensor,
    /// `[B, NUM_AUX_FEATURES]`
    pub v: Tensor,
    /// `[B]`
    pub y: Tensor,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Copies a row-major `rows x cols` matrix into the top-left corner of a
/// zeroed `max_rows x max_cols` block.
fn pad_into(dst: &mut Vec<f32>, src: &[f32], rows: usize, cols: usize, max_rows: usize, max_cols: usize) {
    let start = dst.len();
    dst.resize(start + max_rows * max_cols, 0.0);
    for r in 0..rows {
        let from = &src[r * cols..(r + 1) * cols];
        dst[start + r * max_cols..start + r * max_cols + cols].copy_from_slice(from);
    }
}

/// Drops missing samples and stacks the rest. Returns `Ok(None)` when no
/// sample is left.
pub fn collate(samples: Vec<Option<Sample>>, device: &Device) -> candle_core::Result<Option<Batch>> {
    let samples: Vec<Sample> = samples.into_iter().flatten().collect();
    if samples.is_empty() {
        return Ok(None);
    }
    let b = samples.len();
    let n1 = samples.iter().map(|s| s.num_ligand_atoms).max().unwrap_or(0);
    let n2 = samples.iter().map(|s| s.num_pocket_atoms).max().unwrap_or(0);

    let (mut h1, mut a1, mut h2, mut a2) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    let (mut dm, mut dm_rot) = (Vec::new(), Vec::new());
    let mut v = Vec::with_capacity(b * NUM_AUX_FEATURES);
    let mut y = Vec::with_capacity(b);
    for s in &samples {
        let (l, p) = (s.num_ligand_atoms, s.num_pocket_atoms);
        pad_into(&mut h1, &s.h1, l, NUM_ATOM_FEATURES, n1, NUM_ATOM_FEATURES);
        pad_into(&mut a1, &s.a1, l, l, n1, n1);
        pad_into(&mut h2, &s.h2, p, NUM_ATOM_FEATURES, n2, NUM_ATOM_FEATURES);
        pad_into(&mut a2, &s.a2, p, p, n2, n2);
        pad_into(&mut dm, &s.dm, l, p, n1, n2);
        pad_into(&mut dm_rot, &s.dm_rot, l, p, n1, n2);
        v.extend_from_slice(&s.v);
        y.push(s.y);
    }

    Ok(Some(Batch {
        keys: samples.into_iter().map(|s| s.key).collect(),
        h1: Tensor::from_vec(h1, (b, n1, NUM_ATOM_FEATURES), device)?,
        a1: Tensor::from_vec(a1, (b, n1, n1), device)?,
        h2: Tensor::from_vec(h2, (b, n2, NUM_ATOM_FEATURES), device)?,
        a2: Tensor::from_vec(a2, (b, n2, n2), device)?,
        dm: Tensor::from_vec(dm, (b, n1, n2), device)?,
        dm_rot: Tensor::from_vec(dm_rot, (b, n1, n2), device)?,
        v: Tensor::from_vec(v, (b, NUM_AUX_FEATURES), device)?,
        y: Tensor::from_vec(y, b, device)?,
    }))
}

fn mix(seed: u64, a: u64, b: u64) -> u64 {
    seed ^ a.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ b.wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
}

/// Batches a dataset, featurizing each batch on a dedicated worker pool.
///
/// With `shuffle`, the visiting order is reshuffled every epoch. Every sample
/// draws its decoy rotation from an RNG derived from the seed, epoch and item
/// index, so batches are reproducible regardless of worker scheduling.
pub struct BatchLoader {
    dataset: ComplexDataset,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    pool: ThreadPool,
    device: Device,
}

impl BatchLoader {
    pub fn new(
        dataset: ComplexDataset,
        batch_size: usize,
        shuffle: bool,
        workers: usize,
        seed: u64,
        device: Device,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("loader-{i}"))
            .build()?;
        Ok(Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            seed,
            pool,
            device,
        })
    }

    pub fn dataset(&self) -> &ComplexDataset {
        &self.dataset
    }

    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Item order for `epoch`.
    pub fn order(&self, epoch: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(mix(self.seed, epoch as u64, u64::MAX));
            order.shuffle(&mut rng);
        }
        order
    }

    fn load(&self, epoch: usize, indices: &[usize]) -> candle_core::Result<Option<Batch>> {
        let samples: Vec<Option<Sample>> = self.pool.install(|| {
            indices
                .par_iter()
                .map(|&i| {
                    let mut rng = StdRng::seed_from_u64(mix(self.seed, epoch as u64, i as u64));
                    self.dataset.get(i, &mut rng)
                })
                .collect()
        });
        collate(samples, &self.device)
    }

    /// Batches for one pass; `None` items are batches with no usable sample.
    pub fn iter(&self, epoch: usize) -> impl Iterator<Item = candle_core::Result<Option<Batch>>> + '_ {
        let order = self.order(epoch);
        let chunks: Vec<Vec<usize>> = order.chunks(self.batch_size).map(<[usize]>::to_vec).collect();
        chunks.into_iter().map(move |chunk| self.load(epoch, &chunk))
    }
}
