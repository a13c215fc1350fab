//! # PocketRank Core Library
//!
//! Preprocessing of protein-ligand complexes into binding-pocket graphs and training of a
//! graph neural network that predicts binding affinity with an auxiliary ranking objective
//! against optimized ligand conformers.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`), file I/O,
//!   chemistry perception and the force field used to relax conformers.
//!
//! - **[`engine`]: The Logic Core.** Pocket extraction, conformer optimization, the on-disk
//!   complex records, featurization, batching, the network, its objective and the training
//!   bookkeeping (schedule, metrics, reports, checkpoints).
//!
//! - **[`workflows`]: The Public API.** The two end-to-end procedures, `preprocess` and `train`,
//!   driven by a configuration object and an optional progress callback.

pub mod core;
pub mod engine;
pub mod workflows;
