//! # Engine Module
//!
//! The algorithmic pieces the two workflows are assembled from.
//!
//! ## Preprocessing
//!
//! - **Ligand inputs** ([`sources`]) - Ordered fallback over the candidate ligand files of a complex
//! - **Pocket extraction** ([`extraction`]) - Residues within the contact cutoff of the ligand
//! - **Conformers** ([`embedding`], [`conformer`]) - Randomized embedding, force-field relaxation
//!   and lowest-energy selection
//! - **Records** ([`record`]) - The persisted ligand/optimized-ligand/pocket triple per key
//!
//! ## Training
//!
//! - **Inputs** ([`labels`], [`featurize`], [`dataset`]) - Affinity labels, key splits, per-complex
//!   tensors and padded batches
//! - **Model** ([`network`], [`objective`]) - The affinity network and its dual loss
//! - **Bookkeeping** ([`schedule`], [`metrics`], [`report`], [`checkpoint`]) - Learning-rate decay,
//!   R², prediction reports and per-epoch parameter snapshots
//!
//! Shared across both: [`config`], [`error`] and [`progress`].

pub mod checkpoint;
pub mod config;
pub mod conformer;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod featurize;
pub mod labels;
pub mod metrics;
pub mod network;
pub mod objective;
pub mod progress;
pub mod record;
pub mod report;
pub mod schedule;
pub mod sources;
