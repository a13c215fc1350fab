//! # Workflows Module
//!
//! The top-level entry points of PocketRank. Each workflow takes a validated
//! configuration and a [`ProgressReporter`](crate::engine::progress::ProgressReporter),
//! loads what it needs and drives the engine to completion.
//!
//! - **Preprocessing** ([`preprocess`]) - Turns raw complex directories into persisted
//!   records on a worker pool, skipping any key that fails.
//! - **Training** ([`train`]) - Fits the affinity network on the preprocessed records,
//!   writing reports and a checkpoint every epoch.

pub mod preprocess;
pub mod train;
