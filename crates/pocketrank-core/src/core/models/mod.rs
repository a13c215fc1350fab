//! # Core Models Module
//!
//! Data structures for molecular data used throughout the crate.
//!
//! - [`molecule`] - an index-based chemical graph (atoms, bonds, conformers) that
//!   chemistry perception, force fields, featurization, and persistence work on.
//! - [`element`] and [`topology`] - element properties and bond orders.
//! - [`residue`] - residue-name classification.
//!
//! Protein hierarchies are never modeled here; they stay in `pdbtbx` types
//! until [`crate::core::io::pdb::to_molecule`] converts them.

pub mod element;
pub mod molecule;
pub mod residue;
pub mod topology;
