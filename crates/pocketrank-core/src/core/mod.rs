//! # Core Module
//!
//! Stateless building blocks shared by preprocessing and training.
//!
//! - **Molecular Representation** ([`models`]) - the bonded chemical graph (`Molecule`)
//!   with its conformers
//! - **File I/O** ([`io`]) - PDB via `pdbtbx`, SDF (V2000) and MOL2 via `bio_files`, and
//!   the SDF writer
//! - **Chemistry** ([`chem`]) - sanitization, ring and aromaticity perception, hydrogens,
//!   solvent removal and simple descriptors
//! - **Energy Calculations** ([`forcefield`]) - a UFF-style force field and minimizer
//! - **Utilities** ([`utils`]) - geometry helpers

pub mod chem;
pub mod forcefield;
pub mod io;
pub mod models;
pub mod utils;
