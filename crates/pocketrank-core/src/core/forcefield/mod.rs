//! # Force Field Module
//!
//! A small UFF-style molecular mechanics force field used to relax ligand
//! conformers during preprocessing.
//!
//! - [`params`] loads per-type parameters (embedded `uff.toml` or a user file)
//! - [`typing`] assigns atom type labels from element, hybridization and aromaticity
//! - [`potentials`] holds the pure energy functions and their derivatives
//! - [`energy`] builds the bonded and van der Waals terms for a molecule and
//!   evaluates energies and analytic gradients
//! - [`minimize`] is a nonlinear conjugate-gradient minimizer over flat coordinates
//!
//! ```ignore
//! use pocketrank::core::forcefield::{energy::UffForceField, params::Forcefield};
//!
//! let ff = UffForceField::setup(&molecule, &Forcefield::embedded()?)?;
//! let result = ff.minimize(&mut positions, &Default::default())?;
//! ```

pub mod energy;
pub mod minimize;
pub mod params;
pub(crate) mod potentials;
pub mod term;
pub mod typing;
