//! Chemistry perception on [`Molecule`](crate::core::models::molecule::Molecule)
//! graphs: valence checks and Kekulé assignment, ring and aromaticity
//! perception, explicit/implicit hydrogen handling, solvent stripping, and
//! simple descriptors.

pub mod descriptors;
pub mod hydrogens;
pub mod rings;
pub mod sanitize;
pub mod solvent;
