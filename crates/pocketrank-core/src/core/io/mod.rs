//! Provides input/output functionality for molecular file formats.
//!
//! PDB files go through `pdbtbx` ([`pdb`]): they are read as a residue
//! hierarchy, filtered, and converted to a chemical graph. SD and MOL2 files are
//! parsed by `bio_files` and converted through [`generic`]; SD files also have a
//! writer behind the [`traits::MolecularFile`] interface.

pub mod generic;
pub mod mol2;
pub mod pdb;
pub mod sdf;
pub mod traits;
