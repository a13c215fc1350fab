use thiserror::Error;

use super::checkpoint::CheckpointError;
use super::config::ConfigError;
use super::labels::LabelError;
use super::record::RecordError;
use super::report::ReportError;
use crate::core::chem::sanitize::SanitizeError;
use crate::core::forcefield::energy::ForcefieldError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::io::mol2::Mol2Error;
use crate::core::io::pdb::PdbError;
use crate::core::io::sdf::SdfError;
use crate::core::models::molecule::MoleculeError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDB error: {0}")]
    Pdb(#[from] PdbError),

    #[error("SDF error: {0}")]
    Sdf(#[from] SdfError),

    #[error("MOL2 error: {0}")]
    Mol2(#[from] Mol2Error),

    #[error("Invalid molecule: {0}")]
    Molecule(#[from] MoleculeError),

    #[error("Sanitization failed: {0}")]
    Sanitize(#[from] SanitizeError),

    #[error("Force field setup failed: {0}")]
    Forcefield(#[from] ForcefieldError),

    #[error("Failed to load force field parameters: {0}")]
    Parameters(#[from] ParamLoadError),

    #[error("Complex record error: {0}")]
    Record(#[from] RecordError),

    #[error("Label error: {0}")]
    Label(#[from] LabelError),

    #[error("Tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Embedding produced no conformers for '{0}'")]
    NoConformers(String),

    #[error("No ligand source could be parsed for '{0}'")]
    NoLigandSource(String),

    #[error("Optimization phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
