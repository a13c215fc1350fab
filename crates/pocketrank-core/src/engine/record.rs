use crate::core::models::molecule::Molecule;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error for record '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode record: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Failed to decode record '{path}': {source}")]
    Decode {
        path: PathBuf,
        source: bincode::error::DecodeError,
    },
    #[error("The {0} has no conformer")]
    MissingConformer(&'static str),
}

/// The persisted unit of the dataset: the native ligand, its optimized
/// conformer, and the binding pocket, each a heavy-atom graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexRecord {
    pub ligand: Molecule,
    pub ligand_optimized: Molecule,
    pub pocket: Molecule,
    /// Reserved per-complex values; currently always empty.
    pub auxiliary: Vec<f64>,
}

impl ComplexRecord {
    pub fn new(ligand: Molecule, ligand_optimized: Molecule, pocket: Molecule) -> Self {
        Self {
            ligand,
            ligand_optimized,
            pocket,
            auxiliary: Vec::new(),
        }
    }

    fn validate(&self) -> Result<(), RecordError> {
        if self.ligand.num_conformers() == 0 {
            return Err(RecordError::MissingConformer("ligand"));
        }
        if self.ligand_optimized.num_conformers() == 0 {
            return Err(RecordError::MissingConformer("optimized ligand"));
        }
        if self.pocket.num_conformers() == 0 {
            return Err(RecordError::MissingConformer("pocket"));
        }
        Ok(())
    }
}

pub fn record_path(data_dir: &Path, key: &str) -> PathBuf {
    data_dir.join(key)
}

/// A key is processed once its record file exists.
pub fn exists(data_dir: &Path, key: &str) -> bool {
    record_path(data_dir, key).is_file()
}

/// Writes `record` to `<data_dir>/<key>`.
///
/// The bytes go to a temporary file in `data_dir` first and are renamed into
/// place, so a reader never observes a partial record.
pub fn save(data_dir: &Path, key: &str, record: &ComplexRecord) -> Result<(), RecordError> {
    record.validate()?;
    let path = record_path(data_dir, key);
    let io_err = |source| RecordError::Io {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(data_dir).map_err(io_err)?;
    let temp = tempfile::Builder::new()
        .prefix(&format!(".{key}."))
        .tempfile_in(data_dir)
        .map_err(io_err)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        bincode::serde::encode_into_std_write(record, &mut writer, bincode::config::standard())?;
        writer.flush().map_err(io_err)?;
    }
    temp.persist(&path).map_err(|e| io_err(e.error))?;
    Ok(())
}

pub fn load(data_dir: &Path, key: &str) -> Result<ComplexRecord, RecordError> {
    let path = record_path(data_dir, key);
    let file = File::open(&path).map_err(|source| RecordError::Io {
        path: path.clone(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
        .map_err(|source| RecordError::Decode { path, source })
}
