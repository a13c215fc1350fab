use candle_nn::VarMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CHECKPOINT_EXTENSION: &str = "safetensors";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error for checkpoint '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize parameters to '{path}': {source}")]
    Tensor {
        path: PathBuf,
        source: candle_core::Error,
    },
}

/// `<save_dir>/save_<epoch>.safetensors`
pub fn checkpoint_path(save_dir: &Path, epoch: usize) -> PathBuf {
    save_dir.join(format!("save_{epoch}.{CHECKPOINT_EXTENSION}"))
}

/// Writes every parameter in `varmap` for `epoch`.
///
/// The tensors are serialized to a temporary file in `save_dir` which is then
/// renamed over the final path, so a crash leaves either the previous file or
/// the complete new one.
pub fn save_atomic(varmap: &VarMap, save_dir: &Path, epoch: usize) -> Result<PathBuf, CheckpointError> {
    let path = checkpoint_path(save_dir, epoch);
    let io_err = |source| CheckpointError::Io {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(save_dir).map_err(io_err)?;
    let temp = tempfile::Builder::new()
        .prefix(&format!(".save_{epoch}."))
        .suffix(&format!(".{CHECKPOINT_EXTENSION}"))
        .tempfile_in(save_dir)
        .map_err(io_err)?;
    varmap.save(temp.path()).map_err(|source| CheckpointError::Tensor {
        path: path.clone(),
        source,
    })?;
    temp.persist(&path).map_err(|e| io_err(e.error))?;
    Ok(path)
}

/// Overwrites the values of `varmap` with those stored at `path`.
pub fn restore(varmap: &mut VarMap, path: &Path) -> Result<(), CheckpointError> {
    varmap.load(path).map_err(|source| CheckpointError::Tensor {
        path: path.to_path_buf(),
        source,
    })
}
