use super::error::EngineError;
use crate::core::chem::hydrogens::remove_hydrogens;
use crate::core::chem::sanitize::sanitize;
use crate::core::io::mol2::Mol2File;
use crate::core::io::sdf::SdfFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::molecule::Molecule;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate ligand inputs for one complex, tried in [`LigandSource::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LigandSource {
    /// `<input>/<key>/<key>_ligand.sdf`
    PrimarySdf,
    /// `<external>/<key>/<key>.sdf`, only when `<external>/<key>` exists.
    ExternalSdf,
    /// `<input>/<key>/<key>_ligand.mol2`
    Mol2,
}

impl fmt::Display for LigandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LigandSource::PrimarySdf => "sdf",
            LigandSource::ExternalSdf => "external sdf",
            LigandSource::Mol2 => "mol2",
        };
        f.write_str(name)
    }
}

/// Directories the sources resolve against.
#[derive(Debug, Clone, Copy)]
pub struct SourceDirs<'a> {
    pub input_dir: &'a Path,
    pub external_dir: Option<&'a Path>,
}

impl LigandSource {
    pub const ORDER: [LigandSource; 3] = [
        LigandSource::PrimarySdf,
        LigandSource::ExternalSdf,
        LigandSource::Mol2,
    ];

    /// File this source would read for `key`, or `None` when the source does
    /// not apply.
    pub fn path(&self, dirs: SourceDirs<'_>, key: &str) -> Option<PathBuf> {
        match self {
            LigandSource::PrimarySdf => Some(dirs.input_dir.join(key).join(format!("{key}_ligand.sdf"))),
            LigandSource::ExternalSdf => {
                let dir = dirs.external_dir?.join(key);
                dir.is_dir().then(|| dir.join(format!("{key}.sdf")))
            }
            LigandSource::Mol2 => Some(dirs.input_dir.join(key).join(format!("{key}_ligand.mol2"))),
        }
    }

    /// Reads, sanitizes and strips explicit hydrogens.
    pub fn load(&self, path: &Path) -> Result<Molecule, EngineError> {
        let mut mol = match self {
            LigandSource::PrimarySdf | LigandSource::ExternalSdf => SdfFile::read_from_path(path)?,
            LigandSource::Mol2 => Mol2File::read_from_path(path)?,
        };
        sanitize(&mut mol)?;
        remove_hydrogens(&mut mol);
        Ok(mol)
    }
}

/// Loads the ligand for `key` from the first source that parses.
pub fn load_ligand(dirs: SourceDirs<'_>, key: &str) -> Result<(LigandSource, Molecule), EngineError> {
    for source in LigandSource::ORDER {
        let Some(path) = source.path(dirs, key) else {
            continue;
        };
        match source.load(&path) {
            Ok(mut mol) => {
                if mol.name.is_empty() {
                    mol.name = key.to_string();
                }
                debug!("Loaded ligand for {key} from {source} ({}).", path.display());
                return Ok((source, mol));
            }
            Err(e) => debug!("Ligand source {source} failed for {key}: {e}"),
        }
    }
    Err(EngineError::NoLigandSource(key.to_string()))
}
