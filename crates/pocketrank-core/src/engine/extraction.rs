use super::error::EngineError;
use crate::core::chem::sanitize::assign_implicit_hydrogens_lenient;
use crate::core::io::pdb::{self, PdbReadOptions, heavy_atom_positions};
use crate::core::models::molecule::Molecule;
use crate::core::utils::geometry::min_distance;
use nalgebra::Point3;
use std::path::Path;
use tracing::{debug, info};

/// Residues closer than this (strictly) to any ligand atom form the pocket.
pub const POCKET_CUTOFF: f64 = 5.0;

/// Residues need at least this many heavy atoms to be considered.
const MIN_RESIDUE_HEAVY_ATOMS: usize = 2;

/// Accepts residues whose closest heavy atom lies strictly within `cutoff`
/// of any ligand coordinate.
pub struct ResidueProximitySelector {
    ligand_coords: Vec<Point3<f64>>,
    cutoff: f64,
}

impl ResidueProximitySelector {
    pub fn new(ligand_coords: Vec<Point3<f64>>, cutoff: f64) -> Self {
        Self {
            ligand_coords,
            cutoff,
        }
    }

    pub fn accepts(&self, residue: &pdbtbx::Residue) -> bool {
        let heavy = heavy_atom_positions(residue);
        if heavy.len() < MIN_RESIDUE_HEAVY_ATOMS {
            debug!(
                "Rejecting residue {} {}: only {} heavy atom(s).",
                residue.name().unwrap_or("UNK"),
                residue.serial_number(),
                heavy.len()
            );
            return false;
        }
        min_distance(&heavy, &self.ligand_coords).is_some_and(|d| d < self.cutoff)
    }
}

/// Extracts the binding pocket around `ligand` from the protein at `pdb_path`.
///
/// Returns `Ok(None)` when the protein file does not exist or no residue lies
/// within [`POCKET_CUTOFF`] of the ligand's first conformer. The selected
/// residues pass through a temporary PDB file so that bonds are perceived by
/// the chemical-graph reader; the file is removed when this function returns.
pub fn extract_pocket(ligand: &Molecule, pdb_path: &Path) -> Result<Option<Molecule>, EngineError> {
    if !pdb_path.is_file() {
        debug!("Protein file {} not found.", pdb_path.display());
        return Ok(None);
    }
    let conformer = ligand
        .conformer(0)
        .ok_or_else(|| EngineError::NoConformers(ligand.name.clone()))?;

    let mut structure = pdb::read_structure(pdb_path)?;
    let selector = ResidueProximitySelector::new(conformer.positions.clone(), POCKET_CUTOFF);
    structure.remove_residues_by(|residue| !selector.accepts(residue));
    if structure.atom_count() == 0 {
        debug!("No residues within {POCKET_CUTOFF} A of the ligand.");
        return Ok(None);
    }

    let temp = tempfile::Builder::new()
        .prefix("pocket_")
        .suffix(".pdb")
        .tempfile()?;
    pdb::write_structure(&structure, temp.path())?;

    let mut pocket = pdb::read_molecule(temp.path(), PdbReadOptions::default())?;
    assign_implicit_hydrogens_lenient(&mut pocket);
    pocket.name = format!("{}_pocket", ligand.name);

    info!(
        "Extracted pocket with {} heavy atoms from {}.",
        pocket.num_atoms(),
        pdb_path.display()
    );
    Ok(Some(pocket))
}
