//! PDB coordinate files, parsed and written by `pdbtbx`.
//!
//! Protein files are loaded as a [`pdbtbx::PDB`] hierarchy so that residues can
//! be filtered before anything chemical happens; [`to_molecule`] then turns the
//! first model into a [`Molecule`] with bonds perceived from coordinates.

use crate::core::models::element::Element;
use crate::core::models::molecule::{Conformer, MolAtom, Molecule, ResidueInfo};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use pdbtbx::{PDB, StrictnessLevel};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Slack added to the sum of covalent radii when perceiving bonds from coordinates.
pub const BOND_TOLERANCE: f64 = 0.4;

/// Pairs closer than this are overlapping atoms, never bonds.
const MIN_BOND_DISTANCE: f64 = 0.4;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to read PDB file {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("Failed to write PDB file {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
    #[error("No ATOM or HETATM records found")]
    NoAtoms,
}

fn path_str(path: &Path) -> Result<&str, PdbError> {
    path.to_str()
        .ok_or_else(|| PdbError::NonUtf8Path(path.to_path_buf()))
}

fn join_errors(errors: &[pdbtbx::PDBError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reads the atomic coordinates of a PDB file. Header records are skipped and
/// non-fatal parser complaints are logged at debug level.
pub fn read_structure(path: &Path) -> Result<PDB, PdbError> {
    let (pdb, warnings) = pdbtbx::ReadOptions::default()
        .set_only_atomic_coords(true)
        .set_level(StrictnessLevel::Loose)
        .read(path_str(path)?)
        .map_err(|errors| PdbError::Read {
            path: path.to_path_buf(),
            message: join_errors(&errors),
        })?;
    if !warnings.is_empty() {
        debug!("{}: {}", path.display(), join_errors(&warnings));
    }
    Ok(pdb)
}

/// Writes `pdb` to `path`, creating or truncating the file.
pub fn write_structure(pdb: &PDB, path: &Path) -> Result<(), PdbError> {
    pdbtbx::save_pdb(pdb, path_str(path)?, StrictnessLevel::Loose).map_err(|errors| {
        PdbError::Write {
            path: path.to_path_buf(),
            message: join_errors(&errors),
        }
    })
}

/// Element of a `pdbtbx` atom, falling back to the atom name when the element
/// column is empty or holds a symbol outside the supported set.
pub fn element_of(atom: &pdbtbx::Atom) -> Element {
    atom.element()
        .and_then(|e| e.symbol().parse().ok())
        .unwrap_or_else(|| Element::from_atom_name(atom.name()))
}

/// Positions of the non-hydrogen atoms of a residue's first conformer.
pub fn heavy_atom_positions(residue: &pdbtbx::Residue) -> Vec<Point3<f64>> {
    residue
        .conformers()
        .next()
        .map(|conformer| {
            conformer
                .atoms()
                .filter(|atom| !element_of(atom).is_hydrogen())
                .map(|atom| {
                    let (x, y, z) = atom.pos();
                    Point3::new(x, y, z)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
pub struct PdbReadOptions {
    /// Drop hydrogen atoms after bonds are perceived.
    pub remove_hydrogens: bool,
    /// Perceive single bonds between atoms closer than the sum of their
    /// covalent radii plus [`BOND_TOLERANCE`].
    pub proximity_bonding: bool,
}

impl Default for PdbReadOptions {
    fn default() -> Self {
        Self {
            remove_hydrogens: true,
            proximity_bonding: true,
        }
    }
}

/// Converts the first model of `pdb` into a chemical graph with one conformer.
///
/// Only the first alternate location of each residue is kept. All perceived
/// bonds are single bonds.
pub fn to_molecule(pdb: &PDB, options: PdbReadOptions) -> Result<Molecule, PdbError> {
    let model = pdb.models().next().ok_or(PdbError::NoAtoms)?;

    let mut molecule = Molecule::new("");
    let mut positions = Vec::new();
    for chain in model.chains() {
        let chain_id = chain.id().chars().next().unwrap_or(' ');
        for residue in chain.residues() {
            let Some(conformer) = residue.conformers().next() else {
                continue;
            };
            let (number, insertion_code) = residue.id();
            let info = ResidueInfo {
                name: conformer.name().to_string(),
                number,
                chain: chain_id,
                insertion_code: insertion_code.and_then(|code| code.chars().next()),
            };
            for atom in conformer.atoms() {
                let mol_atom = MolAtom::new(element_of(atom))
                    .with_name(atom.name())
                    .with_charge(i8::try_from(atom.charge()).unwrap_or(0))
                    .with_residue(info.clone());
                // The molecule has no conformers yet, so this cannot fail.
                molecule
                    .add_atom(mol_atom)
                    .map_err(|e| io::Error::other(e.to_string()))?;
                let (x, y, z) = atom.pos();
                positions.push(Point3::new(x, y, z));
            }
        }
    }
    if positions.is_empty() {
        return Err(PdbError::NoAtoms);
    }

    if options.proximity_bonding {
        for (i, j) in proximity_bonds(molecule.atoms(), &positions) {
            let _ = molecule.add_bond(i, j, BondOrder::Single);
        }
    }

    molecule
        .add_conformer(Conformer::new(positions))
        .map_err(|e| io::Error::other(e.to_string()))?;

    if options.remove_hydrogens {
        molecule.remove_atoms_where(|_, atom| atom.element.is_hydrogen());
    }
    Ok(molecule)
}

/// Reads a PDB file straight into a chemical graph.
pub fn read_molecule(path: &Path, options: PdbReadOptions) -> Result<Molecule, PdbError> {
    let pdb = read_structure(path)?;
    to_molecule(&pdb, options)
}

/// Atom pairs within bonding distance. Ions and unknown elements never bond.
fn proximity_bonds(atoms: &[MolAtom], positions: &[Point3<f64>]) -> Vec<(usize, usize)> {
    let bondable = |a: &MolAtom| !a.element.is_ion() && a.element != Element::Unknown;
    let mut bonds = Vec::new();
    for i in 0..atoms.len() {
        if !bondable(&atoms[i]) {
            continue;
        }
        for j in (i + 1)..atoms.len() {
            if !bondable(&atoms[j]) {
                continue;
            }
            // Hydrogens bond to at most one heavy atom; skip H-H pairs outright.
            if atoms[i].element.is_hydrogen() && atoms[j].element.is_hydrogen() {
                continue;
            }
            let cutoff =
                atoms[i].element.covalent_radius() + atoms[j].element.covalent_radius() + BOND_TOLERANCE;
            let d = nalgebra::distance(&positions[i], &positions[j]);
            if d > MIN_BOND_DISTANCE && d <= cutoff {
                bonds.push((i, j));
            }
        }
    }
    bonds
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    const SMALL_PDB: &str = "\
HEADER    TEST
ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00 10.00           N
ATOM      2  CA  GLY A   1       1.458   0.000   0.000  1.00 10.00           C
ATOM      3  C   GLY A   1       2.009   1.420   0.000  1.00 10.00           C
ATOM      4  O   GLY A   1       1.251   2.390   0.000  1.00 10.00           O
ATOM      5  H   GLY A   1      -0.500  -0.800   0.000  1.00 10.00           H
HETATM    6 ZN    ZN A 101       5.000   5.000   5.000  1.00 20.00          ZN
HETATM    7  O   HOH A 201      20.000  20.000  20.000  1.00 30.00           O
END
";

    fn write_pdb(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn read_structure_exposes_residue_hierarchy() {
        let dir = tempdir().unwrap();
        let pdb = read_structure(&write_pdb(&dir, "small.pdb", SMALL_PDB)).unwrap();
        assert_eq!(pdb.atom_count(), 7);
        assert_eq!(pdb.residue_count(), 3);
        let zn = pdb.atoms().find(|a| a.name() == "ZN").unwrap();
        assert_eq!(element_of(zn), Element::Zn);
    }

    #[test]
    fn read_structure_reports_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_structure(&dir.path().join("absent.pdb")).unwrap_err();
        assert!(matches!(err, PdbError::Read { .. }));
    }

    #[test]
    fn heavy_atom_positions_skip_hydrogens() {
        let dir = tempdir().unwrap();
        let pdb = read_structure(&write_pdb(&dir, "small.pdb", SMALL_PDB)).unwrap();
        let gly = pdb.residues().find(|r| r.name() == Some("GLY")).unwrap();
        let heavy = heavy_atom_positions(gly);
        assert_eq!(heavy.len(), 4);
        assert!(heavy.iter().all(|p| p.x >= 0.0));
    }

    #[test]
    fn write_after_filtering_drops_removed_residues() {
        let dir = tempdir().unwrap();
        let mut pdb = read_structure(&write_pdb(&dir, "small.pdb", SMALL_PDB)).unwrap();
        pdb.remove_residues_by(|r| r.name() == Some("HOH"));
        let out = dir.path().join("filtered.pdb");
        write_structure(&pdb, &out).unwrap();

        let reread = read_structure(&out).unwrap();
        assert_eq!(reread.atom_count(), 6);
        assert!(reread.residues().all(|r| r.name() != Some("HOH")));
        let ca = reread.atoms().find(|a| a.name() == "CA").unwrap();
        assert!((ca.pos().0 - 1.458).abs() < 1e-6);
    }

    #[test]
    fn molecule_keeps_first_alternate_location_only() {
        let dir = tempdir().unwrap();
        let text = "\
ATOM      1  CA  SER A   5       0.000   0.000   0.000  1.00 10.00           C
ATOM      2  CB ASER A   5       1.000   0.000   0.000  0.60 10.00           C
ATOM      3  CB BSER A   5       1.200   0.000   0.000  0.40 10.00           C
END
";
        let mol = read_molecule(&write_pdb(&dir, "alt.pdb", text), PdbReadOptions::default()).unwrap();
        assert_eq!(mol.num_atoms(), 2);
        let cb = mol.atoms().iter().position(|a| a.name == "CB").unwrap();
        assert_eq!(mol.conformer(0).unwrap().positions[cb].x, 1.0);
    }

    #[test]
    fn molecule_perceives_bonds_and_strips_hydrogens() {
        let dir = tempdir().unwrap();
        let mol = read_molecule(&write_pdb(&dir, "small.pdb", SMALL_PDB), PdbReadOptions::default()).unwrap();
        assert_eq!(mol.num_atoms(), 6);
        assert!(mol.atoms().iter().all(|a| !a.element.is_hydrogen()));
        // N-CA, CA-C, C=O perceived as single bonds; Zn and water stay isolated.
        assert_eq!(mol.num_bonds(), 3);
        assert_eq!(mol.fragments().len(), 3);
        assert_eq!(mol.num_conformers(), 1);
        let water = mol.atoms().iter().find(|a| a.residue.as_ref().unwrap().name == "HOH").unwrap();
        assert_eq!(water.residue.as_ref().unwrap().number, 201);
        assert_eq!(water.residue.as_ref().unwrap().chain, 'A');
    }

    #[test]
    fn molecule_can_keep_hydrogens() {
        let dir = tempdir().unwrap();
        let options = PdbReadOptions {
            remove_hydrogens: false,
            ..Default::default()
        };
        let mol = read_molecule(&write_pdb(&dir, "small.pdb", SMALL_PDB), options).unwrap();
        assert_eq!(mol.num_atoms(), 7);
        let h = mol.atoms().iter().position(|a| a.element.is_hydrogen()).unwrap();
        let n = mol.atoms().iter().position(|a| a.name == "N").unwrap();
        assert_eq!(mol.neighbors(h), vec![n]);
    }

    #[test]
    fn empty_structure_has_no_molecule() {
        let dir = tempdir().unwrap();
        let mut pdb = read_structure(&write_pdb(&dir, "small.pdb", SMALL_PDB)).unwrap();
        pdb.remove_residues_by(|_| true);
        assert!(matches!(to_molecule(&pdb, PdbReadOptions::default()), Err(PdbError::NoAtoms)));
    }
}
