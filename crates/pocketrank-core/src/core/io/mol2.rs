use crate::core::io::generic::{GenericError, molecule_from_generic};
use crate::core::models::molecule::Molecule;
use bio_files::Mol2;
use std::fs;
use std::io::{self, BufRead, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Mol2Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing @<TRIPOS>ATOM section")]
    MissingAtomSection,
    #[error("Invalid MOL2 record: {0}")]
    Record(#[from] GenericError),
}

/// Formal charge implied by a SYBYL atom type: `+1` for `N.4`, `-1` for a
/// carboxylate oxygen that is singly bonded to exactly one neighbor.
fn sybyl_charge(molecule: &Molecule, index: usize, atom_type: &str) -> i8 {
    match atom_type {
        "N.4" => 1,
        "O.co2" if molecule.degree(index) == 1 && molecule.explicit_valence(index) == 1.0 => -1,
        _ => 0,
    }
}

/// Reads TRIPOS MOL2 files through `bio_files`.
///
/// Formal charges are not stored in MOL2; they are inferred from the SYBYL
/// atom types once bonds are known.
pub struct Mol2File;

impl Mol2File {
    pub fn read_from(reader: &mut impl BufRead) -> Result<Molecule, Mol2Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Molecule, Mol2Error> {
        Self::parse(&fs::read_to_string(path)?)
    }

    fn parse(text: &str) -> Result<Molecule, Mol2Error> {
        if !text.contains("@<TRIPOS>ATOM") {
            return Err(Mol2Error::MissingAtomSection);
        }
        let mol2 = Mol2::new(text)?;
        let mut molecule = molecule_from_generic(&mol2.ident, &mol2.atoms, &mol2.bonds)?;
        let charges: Vec<i8> = mol2
            .atoms
            .iter()
            .enumerate()
            .map(|(i, atom)| sybyl_charge(&molecule, i, atom.force_field_type.as_deref().unwrap_or("")))
            .collect();
        for (atom, charge) in molecule.atoms_mut().iter_mut().zip(charges) {
            atom.formal_charge = charge;
        }
        Ok(molecule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;
    use std::io::Cursor;
    use tempfile::tempdir;

    const GLYCINE_MOL2: &str = "\
@<TRIPOS>MOLECULE
glycine
 5 4 1 0 0
SMALL
NO_CHARGES

@<TRIPOS>ATOM
      1 N1          0.0000    0.0000    0.0000 N.4       1 GLY      0.0000
      2 CA          1.4700    0.0000    0.0000 C.3       1 GLY      0.0000
      3 C           2.0000    1.4200    0.0000 C.2       1 GLY      0.0000
      4 O1          1.3000    2.4000    0.0000 O.co2     1 GLY      0.0000
      5 O2          3.2000    1.6000    0.0000 O.co2     1 GLY      0.0000
@<TRIPOS>BOND
     1     1     2 1
     2     2     3 1
     3     3     4 2
     4     3     5 1
";

    #[test]
    fn read_derives_elements_and_bonds() {
        let mol = Mol2File::read_from(&mut Cursor::new(GLYCINE_MOL2)).unwrap();
        assert_eq!(mol.name, "glycine");
        assert_eq!(mol.num_atoms(), 5);
        assert_eq!(mol.atoms()[0].element, Element::N);
        assert_eq!(mol.atoms()[3].element, Element::O);
        assert_eq!(mol.num_bonds(), 4);
        assert!(mol.bonds().iter().any(|b| b.connects(2, 3) && b.order == BondOrder::Double));
    }

    #[test]
    fn read_infers_charges_from_sybyl_types() {
        let mol = Mol2File::read_from(&mut Cursor::new(GLYCINE_MOL2)).unwrap();
        let charges: Vec<i8> = mol.atoms().iter().map(|a| a.formal_charge).collect();
        assert_eq!(charges, vec![1, 0, 0, 0, -1]);
    }

    #[test]
    fn read_rejects_bonds_to_unknown_atoms() {
        let text = GLYCINE_MOL2.replace("     4     3     5 1", "     4     3     9 1");
        let err = Mol2File::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(err, Mol2Error::Record(GenericError::UnknownAtomSerial(9))));
    }

    #[test]
    fn read_requires_atom_section() {
        let err = Mol2File::read_from(&mut Cursor::new("garbage\n")).unwrap_err();
        assert!(matches!(err, Mol2Error::MissingAtomSection));
    }

    #[test]
    fn read_from_path_matches_reader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gly.mol2");
        std::fs::write(&path, GLYCINE_MOL2).unwrap();
        let mol = Mol2File::read_from_path(&path).unwrap();
        assert_eq!(mol.num_atoms(), 5);
        assert_eq!(mol.num_conformers(), 1);
    }

    #[test]
    fn read_from_path_reports_missing_file() {
        let dir = tempdir().unwrap();
        let err = Mol2File::read_from_path(dir.path().join("absent.mol2")).unwrap_err();
        assert!(matches!(err, Mol2Error::Io(_)));
    }
}
