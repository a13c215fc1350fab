use crate::core::models::element::Element;
use crate::core::models::molecule::{Conformer, MolAtom, Molecule, MoleculeError};
use crate::core::models::topology::BondOrder;
use bio_files::{AtomGeneric, BondGeneric, BondType};
use nalgebra::Point3;
use std::collections::HashMap;
use thiserror::Error;

/// Failures while turning `bio_files` atoms and bonds into a [`Molecule`].
#[derive(Debug, Error)]
pub enum GenericError {
    #[error("Unsupported element '{0}'")]
    UnknownElement(String),
    #[error("Bond references unknown atom serial number {0}")]
    UnknownAtomSerial(u32),
    #[error("No atoms found")]
    NoAtoms,
    #[error("Invalid molecule: {0}")]
    Molecule(#[from] MoleculeError),
}

/// Aromatic bonds stay aromatic; amide, dummy, and unknown bonds read as single.
fn bond_order(bond_type: &BondType) -> BondOrder {
    match bond_type {
        BondType::Double => BondOrder::Double,
        BondType::Triple => BondOrder::Triple,
        BondType::Aromatic => BondOrder::Aromatic,
        _ => BondOrder::Single,
    }
}

/// Builds a one-conformer molecule from the generic atom and bond lists that
/// `bio_files` parses small-molecule formats into. Atoms keep file order; bonds
/// are resolved through atom serial numbers.
pub fn molecule_from_generic(
    name: &str,
    atoms: &[AtomGeneric],
    bonds: &[BondGeneric],
) -> Result<Molecule, GenericError> {
    if atoms.is_empty() {
        return Err(GenericError::NoAtoms);
    }

    let mut molecule = Molecule::new(name.trim());
    let mut positions = Vec::with_capacity(atoms.len());
    let mut index_by_serial = HashMap::with_capacity(atoms.len());
    for atom in atoms {
        let symbol = atom.element.to_letter();
        let element = match symbol.parse::<Element>() {
            Ok(element) if element != Element::Unknown => element,
            _ => return Err(GenericError::UnknownElement(symbol.to_string())),
        };
        let index = molecule.add_atom(MolAtom::new(element))?;
        index_by_serial.insert(atom.serial_number, index);
        positions.push(Point3::new(atom.posit.x, atom.posit.y, atom.posit.z));
    }

    for bond in bonds {
        let resolve = |serial: u32| {
            index_by_serial
                .get(&serial)
                .copied()
                .ok_or(GenericError::UnknownAtomSerial(serial))
        };
        let a = resolve(bond.atom_0_sn)?;
        let b = resolve(bond.atom_1_sn)?;
        molecule.add_bond(a, b, bond_order(&bond.bond_type))?;
    }

    molecule.add_conformer(Conformer::new(positions))?;
    Ok(molecule)
}
