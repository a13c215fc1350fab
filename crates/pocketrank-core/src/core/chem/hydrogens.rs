use super::sanitize::hybridization;
use crate::core::models::element::Element;
use crate::core::models::molecule::{MolAtom, Molecule, MoleculeError};
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry::place_hydrogens;
use nalgebra::Point3;

/// X-H bond length used when placing new hydrogens.
fn bond_length(element: Element) -> f64 {
    match element {
        Element::C => 1.09,
        Element::N => 1.01,
        Element::O => 0.96,
        Element::S => 1.34,
        _ => 1.0,
    }
}

/// Turns every implicit hydrogen into an explicit atom bonded to its parent.
///
/// New hydrogens are appended after the existing atoms. When the molecule has
/// conformers, each hydrogen is placed in every conformer along the free
/// valence directions of its parent. Returns the number of atoms added.
pub fn add_hydrogens(mol: &mut Molecule) -> Result<usize, MoleculeError> {
    let heavy_count = mol.num_atoms();
    let mut added = 0;
    for parent in 0..heavy_count {
        let count = mol.atoms()[parent].implicit_hydrogens as usize;
        if count == 0 {
            continue;
        }
        let element = mol.atoms()[parent].element;
        let hyb = hybridization(mol, parent);
        let neighbors = mol.neighbors(parent);

        let per_conformer: Vec<Vec<Point3<f64>>> = mol
            .conformers()
            .iter()
            .map(|conf| {
                let base = conf.positions[parent];
                let around: Vec<Point3<f64>> =
                    neighbors.iter().map(|&n| conf.positions[n]).collect();
                place_hydrogens(&base, &around, count, hyb, bond_length(element))
            })
            .collect();

        for k in 0..count {
            let positions: Vec<Point3<f64>> = per_conformer.iter().map(|p| p[k]).collect();
            let mut h = MolAtom::new(Element::H).with_name(&format!("H{}", added + 1));
            h.residue = mol.atoms()[parent].residue.clone();
            let index = mol.add_atom_with_positions(h, &positions)?;
            mol.add_bond(parent, index, BondOrder::Single)?;
            added += 1;
        }
        if let Some(atom) = mol.atom_mut(parent) {
            atom.implicit_hydrogens = 0;
        }
    }
    Ok(added)
}

/// Removes hydrogens bonded to exactly one heavy atom, folding them back into
/// that atom's implicit hydrogen count. Heavy atoms keep their relative
/// order. Isolated hydrogens and hydrogens bonded to other hydrogens stay.
/// Returns the number of atoms removed.
pub fn remove_hydrogens(mol: &mut Molecule) -> usize {
    let adjacency = mol.adjacency();
    let removable: Vec<bool> = (0..mol.num_atoms())
        .map(|i| {
            mol.atoms()[i].element.is_hydrogen()
                && adjacency[i].len() == 1
                && !mol.atoms()[adjacency[i][0]].element.is_hydrogen()
        })
        .collect();

    for (i, &remove) in removable.iter().enumerate() {
        if remove {
            let parent = adjacency[i][0];
            if let Some(atom) = mol.atom_mut(parent) {
                atom.implicit_hydrogens = atom.implicit_hydrogens.saturating_add(1);
            }
        }
    }
    mol.remove_atoms_where(|i, _| removable[i])
}
