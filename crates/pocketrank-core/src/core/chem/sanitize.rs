use super::rings::{RingInfo, perceive_aromaticity};
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry::Hybridization;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq)]
pub enum SanitizeError {
    #[error(
        "Explicit valence {valence} for atom {index} ({element}, charge {charge}) exceeds the allowed maximum"
    )]
    Valence {
        index: usize,
        element: Element,
        charge: i8,
        valence: f64,
    },
    #[error("Cannot assign a Kekulé structure to the aromatic system containing atom {0}")]
    Kekulize(usize),
    #[error("Molecule has no atoms")]
    Empty,
}

/// Valence states an atom may take given its formal charge, in increasing
/// order. `None` means the element's bonding is not checked.
pub fn allowed_valences(element: Element, charge: i8) -> Option<Vec<u8>> {
    let base = element.default_valences();
    if base.is_empty() {
        return None;
    }
    let shifted = |delta: i8| -> Vec<u8> {
        base.iter()
            .filter_map(|&v| u8::try_from(v as i16 + delta as i16).ok())
            .collect()
    };
    let valences = match (element, charge) {
        (_, 0) => base.to_vec(),
        (Element::C | Element::Si, -1 | 1) => vec![3],
        (Element::B, -1) => vec![4],
        (Element::H | Element::F | Element::Cl | Element::Br | Element::I, -1 | 1) => vec![0],
        (Element::N | Element::P | Element::O | Element::S | Element::Se, c) => shifted(c),
        (_, c) => shifted(-c.abs()),
    };
    Some(valences)
}

fn max_valence(element: Element, charge: i8) -> Option<u8> {
    allowed_valences(element, charge).and_then(|v| v.last().copied())
}

/// Hybridization implied by the bonds around an atom.
pub fn hybridization(mol: &Molecule, atom: usize) -> Hybridization {
    let mut doubles = 0;
    for bond in mol.bonds().iter().filter(|b| b.contains(atom)) {
        match bond.order {
            BondOrder::Triple => return Hybridization::Sp,
            BondOrder::Double => doubles += 1,
            BondOrder::Aromatic => return Hybridization::Sp2,
            BondOrder::Single => {}
        }
    }
    match doubles {
        0 if mol.atom(atom).is_some_and(|a| a.is_aromatic) => Hybridization::Sp2,
        0 => Hybridization::Sp3,
        1 => Hybridization::Sp2,
        _ => Hybridization::Sp,
    }
}

/// Replaces aromatic bonds by alternating single and double bonds.
///
/// Every aromatic carbon with a free valence must receive exactly one double
/// bond; heteroatoms with a free valence may stay single-bonded (pyrrole-type).
pub fn kekulize(mol: &mut Molecule) -> Result<(), SanitizeError> {
    let aromatic_bonds: Vec<usize> = mol
        .bonds()
        .iter()
        .enumerate()
        .filter(|(_, b)| b.order == BondOrder::Aromatic)
        .map(|(i, _)| i)
        .collect();
    if aromatic_bonds.is_empty() {
        return Ok(());
    }

    let n = mol.num_atoms();
    let mut aromatic_neighbors: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    for &bi in &aromatic_bonds {
        let bond = mol.bonds()[bi];
        aromatic_neighbors[bond.begin].push((bond.end, bi));
        aromatic_neighbors[bond.end].push((bond.begin, bi));
    }

    // 0 = not a candidate, 1 = optional, 2 = must get a double bond.
    let mut demand = vec![0u8; n];
    for atom in 0..n {
        if aromatic_neighbors[atom].is_empty() {
            continue;
        }
        let info = &mol.atoms()[atom];
        let Some(max) = max_valence(info.element, info.formal_charge) else {
            continue;
        };
        let non_aromatic: f64 = mol
            .bonds()
            .iter()
            .filter(|b| b.contains(atom) && b.order != BondOrder::Aromatic)
            .map(|b| b.order.valence())
            .sum();
        let used = non_aromatic as usize
            + aromatic_neighbors[atom].len()
            + info.implicit_hydrogens as usize;
        if used < max as usize {
            demand[atom] = if info.element == Element::C { 2 } else { 1 };
        }
    }

    let mut partner = vec![None; n];
    let order: Vec<usize> = (0..n).filter(|&a| demand[a] > 0).collect();
    if !match_double_bonds(&order, 0, &demand, &aromatic_neighbors, &mut partner) {
        let culprit = order.first().copied().unwrap_or(0);
        return Err(SanitizeError::Kekulize(culprit));
    }

    let bonds = mol.bonds_mut();
    for &bi in &aromatic_bonds {
        bonds[bi].order = BondOrder::Single;
    }
    for atom in 0..n {
        if let Some(bi) = partner[atom] {
            bonds[bi].order = BondOrder::Double;
        }
    }
    Ok(())
}

/// Backtracking perfect matching over the candidate atoms in `order`.
/// `partner[a]` holds the index of the bond that becomes double at `a`.
fn match_double_bonds(
    order: &[usize],
    pos: usize,
    demand: &[u8],
    neighbors: &[Vec<(usize, usize)>],
    partner: &mut [Option<usize>],
) -> bool {
    let Some(&atom) = order.get(pos) else {
        return true;
    };
    if partner[atom].is_some() {
        return match_double_bonds(order, pos + 1, demand, neighbors, partner);
    }
    for &(other, bond) in &neighbors[atom] {
        if demand[other] == 0 || partner[other].is_some() {
            continue;
        }
        partner[atom] = Some(bond);
        partner[other] = Some(bond);
        if match_double_bonds(order, pos + 1, demand, neighbors, partner) {
            return true;
        }
        partner[atom] = None;
        partner[other] = None;
    }
    demand[atom] == 1 && match_double_bonds(order, pos + 1, demand, neighbors, partner)
}

/// Checks valences and assigns implicit hydrogen counts from the smallest
/// allowed valence that accommodates the explicit bonds.
pub fn assign_implicit_hydrogens(mol: &mut Molecule) -> Result<(), SanitizeError> {
    for atom in 0..mol.num_atoms() {
        let valence = mol.explicit_valence(atom);
        let info = &mol.atoms()[atom];
        let Some(allowed) = allowed_valences(info.element, info.formal_charge) else {
            continue;
        };
        let needed = valence.round() as i64;
        let Some(&target) = allowed.iter().find(|&&v| v as i64 >= needed) else {
            return Err(SanitizeError::Valence {
                index: atom,
                element: info.element,
                charge: info.formal_charge,
                valence,
            });
        };
        let implicit = (target as i64 - needed) as u8;
        if let Some(info) = mol.atom_mut(atom) {
            info.implicit_hydrogens = implicit;
        }
    }
    Ok(())
}

/// Like [`assign_implicit_hydrogens`] but never fails: over-valent atoms get
/// zero implicit hydrogens. Used for structures perceived from coordinates,
/// whose bond orders are all single.
pub fn assign_implicit_hydrogens_lenient(mol: &mut Molecule) {
    for atom in 0..mol.num_atoms() {
        let needed = mol.explicit_valence(atom).round() as i64;
        let info = &mol.atoms()[atom];
        let implicit = allowed_valences(info.element, info.formal_charge)
            .and_then(|allowed| allowed.into_iter().find(|&v| v as i64 >= needed))
            .map_or(0, |target| (target as i64 - needed) as u8);
        if let Some(info) = mol.atom_mut(atom) {
            info.implicit_hydrogens = implicit;
        }
    }
}

/// Brings a freshly read molecule into a chemically consistent state.
///
/// Kekulizes aromatic input, validates valences, assigns implicit hydrogens,
/// then perceives rings and re-marks aromatic rings. Returns the ring
/// information computed along the way.
pub fn sanitize(mol: &mut Molecule) -> Result<RingInfo, SanitizeError> {
    if mol.num_atoms() == 0 {
        return Err(SanitizeError::Empty);
    }
    for atom in mol.atoms_mut() {
        atom.is_aromatic = false;
    }
    kekulize(mol)?;
    assign_implicit_hydrogens(mol)?;
    let rings = RingInfo::perceive(mol);
    let aromatic = perceive_aromaticity(mol, &rings);
    trace!(
        atoms = mol.num_atoms(),
        rings = rings.num_rings(),
        aromatic,
        "Sanitized molecule"
    );
    Ok(rings)
}
