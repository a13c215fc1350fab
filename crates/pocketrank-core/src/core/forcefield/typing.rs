use crate::core::chem::sanitize::hybridization;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry::Hybridization;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypingError {
    #[error("No force-field type for atom {index} ({element})")]
    UnsupportedElement { index: usize, element: Element },
}

fn has_double_bond(mol: &Molecule, atom: usize) -> bool {
    mol.bonds()
        .iter()
        .any(|b| b.contains(atom) && b.order == BondOrder::Double)
}

/// True when a saturated N or O sits next to an sp2/aromatic atom (amides,
/// anilines, esters), which the force field treats as resonant.
fn is_conjugated_heteroatom(mol: &Molecule, atom: usize) -> bool {
    mol.neighbors(atom).into_iter().any(|n| {
        mol.atoms()[n].is_aromatic || hybridization(mol, n) == Hybridization::Sp2
    })
}

/// Assigns a UFF atom type label to one atom.
pub fn uff_type(mol: &Molecule, atom: usize) -> Result<&'static str, TypingError> {
    let info = &mol.atoms()[atom];
    let hyb = hybridization(mol, atom);
    let label = match info.element {
        Element::H => "H_",
        Element::C if info.is_aromatic => "C_R",
        Element::C => match hyb {
            Hybridization::Sp => "C_1",
            Hybridization::Sp2 => "C_2",
            Hybridization::Sp3 => "C_3",
        },
        Element::N if info.is_aromatic => "N_R",
        Element::N => match hyb {
            Hybridization::Sp => "N_1",
            Hybridization::Sp2 => "N_2",
            Hybridization::Sp3 if is_conjugated_heteroatom(mol, atom) => "N_R",
            Hybridization::Sp3 => "N_3",
        },
        Element::O if info.is_aromatic => "O_R",
        Element::O => match hyb {
            Hybridization::Sp => "O_1",
            Hybridization::Sp2 => "O_2",
            Hybridization::Sp3 => "O_3",
        },
        Element::S if info.is_aromatic => "S_R",
        Element::S if has_double_bond(mol, atom) && mol.degree(atom) == 1 => "S_2",
        Element::S => {
            let valence = mol.explicit_valence(atom).round() as usize + info.implicit_hydrogens as usize;
            match valence {
                0..=2 => "S_3+2",
                3 | 4 => "S_3+4",
                _ => "S_3+6",
            }
        }
        Element::P => {
            let valence = mol.explicit_valence(atom).round() as usize + info.implicit_hydrogens as usize;
            if valence <= 3 { "P_3+3" } else { "P_3+5" }
        }
        Element::F => "F_",
        Element::Cl => "Cl",
        Element::Br => "Br",
        Element::I => "I_",
        Element::B if mol.degree(atom) + info.implicit_hydrogens as usize >= 4 => "B_3",
        Element::B => "B_2",
        Element::Si => "Si3",
        Element::Se => "Se3+2",
        element => return Err(TypingError::UnsupportedElement { index: atom, element }),
    };
    Ok(label)
}

pub fn assign_uff_types(mol: &Molecule) -> Result<Vec<&'static str>, TypingError> {
    (0..mol.num_atoms()).map(|i| uff_type(mol, i)).collect()
}
