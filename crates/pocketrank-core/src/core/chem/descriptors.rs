use super::rings::RingInfo;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;

fn heavy_degree(mol: &Molecule, atom: usize) -> usize {
    mol.neighbors(atom)
        .into_iter()
        .filter(|&n| !mol.atoms()[n].element.is_hydrogen())
        .count()
}

fn has_triple_bond(mol: &Molecule, atom: usize) -> bool {
    mol.bonds()
        .iter()
        .any(|b| b.contains(atom) && b.order == BondOrder::Triple)
}

fn is_carbonyl_carbon(mol: &Molecule, atom: usize) -> bool {
    mol.atoms()[atom].element == Element::C
        && mol.bonds().iter().any(|b| {
            b.order == BondOrder::Double
                && b.partner(atom)
                    .is_some_and(|o| matches!(mol.atoms()[o].element, Element::O | Element::S))
        })
}

fn is_amide_bond(mol: &Molecule, a: usize, b: usize) -> bool {
    let is_n = |i: usize| mol.atoms()[i].element == Element::N;
    (is_carbonyl_carbon(mol, a) && is_n(b)) || (is_carbonyl_carbon(mol, b) && is_n(a))
}

/// Indices of rotatable bonds: acyclic single bonds between two atoms that
/// each have another heavy neighbor, excluding bonds to sp carbons and amide
/// C-N bonds.
pub fn rotatable_bonds(mol: &Molecule, rings: &RingInfo) -> Vec<usize> {
    mol.bonds()
        .iter()
        .enumerate()
        .filter(|(_, bond)| {
            bond.order == BondOrder::Single
                && !rings.is_ring_bond(bond.begin, bond.end)
                && heavy_degree(mol, bond.begin) >= 2
                && heavy_degree(mol, bond.end) >= 2
                && !has_triple_bond(mol, bond.begin)
                && !has_triple_bond(mol, bond.end)
                && !is_amide_bond(mol, bond.begin, bond.end)
        })
        .map(|(i, _)| i)
        .collect()
}

pub fn rotatable_bond_count(mol: &Molecule) -> usize {
    rotatable_bonds(mol, &RingInfo::perceive(mol)).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::MolAtom;

    fn chain(elements: &[Element]) -> Molecule {
        let mut mol = Molecule::new("chain");
        for &el in elements {
            mol.add_atom(MolAtom::new(el)).unwrap();
        }
        for i in 1..elements.len() {
            mol.add_bond(i - 1, i, BondOrder::Single).unwrap();
        }
        mol
    }

    #[test]
    fn butane_has_one_rotatable_bond() {
        let mol = chain(&[Element::C; 4]);
        assert_eq!(rotatable_bond_count(&mol), 1);
    }

    #[test]
    fn terminal_bonds_are_not_rotatable() {
        assert_eq!(rotatable_bond_count(&chain(&[Element::C; 3])), 0);
    }

    #[test]
    fn amide_bond_is_not_rotatable() {
        // C-C(=O)-N-C
        let mut mol = chain(&[Element::C, Element::C, Element::N, Element::C]);
        let o = mol.add_atom(MolAtom::new(Element::O)).unwrap();
        mol.add_bond(1, o, BondOrder::Double).unwrap();
        // C0-C1 and N2-C3 are terminal; C1-N2 is the amide.
        assert_eq!(rotatable_bond_count(&mol), 0);
    }

    #[test]
    fn ring_bonds_are_not_rotatable() {
        let mut mol = chain(&[Element::C; 6]);
        mol.add_bond(5, 0, BondOrder::Single).unwrap();
        assert_eq!(rotatable_bond_count(&mol), 0);
        let extra = mol.add_atom(MolAtom::new(Element::C)).unwrap();
        let tip = mol.add_atom(MolAtom::new(Element::C)).unwrap();
        mol.add_bond(0, extra, BondOrder::Single).unwrap();
        mol.add_bond(extra, tip, BondOrder::Single).unwrap();
        assert_eq!(rotatable_bond_count(&mol), 1);
    }
}
