use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::residue::is_water_name;

/// Removes water from a molecule: every fragment that is a lone oxygen atom,
/// and every atom whose residue is named `HOH`, `WAT`, or `DOD`. Returns the
/// number of atoms removed.
pub fn strip_water(mol: &mut Molecule) -> usize {
    let mut remove = vec![false; mol.num_atoms()];
    for fragment in mol.fragments() {
        if let [only] = fragment.as_slice() {
            if mol.atoms()[*only].element == Element::O {
                remove[*only] = true;
            }
        }
    }
    for (i, atom) in mol.atoms().iter().enumerate() {
        if atom.residue.as_ref().is_some_and(|r| is_water_name(&r.name)) {
            remove[i] = true;
        }
    }
    mol.remove_atoms_where(|i, _| remove[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::{MolAtom, ResidueInfo};
    use crate::core::models::topology::BondOrder;

    fn residue(name: &str) -> ResidueInfo {
        ResidueInfo {
            name: name.to_string(),
            number: 1,
            chain: 'A',
            insertion_code: None,
        }
    }

    #[test]
    fn strip_water_removes_lone_oxygens_and_water_residues() {
        let mut mol = Molecule::new("pocket");
        let c = mol.add_atom(MolAtom::new(Element::C)).unwrap();
        let o = mol.add_atom(MolAtom::new(Element::O)).unwrap();
        mol.add_bond(c, o, BondOrder::Single).unwrap();
        mol.add_atom(MolAtom::new(Element::O)).unwrap();
        mol.add_atom(MolAtom::new(Element::O).with_residue(residue("HOH"))).unwrap();
        mol.add_atom(MolAtom::new(Element::H).with_residue(residue("WAT"))).unwrap();
        mol.add_atom(MolAtom::new(Element::Zn)).unwrap();

        assert_eq!(strip_water(&mut mol), 3);
        let elements: Vec<Element> = mol.atoms().iter().map(|a| a.element).collect();
        assert_eq!(elements, vec![Element::C, Element::O, Element::Zn]);
        assert_eq!(mol.num_bonds(), 1);
    }

    #[test]
    fn strip_water_keeps_bonded_oxygen() {
        let mut mol = Molecule::new("methanol");
        let c = mol.add_atom(MolAtom::new(Element::C)).unwrap();
        let o = mol.add_atom(MolAtom::new(Element::O).with_residue(residue("SER"))).unwrap();
        mol.add_bond(c, o, BondOrder::Single).unwrap();
        assert_eq!(strip_water(&mut mol), 0);
    }
}
