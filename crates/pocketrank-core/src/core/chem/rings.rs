use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use std::collections::{HashSet, VecDeque};

/// Ring membership of a molecule: for every ring bond, the smallest ring that
/// contains it, deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingInfo {
    /// Each ring as an ordered cycle of atom indices.
    pub rings: Vec<Vec<usize>>,
    ring_bonds: HashSet<(usize, usize)>,
    ring_atoms: HashSet<usize>,
}

fn bond_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

impl RingInfo {
    pub fn perceive(mol: &Molecule) -> Self {
        let adjacency = mol.adjacency();
        let mut info = RingInfo::default();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();

        for bond in mol.bonds() {
            let Some(path) = shortest_path_without_bond(&adjacency, bond.begin, bond.end) else {
                continue;
            };
            let mut canonical = path.clone();
            canonical.sort_unstable();
            if seen.insert(canonical) {
                for i in 0..path.len() {
                    let a = path[i];
                    let b = path[(i + 1) % path.len()];
                    info.ring_bonds.insert(bond_key(a, b));
                    info.ring_atoms.insert(a);
                }
                info.rings.push(path);
            }
        }
        info
    }

    pub fn is_ring_bond(&self, a: usize, b: usize) -> bool {
        self.ring_bonds.contains(&bond_key(a, b))
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.ring_atoms.contains(&atom)
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }
}

/// Breadth-first shortest path from `start` to `goal` that does not use the
/// direct bond between them. The returned path starts at `start` and ends at
/// `goal`.
fn shortest_path_without_bond(adjacency: &[Vec<usize>], start: usize, goal: usize) -> Option<Vec<usize>> {
    let mut previous = vec![usize::MAX; adjacency.len()];
    let mut queue = VecDeque::from([start]);
    previous[start] = start;
    while let Some(current) = queue.pop_front() {
        for &next in &adjacency[current] {
            if current == start && next == goal {
                continue;
            }
            if previous[next] != usize::MAX {
                continue;
            }
            previous[next] = current;
            if next == goal {
                let mut path = vec![goal];
                let mut node = goal;
                while node != start {
                    node = previous[node];
                    path.push(node);
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

/// Pi electrons an atom donates to a ring, or `None` if it breaks conjugation.
fn pi_electrons(mol: &Molecule, rings: &RingInfo, atom: usize) -> Option<u32> {
    let info = mol.atom(atom)?;
    let mut endocyclic_double = false;
    let mut exocyclic_double = false;
    for bond in mol.bonds().iter().filter(|b| b.contains(atom)) {
        let Some(other) = bond.partner(atom) else { continue };
        match bond.order {
            BondOrder::Double if rings.is_ring_bond(atom, other) => endocyclic_double = true,
            BondOrder::Double => exocyclic_double = true,
            BondOrder::Aromatic => endocyclic_double = true,
            BondOrder::Triple => return None,
            BondOrder::Single => {}
        }
    }
    if endocyclic_double {
        return Some(1);
    }
    if exocyclic_double {
        return (info.element == Element::C).then_some(0);
    }
    let saturation = mol.degree(atom) + info.implicit_hydrogens as usize;
    match info.element {
        Element::N | Element::P if saturation <= 3 && info.formal_charge <= 0 => Some(2),
        Element::O | Element::S | Element::Se if saturation <= 2 && info.formal_charge == 0 => Some(2),
        Element::C if info.formal_charge == -1 => Some(2),
        Element::C if info.formal_charge == 1 => Some(0),
        _ => None,
    }
}

/// Marks atoms and bonds of Hückel-aromatic 5- to 7-membered rings as aromatic.
///
/// Expects a Kekulé structure (explicit single/double bonds). Returns the
/// number of aromatic rings found.
pub fn perceive_aromaticity(mol: &mut Molecule, rings: &RingInfo) -> usize {
    let aromatic_rings: Vec<&Vec<usize>> = rings
        .rings
        .iter()
        .filter(|ring| (5..=7).contains(&ring.len()))
        .filter(|ring| {
            let electrons: Option<u32> = ring.iter().map(|&a| pi_electrons(mol, rings, a)).sum();
            matches!(electrons, Some(e) if e % 4 == 2)
        })
        .collect();

    for ring in &aromatic_rings {
        for i in 0..ring.len() {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];
            if let Some(atom) = mol.atom_mut(a) {
                atom.is_aromatic = true;
            }
            if let Some(bond) = mol.bonds_mut().iter_mut().find(|bond| bond.connects(a, b)) {
                bond.order = BondOrder::Aromatic;
            }
        }
    }
    aromatic_rings.len()
}
