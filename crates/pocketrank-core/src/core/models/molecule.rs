use super::element::Element;
use super::topology::{Bond, BondOrder};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoleculeError {
    #[error("Atom index {index} is out of range for a molecule with {len} atoms")]
    AtomIndexOutOfRange { index: usize, len: usize },
    #[error("Atom {0} cannot be bonded to itself")]
    SelfBond(usize),
    #[error("Conformer has {found} positions but the molecule has {expected} atoms")]
    ConformerSizeMismatch { expected: usize, found: usize },
    #[error("Expected {expected} positions (one per conformer), got {found}")]
    PositionCountMismatch { expected: usize, found: usize },
}

/// Residue provenance of an atom that came from a macromolecular file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidueInfo {
    pub name: String,
    pub number: isize,
    pub chain: char,
    pub insertion_code: Option<char>,
}

/// An atom of a chemical graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolAtom {
    pub element: Element,
    pub name: String,
    pub formal_charge: i8,
    pub is_aromatic: bool,
    /// Hydrogens implied by valence but not present as explicit atoms.
    pub implicit_hydrogens: u8,
    pub residue: Option<ResidueInfo>,
}

impl MolAtom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            name: element.symbol().to_string(),
            formal_charge: 0,
            is_aromatic: false,
            implicit_hydrogens: 0,
            residue: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_charge(mut self, charge: i8) -> Self {
        self.formal_charge = charge;
        self
    }

    pub fn with_residue(mut self, residue: ResidueInfo) -> Self {
        self.residue = Some(residue);
        self
    }
}

/// One set of 3D coordinates for every atom of a molecule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conformer {
    pub positions: Vec<Point3<f64>>,
}

impl Conformer {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self { positions }
    }

    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.positions.is_empty() {
            return None;
        }
        let sum = self
            .positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / self.positions.len() as f64))
    }
}

/// A chemical graph: atoms, bonds, and zero or more conformers.
///
/// Every conformer holds exactly one position per atom; the mutating methods
/// keep that true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub name: String,
    atoms: Vec<MolAtom>,
    bonds: Vec<Bond>,
    conformers: Vec<Conformer>,
}

impl Molecule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn atoms(&self) -> &[MolAtom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&MolAtom> {
        self.atoms.get(index)
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut MolAtom> {
        self.atoms.get_mut(index)
    }

    pub fn atoms_mut(&mut self) -> &mut [MolAtom] {
        &mut self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn bonds_mut(&mut self) -> &mut [Bond] {
        &mut self.bonds
    }

    pub fn conformers(&self) -> &[Conformer] {
        &self.conformers
    }

    pub fn conformer(&self, index: usize) -> Option<&Conformer> {
        self.conformers.get(index)
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    pub fn num_conformers(&self) -> usize {
        self.conformers.len()
    }

    /// Appends an atom to a molecule that has no conformers yet.
    ///
    /// Use [`add_atom_with_positions`](Self::add_atom_with_positions) once
    /// coordinates exist.
    pub fn add_atom(&mut self, atom: MolAtom) -> Result<usize, MoleculeError> {
        self.add_atom_with_positions(atom, &[])
    }

    /// Appends an atom together with its position in each existing conformer.
    pub fn add_atom_with_positions(
        &mut self,
        atom: MolAtom,
        positions: &[Point3<f64>],
    ) -> Result<usize, MoleculeError> {
        if positions.len() != self.conformers.len() {
            return Err(MoleculeError::PositionCountMismatch {
                expected: self.conformers.len(),
                found: positions.len(),
            });
        }
        for (conformer, &p) in self.conformers.iter_mut().zip(positions) {
            conformer.positions.push(p);
        }
        self.atoms.push(atom);
        Ok(self.atoms.len() - 1)
    }

    /// Adds a bond. Adding a bond that already exists is a no-op.
    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Result<(), MoleculeError> {
        let len = self.atoms.len();
        for index in [a, b] {
            if index >= len {
                return Err(MoleculeError::AtomIndexOutOfRange { index, len });
            }
        }
        if a == b {
            return Err(MoleculeError::SelfBond(a));
        }
        if self.bond_between(a, b).is_none() {
            self.bonds.push(Bond::new(a, b, order));
        }
        Ok(())
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<&Bond> {
        self.bonds.iter().find(|bond| bond.connects(a, b))
    }

    pub fn add_conformer(&mut self, conformer: Conformer) -> Result<usize, MoleculeError> {
        if conformer.positions.len() != self.atoms.len() {
            return Err(MoleculeError::ConformerSizeMismatch {
                expected: self.atoms.len(),
                found: conformer.positions.len(),
            });
        }
        self.conformers.push(conformer);
        Ok(self.conformers.len() - 1)
    }

    pub fn clear_conformers(&mut self) {
        self.conformers.clear();
    }

    /// Keeps only the conformer at `index`. Returns false if it does not exist.
    pub fn keep_only_conformer(&mut self, index: usize) -> bool {
        if index >= self.conformers.len() {
            return false;
        }
        let kept = self.conformers.swap_remove(index);
        self.conformers = vec![kept];
        true
    }

    pub fn neighbors(&self, atom: usize) -> Vec<usize> {
        self.bonds.iter().filter_map(|b| b.partner(atom)).collect()
    }

    /// Neighbor lists for every atom, indexed by atom.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.atoms.len()];
        for bond in &self.bonds {
            adjacency[bond.begin].push(bond.end);
            adjacency[bond.end].push(bond.begin);
        }
        adjacency
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.bonds.iter().filter(|b| b.contains(atom)).count()
    }

    /// Sum of bond valence contributions around an atom.
    pub fn explicit_valence(&self, atom: usize) -> f64 {
        self.bonds
            .iter()
            .filter(|b| b.contains(atom))
            .map(|b| b.order.valence())
            .sum()
    }

    /// Explicit hydrogen neighbors plus implicit hydrogens.
    pub fn total_hydrogens(&self, atom: usize) -> usize {
        let explicit = self
            .neighbors(atom)
            .into_iter()
            .filter(|&n| self.atoms[n].element.is_hydrogen())
            .count();
        explicit + self.atoms.get(atom).map_or(0, |a| a.implicit_hydrogens as usize)
    }

    /// Connected components as sorted atom index lists, ordered by their
    /// lowest atom index.
    pub fn fragments(&self) -> Vec<Vec<usize>> {
        let adjacency = self.adjacency();
        let mut seen = vec![false; self.atoms.len()];
        let mut fragments = Vec::new();
        for start in 0..self.atoms.len() {
            if seen[start] {
                continue;
            }
            let mut stack = vec![start];
            let mut fragment = Vec::new();
            seen[start] = true;
            while let Some(current) = stack.pop() {
                fragment.push(current);
                for &next in &adjacency[current] {
                    if !seen[next] {
                        seen[next] = true;
                        stack.push(next);
                    }
                }
            }
            fragment.sort_unstable();
            fragments.push(fragment);
        }
        fragments
    }

    /// Removes every atom for which `predicate` returns true, together with its
    /// bonds and coordinates. Surviving atoms keep their relative order.
    /// Returns the number of atoms removed.
    pub fn remove_atoms_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(usize, &MolAtom) -> bool,
    {
        let remove: Vec<bool> = self
            .atoms
            .iter()
            .enumerate()
            .map(|(i, atom)| predicate(i, atom))
            .collect();
        let removed = remove.iter().filter(|&&r| r).count();
        if removed == 0 {
            return 0;
        }

        let mut new_index = vec![None; self.atoms.len()];
        let mut next = 0;
        for (i, &gone) in remove.iter().enumerate() {
            if !gone {
                new_index[i] = Some(next);
                next += 1;
            }
        }

        let mut i = 0;
        self.atoms.retain(|_| {
            let keep = !remove[i];
            i += 1;
            keep
        });
        for conformer in &mut self.conformers {
            let mut j = 0;
            conformer.positions.retain(|_| {
                let keep = !remove[j];
                j += 1;
                keep
            });
        }
        self.bonds = self
            .bonds
            .iter()
            .filter_map(|b| match (new_index[b.begin], new_index[b.end]) {
                (Some(begin), Some(end)) => Some(Bond::new(begin, end, b.order)),
                _ => None,
            })
            .collect();
        removed
    }
}
