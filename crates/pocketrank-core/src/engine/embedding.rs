use crate::core::chem::sanitize::hybridization;
use crate::core::forcefield::minimize::{MinimizeOptions, conjugate_gradient};
use crate::core::forcefield::energy::flatten;
use crate::core::models::molecule::{Conformer, Molecule};
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry::{Hybridization, TETRAHEDRAL_ANGLE};
use nalgebra::Point3;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{debug, instrument};

/// Produces candidate 3D conformers for a molecular graph.
pub trait Embedder {
    /// Returns up to `count` conformers. Fewer (possibly none) are returned
    /// when embedding fails.
    fn embed(&self, mol: &Molecule, count: usize) -> Vec<Conformer>;
}

/// Lower bound between atoms that are neither bonded nor share a neighbor.
const HEAVY_CONTACT: f64 = 2.5;
const HYDROGEN_CONTACT: f64 = 1.8;

/// Largest tolerated deviation from a bonded or 1-3 target after embedding.
const MAX_TARGET_DEVIATION: f64 = 0.35;
const MAX_CONTACT_VIOLATION: f64 = 0.6;

const ATTEMPTS_PER_CONFORMER: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
enum PairKind {
    /// Bonded or 1-3 pair with a target distance.
    Target(f64),
    /// Any other pair: only a minimum separation.
    Contact(f64),
}

#[derive(Debug, Clone, Copy)]
struct PairBound {
    i: usize,
    j: usize,
    kind: PairKind,
}

fn bond_length(mol: &Molecule, i: usize, j: usize, order: BondOrder) -> f64 {
    let sum = mol.atoms()[i].element.covalent_radius() + mol.atoms()[j].element.covalent_radius();
    let scale = match order {
        BondOrder::Single => 1.0,
        BondOrder::Aromatic => 0.93,
        BondOrder::Double => 0.87,
        BondOrder::Triple => 0.78,
    };
    sum * scale
}

fn ideal_angle(hyb: Hybridization) -> f64 {
    match hyb {
        Hybridization::Sp => 180.0,
        Hybridization::Sp2 => 120.0,
        Hybridization::Sp3 => TETRAHEDRAL_ANGLE,
    }
}

fn pair_bounds(mol: &Molecule) -> Vec<PairBound> {
    let n = mol.num_atoms();
    let mut kinds: Vec<Option<PairKind>> = vec![None; n * n];
    let mut lengths = vec![0.0; n * n];

    for bond in mol.bonds() {
        let d = bond_length(mol, bond.begin, bond.end, bond.order);
        lengths[bond.begin * n + bond.end] = d;
        lengths[bond.end * n + bond.begin] = d;
        kinds[bond.begin * n + bond.end] = Some(PairKind::Target(d));
        kinds[bond.end * n + bond.begin] = Some(PairKind::Target(d));
    }

    let adjacency = mol.adjacency();
    for (center, neighbors) in adjacency.iter().enumerate() {
        let cos = ideal_angle(hybridization(mol, center)).to_radians().cos();
        for (x, &a) in neighbors.iter().enumerate() {
            for &b in &neighbors[x + 1..] {
                if kinds[a * n + b].is_some() {
                    continue;
                }
                let (ra, rb) = (lengths[a * n + center], lengths[center * n + b]);
                let d = (ra * ra + rb * rb - 2.0 * ra * rb * cos).sqrt();
                kinds[a * n + b] = Some(PairKind::Target(d));
                kinds[b * n + a] = Some(PairKind::Target(d));
            }
        }
    }

    let mut bounds = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let kind = kinds[i * n + j].unwrap_or_else(|| {
                let with_h = mol.atoms()[i].element.is_hydrogen() || mol.atoms()[j].element.is_hydrogen();
                PairKind::Contact(if with_h { HYDROGEN_CONTACT } else { HEAVY_CONTACT })
            });
            bounds.push(PairBound { i, j, kind });
        }
    }
    bounds
}

fn bounds_error(bounds: &[PairBound], x: &[f64], grad: &mut [f64]) -> f64 {
    grad.iter_mut().for_each(|g| *g = 0.0);
    let mut error = 0.0;
    for b in bounds {
        let (pi, pj) = (3 * b.i, 3 * b.j);
        let delta = [x[pi] - x[pj], x[pi + 1] - x[pj + 1], x[pi + 2] - x[pj + 2]];
        let d = (delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2]).sqrt().max(1e-8);
        let violation = match b.kind {
            PairKind::Target(t) => d - t,
            PairKind::Contact(lb) if d < lb => d - lb,
            PairKind::Contact(_) => continue,
        };
        error += violation * violation;
        let scale = 2.0 * violation / d;
        for k in 0..3 {
            grad[pi + k] += scale * delta[k];
            grad[pj + k] -= scale * delta[k];
        }
    }
    error
}

fn satisfies_bounds(bounds: &[PairBound], positions: &[Point3<f64>]) -> bool {
    bounds.iter().all(|b| {
        let d = nalgebra::distance(&positions[b.i], &positions[b.j]);
        match b.kind {
            PairKind::Target(t) => (d - t).abs() <= MAX_TARGET_DEVIATION,
            PairKind::Contact(lb) => d >= lb - MAX_CONTACT_VIOLATION,
        }
    })
}

/// Randomized distance-bounds embedding.
///
/// Each conformer starts from random coordinates and is minimized against
/// bonded lengths, 1-3 distances implied by ideal bond angles, and a contact
/// floor for every other pair. Conformer `k` draws from its own RNG stream
/// derived from the seed, so results do not depend on evaluation order.
#[derive(Debug, Clone)]
pub struct DistanceBoundsEmbedder {
    seed: u64,
    options: MinimizeOptions,
}

impl DistanceBoundsEmbedder {
    /// Without a seed, a fresh one is drawn from the thread RNG.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed: seed.unwrap_or_else(|| thread_rng().r#gen()),
            options: MinimizeOptions {
                max_iters: 500,
                grad_tolerance: 1e-3,
                energy_tolerance: 1e-8,
                max_step: 0.5,
            },
        }
    }

    fn stream(&self, conformer: usize, attempt: usize) -> StdRng {
        let mixed = self
            .seed
            .wrapping_add((conformer as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
            .wrapping_add((attempt as u64).wrapping_mul(0xD1B5_4A32_D192_ED03));
        StdRng::seed_from_u64(mixed)
    }

    fn embed_one(&self, n: usize, bounds: &[PairBound], rng: &mut StdRng) -> Option<Vec<Point3<f64>>> {
        let half_box = 1.5 * (n as f64).cbrt() + 1.0;
        let start: Vec<Point3<f64>> = (0..n)
            .map(|_| {
                Point3::new(
                    rng.gen_range(-half_box..half_box),
                    rng.gen_range(-half_box..half_box),
                    rng.gen_range(-half_box..half_box),
                )
            })
            .collect();
        let mut x = flatten(&start);
        conjugate_gradient(&mut x, |coords, grad| bounds_error(bounds, coords, grad), &self.options);
        let positions: Vec<Point3<f64>> = x.chunks_exact(3).map(|c| Point3::new(c[0], c[1], c[2])).collect();
        satisfies_bounds(bounds, &positions).then_some(positions)
    }
}

impl Embedder for DistanceBoundsEmbedder {
    #[instrument(level = "debug", skip_all, fields(atoms = mol.num_atoms(), count))]
    fn embed(&self, mol: &Molecule, count: usize) -> Vec<Conformer> {
        let n = mol.num_atoms();
        if n == 0 {
            return Vec::new();
        }
        let bounds = pair_bounds(mol);
        let mut conformers = Vec::with_capacity(count);
        for k in 0..count {
            let embedded = (0..ATTEMPTS_PER_CONFORMER).find_map(|attempt| {
                let mut rng = self.stream(k, attempt);
                self.embed_one(n, &bounds, &mut rng)
            });
            match embedded {
                Some(positions) => conformers.push(Conformer::new(positions)),
                None => debug!("Conformer {k} failed to satisfy distance bounds."),
            }
        }
        conformers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::hydrogens::add_hydrogens;
    use crate::core::chem::sanitize::sanitize;
    use crate::core::models::element::Element;
    use crate::core::models::molecule::MolAtom;

    fn ethanol_with_hydrogens() -> Molecule {
        let mut mol = Molecule::new("ethanol");
        for element in [Element::C, Element::C, Element::O] {
            mol.add_atom(MolAtom::new(element)).unwrap();
        }
        mol.add_bond(0, 1, BondOrder::Single).unwrap();
        mol.add_bond(1, 2, BondOrder::Single).unwrap();
        sanitize(&mut mol).unwrap();
        add_hydrogens(&mut mol).unwrap();
        mol
    }

    #[test]
    fn pair_bounds_classify_bonded_and_one_three_pairs() {
        let mol = ethanol_with_hydrogens();
        let bounds = pair_bounds(&mol);
        let find = |i, j| bounds.iter().find(|b| b.i == i && b.j == j).unwrap().kind;
        assert_eq!(find(0, 1), PairKind::Target(1.52));
        let PairKind::Target(one_three) = find(0, 2) else {
            panic!("C-C-O should be a 1-3 target");
        };
        assert!((one_three - 2.41).abs() < 0.05);
        assert_eq!(mol.num_atoms(), 9);
        assert_eq!(bounds.len(), 9 * 8 / 2);
    }

    #[test]
    fn embed_produces_requested_conformers_satisfying_bounds() {
        let mol = ethanol_with_hydrogens();
        let embedder = DistanceBoundsEmbedder::new(Some(42));
        let conformers = embedder.embed(&mol, 3);
        assert_eq!(conformers.len(), 3);
        let bounds = pair_bounds(&mol);
        for conformer in &conformers {
            assert_eq!(conformer.positions.len(), mol.num_atoms());
            assert!(satisfies_bounds(&bounds, &conformer.positions));
        }
        assert_ne!(conformers[0].positions, conformers[1].positions);
    }

    #[test]
    fn embed_is_reproducible_for_a_fixed_seed() {
        let mol = ethanol_with_hydrogens();
        let a = DistanceBoundsEmbedder::new(Some(7)).embed(&mol, 2);
        let b = DistanceBoundsEmbedder::new(Some(7)).embed(&mol, 2);
        assert_eq!(a, b);
    }

    #[test]
    fn embed_of_empty_molecule_yields_nothing() {
        let embedder = DistanceBoundsEmbedder::new(Some(1));
        assert!(embedder.embed(&Molecule::new("empty"), 5).is_empty());
    }
}
