//! Per-complex tensors in host memory, before batching.

use super::record::ComplexRecord;
use crate::core::chem::descriptors::rotatable_bond_count;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::utils::geometry::{centroid, pairwise_distances, random_rotation};
use nalgebra::{Point3, Vector3};
use rand::Rng;

const ELEMENT_VOCAB: [Element; 10] = [
    Element::C,
    Element::N,
    Element::O,
    Element::S,
    Element::F,
    Element::P,
    Element::Cl,
    Element::Br,
    Element::I,
    Element::B,
];
const MAX_DEGREE: usize = 5;
const MAX_HYDROGENS: usize = 4;

/// Element one-hot (vocabulary plus "other"), degree 0..=5, hydrogen count
/// 0..=4, aromatic flag.
pub const NUM_ATOM_FEATURES: usize = ELEMENT_VOCAB.len() + 1 + (MAX_DEGREE + 1) + (MAX_HYDROGENS + 1) + 1;

/// Length of the per-complex auxiliary vector `V`.
pub const NUM_AUX_FEATURES: usize = 1;

/// Row-major node features, `num_atoms x NUM_ATOM_FEATURES`.
pub fn atom_features(mol: &Molecule) -> Vec<f32> {
    let mut features = vec![0.0f32; mol.num_atoms() * NUM_ATOM_FEATURES];
    for (i, atom) in mol.atoms().iter().enumerate() {
        let row = &mut features[i * NUM_ATOM_FEATURES..(i + 1) * NUM_ATOM_FEATURES];
        let element_slot = ELEMENT_VOCAB
            .iter()
            .position(|&e| e == atom.element)
            .unwrap_or(ELEMENT_VOCAB.len());
        row[element_slot] = 1.0;

        let mut offset = ELEMENT_VOCAB.len() + 1;
        row[offset + mol.degree(i).min(MAX_DEGREE)] = 1.0;
        offset += MAX_DEGREE + 1;
        row[offset + mol.total_hydrogens(i).min(MAX_HYDROGENS)] = 1.0;
        offset += MAX_HYDROGENS + 1;
        if atom.is_aromatic {
            row[offset] = 1.0;
        }
    }
    features
}

/// Row-major adjacency with ones on the diagonal.
pub fn adjacency_with_self_loops(mol: &Molecule) -> Vec<f32> {
    let n = mol.num_atoms();
    let mut adjacency = vec![0.0f32; n * n];
    for i in 0..n {
        adjacency[i * n + i] = 1.0;
    }
    for bond in mol.bonds() {
        adjacency[bond.begin * n + bond.end] = 1.0;
        adjacency[bond.end * n + bond.begin] = 1.0;
    }
    adjacency
}

fn distance_matrix(a: &[Point3<f64>], b: &[Point3<f64>]) -> Vec<f32> {
    pairwise_distances(a, b).into_iter().map(|d| d as f32).collect()
}

/// The optimized conformer moved onto the native centroid under a random
/// rotation about its own centroid.
pub fn decoy_positions<R: Rng + ?Sized>(
    native: &[Point3<f64>],
    optimized: &[Point3<f64>],
    rng: &mut R,
) -> Option<Vec<Point3<f64>>> {
    let target = centroid(native)?;
    let center = centroid(optimized)?;
    let rotation = random_rotation(rng);
    let shift: Vector3<f64> = target.coords;
    Some(
        optimized
            .iter()
            .map(|p| Point3::from(rotation * (p - center) + shift))
            .collect(),
    )
}

/// One complex ready for batching.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub key: String,
    pub num_ligand_atoms: usize,
    pub num_pocket_atoms: usize,
    pub h1: Vec<f32>,
    pub a1: Vec<f32>,
    pub h2: Vec<f32>,
    pub a2: Vec<f32>,
    /// Native ligand to pocket distances, `n1 x n2`.
    pub dm: Vec<f32>,
    /// Decoy ligand to pocket distances, `n1 x n2`.
    pub dm_rot: Vec<f32>,
    pub v: [f32; NUM_AUX_FEATURES],
    pub y: f32,
}

/// Builds the tensors for one record. Returns `None` when a molecule lacks
/// atoms or a conformer, or the optimized ligand does not match the native
/// one atom for atom.
pub fn featurize<R: Rng + ?Sized>(key: &str, record: &ComplexRecord, label: f64, rng: &mut R) -> Option<Sample> {
    let ligand = &record.ligand;
    let pocket = &record.pocket;
    let native = &ligand.conformer(0)?.positions;
    let optimized = &record.ligand_optimized.conformer(0)?.positions;
    let pocket_positions = &pocket.conformer(0)?.positions;
    if native.is_empty() || pocket_positions.is_empty() || optimized.len() != native.len() {
        return None;
    }

    let decoy = decoy_positions(native, optimized, rng)?;
    Some(Sample {
        key: key.to_string(),
        num_ligand_atoms: ligand.num_atoms(),
        num_pocket_atoms: pocket.num_atoms(),
        h1: atom_features(ligand),
        a1: adjacency_with_self_loops(ligand),
        h2: atom_features(pocket),
        a2: adjacency_with_self_loops(pocket),
        dm: distance_matrix(native, pocket_positions),
        dm_rot: distance_matrix(&decoy, pocket_positions),
        v: [rotatable_bond_count(ligand) as f32],
        y: label as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::sanitize::sanitize;
    use crate::core::models::molecule::{Conformer, MolAtom};
    use crate::core::models::topology::BondOrder;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn butanol() -> Molecule {
        let mut mol = Molecule::new("butanol");
        for e in [Element::C, Element::C, Element::C, Element::C, Element::O] {
            mol.add_atom(MolAtom::new(e)).unwrap();
        }
        for i in 1..5 {
            mol.add_bond(i - 1, i, BondOrder::Single).unwrap();
        }
        sanitize(&mut mol).unwrap();
        let positions = (0..5).map(|i| Point3::new(i as f64 * 1.5, 0.0, 0.0)).collect();
        mol.add_conformer(Conformer::new(positions)).unwrap();
        mol
    }

    fn water_pocket() -> Molecule {
        let mut mol = Molecule::new("pocket");
        mol.add_atom(MolAtom::new(Element::Zn)).unwrap();
        mol.add_atom(MolAtom::new(Element::N)).unwrap();
        mol.add_conformer(Conformer::new(vec![Point3::new(0.0, 3.0, 0.0), Point3::new(6.0, 3.0, 0.0)]))
            .unwrap();
        mol
    }

    #[test]
    fn feature_width_is_twenty_three() {
        assert_eq!(NUM_ATOM_FEATURES, 23);
    }

    #[test]
    fn atom_features_encode_element_degree_and_hydrogens() {
        let mol = butanol();
        let f = atom_features(&mol);
        let row = |i: usize| &f[i * NUM_ATOM_FEATURES..(i + 1) * NUM_ATOM_FEATURES];
        // Terminal carbon: C, degree 1, three hydrogens.
        assert_eq!(row(0)[0], 1.0);
        assert_eq!(row(0)[11 + 1], 1.0);
        assert_eq!(row(0)[17 + 3], 1.0);
        // Oxygen: degree 1, one hydrogen.
        assert_eq!(row(4)[2], 1.0);
        assert_eq!(row(4)[17 + 1], 1.0);
        assert!(f.chunks(NUM_ATOM_FEATURES).all(|r| r.iter().sum::<f32>() == 3.0));
    }

    #[test]
    fn unknown_elements_use_the_other_slot() {
        let f = atom_features(&water_pocket());
        assert_eq!(f[10], 1.0);
        assert_eq!(f[NUM_ATOM_FEATURES + 1], 1.0);
    }

    #[test]
    fn adjacency_has_self_loops_and_is_symmetric() {
        let a = adjacency_with_self_loops(&butanol());
        assert_eq!(a[0], 1.0);
        assert_eq!(a[1], 1.0);
        assert_eq!(a[5], 1.0);
        assert_eq!(a[2], 0.0);
        assert_eq!(a.iter().sum::<f32>(), 5.0 + 8.0);
    }

    #[test]
    fn decoy_keeps_native_centroid_and_internal_distances() {
        let native = butanol().conformer(0).unwrap().positions.clone();
        let optimized: Vec<_> = native.iter().map(|p| p + Vector3::new(10.0, -4.0, 2.0)).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let decoy = decoy_positions(&native, &optimized, &mut rng).unwrap();
        let c = centroid(&decoy).unwrap();
        assert!((c - centroid(&native).unwrap()).norm() < 1e-9);
        let d_native = nalgebra::distance(&native[0], &native[4]);
        let d_decoy = nalgebra::distance(&decoy[0], &decoy[4]);
        assert!((d_native - d_decoy).abs() < 1e-9);
    }

    #[test]
    fn featurize_builds_consistent_shapes() {
        let ligand = butanol();
        let record = ComplexRecord::new(ligand.clone(), ligand, water_pocket());
        let mut rng = StdRng::seed_from_u64(0);
        let sample = featurize("1abc", &record, 6.5, &mut rng).unwrap();
        assert_eq!(sample.h1.len(), 5 * NUM_ATOM_FEATURES);
        assert_eq!(sample.a2.len(), 4);
        assert_eq!(sample.dm.len(), 10);
        assert_eq!(sample.dm_rot.len(), 10);
        assert_eq!(sample.dm[0], 3.0);
        assert_eq!(sample.v, [2.0]);
        assert_eq!(sample.y, 6.5);
    }

    #[test]
    fn featurize_rejects_mismatched_optimized_ligand() {
        let ligand = butanol();
        let mut optimized = ligand.clone();
        optimized.remove_atoms_where(|i, _| i == 4);
        let record = ComplexRecord::new(ligand, optimized, water_pocket());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(featurize("k", &record, 1.0, &mut rng).is_none());
    }
}
