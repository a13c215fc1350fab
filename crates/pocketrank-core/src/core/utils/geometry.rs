use nalgebra::{Point3, Quaternion, Rotation3, Unit, UnitQuaternion, Vector3};
use rand::Rng;

/// Tetrahedral bond angle in degrees.
pub const TETRAHEDRAL_ANGLE: f64 = 109.471_220_634_490_7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hybridization {
    Sp,
    Sp2,
    Sp3,
}

pub fn rotation_from_axis_angle(axis: &Vector3<f64>, angle_degrees: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle_degrees.to_radians())
}

/// Uniformly distributed random rotation (Shoemake's quaternion method).
pub fn random_rotation<R: Rng + ?Sized>(rng: &mut R) -> Rotation3<f64> {
    let u1: f64 = rng.r#gen();
    let u2: f64 = rng.r#gen::<f64>() * std::f64::consts::TAU;
    let u3: f64 = rng.r#gen::<f64>() * std::f64::consts::TAU;
    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();
    let q = Quaternion::new(a * u2.sin(), a * u2.cos(), b * u3.sin(), b * u3.cos());
    UnitQuaternion::from_quaternion(q).to_rotation_matrix()
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Row-major `a.len() x b.len()` matrix of Euclidean distances.
pub fn pairwise_distances(a: &[Point3<f64>], b: &[Point3<f64>]) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len() * b.len());
    for p in a {
        out.extend(b.iter().map(|q| nalgebra::distance(p, q)));
    }
    out
}

/// Smallest distance between any point of `a` and any point of `b`.
pub fn min_distance(a: &[Point3<f64>], b: &[Point3<f64>]) -> Option<f64> {
    a.iter()
        .flat_map(|p| b.iter().map(move |q| nalgebra::distance(p, q)))
        .min_by(|x, y| x.total_cmp(y))
}

/// Signed dihedral angle p1-p2-p3-p4 in radians, in `(-pi, pi]`.
pub fn dihedral_angle(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>, p4: &Point3<f64>) -> f64 {
    let b1 = p2 - p1;
    let b2 = p3 - p2;
    let b3 = p4 - p3;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let m1 = n1.cross(&b2.normalize());
    let x = n1.dot(&n2);
    let y = m1.dot(&n2);
    y.atan2(x)
}

fn any_perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let reference = if v.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    (reference - v * v.dot(&reference)).normalize()
}

/// Directions for the missing substituents of an atom, given unit vectors to
/// its existing neighbors.
fn missing_directions(neighbors: &[Vector3<f64>], hybridization: Hybridization) -> Vec<Vector3<f64>> {
    match (hybridization, neighbors) {
        (Hybridization::Sp, []) => vec![Vector3::x(), -Vector3::x()],
        (Hybridization::Sp, [n1, ..]) => vec![-n1],
        (Hybridization::Sp2, []) => (0..3)
            .map(|k| {
                let phi = (120.0 * k as f64).to_radians();
                Vector3::new(phi.cos(), phi.sin(), 0.0)
            })
            .collect(),
        (Hybridization::Sp2, [n1]) => {
            let u = any_perpendicular(n1);
            let theta = 120.0f64.to_radians();
            vec![
                n1 * theta.cos() + u * theta.sin(),
                n1 * theta.cos() - u * theta.sin(),
            ]
        }
        (Hybridization::Sp2, [n1, n2, ..]) => {
            let sum = n1 + n2;
            vec![(-sum).try_normalize(1e-8).unwrap_or_else(|| any_perpendicular(n1))]
        }
        (Hybridization::Sp3, []) => [
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(1.0, -1.0, -1.0),
            Vector3::new(-1.0, 1.0, -1.0),
            Vector3::new(-1.0, -1.0, 1.0),
        ]
        .iter()
        .map(|v| v.normalize())
        .collect(),
        (Hybridization::Sp3, [n1]) => {
            let u = any_perpendicular(n1);
            let w = n1.cross(&u);
            let theta = TETRAHEDRAL_ANGLE.to_radians();
            (0..3)
                .map(|k| {
                    let phi = (120.0 * k as f64).to_radians();
                    n1 * theta.cos() + (u * phi.cos() + w * phi.sin()) * theta.sin()
                })
                .collect()
        }
        (Hybridization::Sp3, [n1, n2]) => {
            let bisector = (-(n1 + n2)).try_normalize(1e-8).unwrap_or_else(|| any_perpendicular(n1));
            let normal = n1
                .cross(n2)
                .try_normalize(1e-8)
                .unwrap_or_else(|| any_perpendicular(&bisector));
            let half = (TETRAHEDRAL_ANGLE / 2.0).to_radians();
            vec![
                bisector * half.cos() + normal * half.sin(),
                bisector * half.cos() - normal * half.sin(),
            ]
        }
        (Hybridization::Sp3, [n1, n2, n3, ..]) => {
            let sum = n1 + n2 + n3;
            vec![(-sum).try_normalize(1e-8).unwrap_or_else(|| any_perpendicular(n1))]
        }
    }
}

/// Positions for up to `count` hydrogens on the atom at `base`, placed in the
/// free valence directions implied by `hybridization`.
pub fn place_hydrogens(
    base: &Point3<f64>,
    neighbors: &[Point3<f64>],
    count: usize,
    hybridization: Hybridization,
    bond_length: f64,
) -> Vec<Point3<f64>> {
    let unit_neighbors: Vec<Vector3<f64>> = neighbors
        .iter()
        .filter_map(|p| (p - base).try_normalize(1e-8))
        .collect();
    let mut directions = missing_directions(&unit_neighbors, hybridization);
    // Crowded atoms: spread the remainder evenly around the first direction.
    while directions.len() < count {
        let seed = directions.first().copied().unwrap_or_else(Vector3::x);
        let k = directions.len() as f64;
        let rot = rotation_from_axis_angle(&any_perpendicular(&seed), 60.0 * k);
        directions.push(rot * seed);
    }
    directions
        .into_iter()
        .take(count)
        .map(|d| base + d * bond_length)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TOLERANCE: f64 = 1e-6;

    fn angle_deg(a: &Point3<f64>, center: &Point3<f64>, b: &Point3<f64>) -> f64 {
        (a - center).angle(&(b - center)).to_degrees()
    }

    #[test]
    fn sp3_hydrogens_on_methyl_are_tetrahedral() {
        let c = Point3::origin();
        let neighbor = Point3::new(1.54, 0.0, 0.0);
        let hs = place_hydrogens(&c, &[neighbor], 3, Hybridization::Sp3, 1.09);
        assert_eq!(hs.len(), 3);
        for h in &hs {
            assert!(((h - c).norm() - 1.09).abs() < TOLERANCE);
            assert!((angle_deg(h, &c, &neighbor) - TETRAHEDRAL_ANGLE).abs() < 1e-4);
        }
        assert!((angle_deg(&hs[0], &c, &hs[1]) - TETRAHEDRAL_ANGLE).abs() < 1e-4);
    }

    #[test]
    fn sp3_with_three_neighbors_points_away() {
        let c = Point3::origin();
        let neighbors = place_hydrogens(&c, &[Point3::new(0.0, 0.0, -1.0)], 3, Hybridization::Sp3, 1.5);
        let h = place_hydrogens(&c, &neighbors, 1, Hybridization::Sp3, 1.0);
        assert!((h[0] - Point3::new(0.0, 0.0, -1.0)).norm() < 1e-6);
    }

    #[test]
    fn sp2_hydrogen_bisects_neighbors() {
        let c = Point3::origin();
        let neighbors = [Point3::new(1.0, 0.0, 0.0), Point3::new(-0.5, 0.866, 0.0)];
        let h = place_hydrogens(&c, &neighbors, 1, Hybridization::Sp2, 1.0);
        assert!((angle_deg(&h[0], &c, &neighbors[0]) - angle_deg(&h[0], &c, &neighbors[1])).abs() < 1e-6);
    }

    #[test]
    fn place_hydrogens_returns_requested_count() {
        let c = Point3::origin();
        let h = place_hydrogens(&c, &[], 4, Hybridization::Sp3, 1.0);
        assert_eq!(h.len(), 4);
        let extra = place_hydrogens(&c, &[Point3::new(1.0, 0.0, 0.0)], 2, Hybridization::Sp, 1.0);
        assert_eq!(extra.len(), 2);
    }

    #[test]
    fn random_rotation_is_proper_and_seeded() {
        let mut rng1 = StdRng::seed_from_u64(7);
        let mut rng2 = StdRng::seed_from_u64(7);
        let r1 = random_rotation(&mut rng1);
        let r2 = random_rotation(&mut rng2);
        assert_eq!(r1, r2);
        assert!((r1.matrix().determinant() - 1.0).abs() < 1e-9);
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert!(((r1 * v).norm() - v.norm()).abs() < 1e-9);
    }

    #[test]
    fn dihedral_angle_of_trans_and_cis() {
        let p1 = Point3::new(1.0, 1.0, 0.0);
        let p2 = Point3::new(0.0, 0.0, 0.0);
        let p3 = Point3::new(0.0, 0.0, 1.0);
        let cis = Point3::new(1.0, 1.0, 1.0);
        let trans = Point3::new(-1.0, -1.0, 1.0);
        assert!(dihedral_angle(&p1, &p2, &p3, &cis).abs() < TOLERANCE);
        assert!((dihedral_angle(&p1, &p2, &p3, &trans).abs() - std::f64::consts::PI).abs() < TOLERANCE);
    }

    #[test]
    fn distances_and_centroid() {
        let a = [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
        let b = [Point3::new(0.0, 3.0, 0.0)];
        assert_eq!(pairwise_distances(&a, &b).len(), 2);
        assert_eq!(min_distance(&a, &b), Some(3.0));
        assert_eq!(min_distance(&a, &[]), None);
        assert_eq!(centroid(&a), Some(Point3::new(1.0, 0.0, 0.0)));
    }
}
