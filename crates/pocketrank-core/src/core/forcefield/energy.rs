use super::minimize::{MinimizeOptions, MinimizeResult, conjugate_gradient};
use super::params::{AtomTypeParams, Forcefield};
use super::potentials;
use super::term::EnergyTerm;
use super::typing::{TypingError, assign_uff_types};
use crate::core::chem::sanitize::hybridization;
use crate::core::models::molecule::Molecule;
use crate::core::utils::geometry::Hybridization;
use nalgebra::{Point3, Vector3};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForcefieldError {
    #[error("Atom typing failed: {0}")]
    Typing(#[from] TypingError),
    #[error("No parameters for atom type '{0}'")]
    MissingParameters(String),
    #[error("Expected {expected} coordinates, got {found}")]
    CoordinateMismatch { expected: usize, found: usize },
}

#[derive(Debug, Clone, Copy)]
struct BondTerm {
    i: usize,
    j: usize,
    rest_length: f64,
    force_constant: f64,
}

#[derive(Debug, Clone, Copy)]
struct AngleTerm {
    i: usize,
    center: usize,
    k: usize,
    force_constant: f64,
    coefficients: (f64, f64, f64),
    linear: bool,
}

#[derive(Debug, Clone, Copy)]
struct TorsionTerm {
    atoms: [usize; 4],
    barrier: f64,
    periodicity: u32,
    cos_n_phi0: f64,
}

#[derive(Debug, Clone, Copy)]
struct VdwTerm {
    i: usize,
    j: usize,
    r_min: f64,
    well_depth: f64,
}

#[inline]
fn vec_at(x: &[f64], i: usize) -> Vector3<f64> {
    Vector3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2])
}

#[inline]
fn accumulate(grad: &mut [f64], i: usize, g: &Vector3<f64>) {
    grad[3 * i] += g.x;
    grad[3 * i + 1] += g.y;
    grad[3 * i + 2] += g.z;
}

/// UFF rest length with bond-order and electronegativity corrections.
fn rest_length(a: &AtomTypeParams, b: &AtomTypeParams, bond_order: f64, ff: &Forcefield) -> f64 {
    let r_bo = -ff.globals.bond_order_scale * (a.r1 + b.r1) * bond_order.ln();
    let chi = (a.xi.sqrt() - b.xi.sqrt()).powi(2);
    let r_en = a.r1 * b.r1 * chi / (a.xi * a.r1 + b.xi * b.r1);
    a.r1 + b.r1 + r_bo - r_en
}

/// Bonded UFF-style force field for one molecule: bond stretch, angle bend,
/// torsion, and Lennard-Jones van der Waals between atoms more than two bonds
/// apart. Electrostatics and inversion terms are not included.
#[derive(Debug, Clone)]
pub struct UffForceField {
    num_atoms: usize,
    bonds: Vec<BondTerm>,
    angles: Vec<AngleTerm>,
    torsions: Vec<TorsionTerm>,
    vdw: Vec<VdwTerm>,
}

impl UffForceField {
    pub fn setup(mol: &Molecule, ff: &Forcefield) -> Result<Self, ForcefieldError> {
        let types = assign_uff_types(mol)?;
        let params: Vec<&AtomTypeParams> = types
            .iter()
            .map(|&t| {
                ff.atom_type(t)
                    .ok_or_else(|| ForcefieldError::MissingParameters(t.to_string()))
            })
            .collect::<Result<_, _>>()?;
        let adjacency = mol.adjacency();
        let hybridizations: Vec<Hybridization> =
            (0..mol.num_atoms()).map(|i| hybridization(mol, i)).collect();

        let mut bonds = Vec::with_capacity(mol.num_bonds());
        let mut rest = HashMap::new();
        for bond in mol.bonds() {
            let (a, b) = (params[bond.begin], params[bond.end]);
            let r0 = rest_length(a, b, bond.order.valence(), ff);
            let k = ff.globals.force_constant_g * a.z1 * b.z1 / r0.powi(3);
            rest.insert((bond.begin.min(bond.end), bond.begin.max(bond.end)), r0);
            bonds.push(BondTerm {
                i: bond.begin,
                j: bond.end,
                rest_length: r0,
                force_constant: k,
            });
        }
        let rest_of = |a: usize, b: usize| rest.get(&(a.min(b), a.max(b))).copied().unwrap_or(1.5);

        let mut angles = Vec::new();
        for (center, neighbors) in adjacency.iter().enumerate() {
            let theta0 = params[center].theta0.to_radians();
            let linear = params[center].theta0 >= 179.0;
            let coefficients = if linear {
                (0.0, 0.0, 0.0)
            } else {
                potentials::angle_fourier_coefficients(theta0)
            };
            for (x, &i) in neighbors.iter().enumerate() {
                for &k in &neighbors[x + 1..] {
                    let r12 = rest_of(i, center);
                    let r23 = rest_of(center, k);
                    let cos0 = theta0.cos();
                    let r13 = (r12 * r12 + r23 * r23 - 2.0 * r12 * r23 * cos0).sqrt();
                    let beta = ff.globals.force_constant_g / (r12 * r23);
                    let pre = beta * params[i].z1 * params[k].z1 / r13.powi(5);
                    let inner = 3.0 * r12 * r23 * (1.0 - cos0 * cos0) - r13 * r13 * cos0;
                    angles.push(AngleTerm {
                        i,
                        center,
                        k,
                        force_constant: pre * r12 * r23 * inner,
                        coefficients,
                        linear,
                    });
                }
            }
        }

        let mut torsions = Vec::new();
        for bond in mol.bonds() {
            let (j, k) = (bond.begin, bond.end);
            let (hj, hk) = (hybridizations[j], hybridizations[k]);
            if hj == Hybridization::Sp || hk == Hybridization::Sp {
                continue;
            }
            let quads: Vec<[usize; 4]> = adjacency[j]
                .iter()
                .filter(|&&i| i != k)
                .flat_map(|&i| {
                    adjacency[k]
                        .iter()
                        .filter(move |&&l| l != j && l != i)
                        .map(move |&l| [i, j, k, l])
                })
                .collect();
            if quads.is_empty() {
                continue;
            }
            let (barrier, periodicity, cos_n_phi0) = match (hj, hk) {
                (Hybridization::Sp3, Hybridization::Sp3) => {
                    ((params[j].v1 * params[k].v1).sqrt(), 3, -1.0)
                }
                (Hybridization::Sp2, Hybridization::Sp2) => {
                    let order = bond.order.valence();
                    let v = 5.0 * (params[j].u1 * params[k].u1).sqrt() * (1.0 + 4.18 * order.ln());
                    (v, 2, 1.0)
                }
                _ => (1.0, 6, 1.0),
            };
            let per_torsion = barrier / quads.len() as f64;
            if per_torsion.abs() < 1e-12 {
                continue;
            }
            torsions.extend(quads.into_iter().map(|atoms| TorsionTerm {
                atoms,
                barrier: per_torsion,
                periodicity,
                cos_n_phi0,
            }));
        }

        let mut vdw = Vec::new();
        for i in 0..mol.num_atoms() {
            let near = within_two_bonds(&adjacency, i);
            for j in (i + 1)..mol.num_atoms() {
                if near.contains(&j) {
                    continue;
                }
                vdw.push(VdwTerm {
                    i,
                    j,
                    r_min: (params[i].x1 * params[j].x1).sqrt(),
                    well_depth: (params[i].d1 * params[j].d1).sqrt(),
                });
            }
        }

        Ok(Self {
            num_atoms: mol.num_atoms(),
            bonds,
            angles,
            torsions,
            vdw,
        })
    }

    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    /// Energy breakdown at flat coordinates `[x0, y0, z0, x1, ...]`. When
    /// `grad` is given it is overwritten with dE/dx.
    pub fn evaluate(&self, x: &[f64], mut grad: Option<&mut [f64]>) -> EnergyTerm {
        if let Some(g) = grad.as_deref_mut() {
            g.iter_mut().for_each(|v| *v = 0.0);
        }
        let mut energy = EnergyTerm::default();

        for t in &self.bonds {
            let d = vec_at(x, t.i) - vec_at(x, t.j);
            let r = d.norm();
            energy.bond += potentials::harmonic(r, t.rest_length, t.force_constant);
            if let Some(g) = grad.as_deref_mut() {
                if r > 1e-12 {
                    let dv = d * (potentials::harmonic_derivative(r, t.rest_length, t.force_constant) / r);
                    accumulate(g, t.i, &dv);
                    accumulate(g, t.j, &-dv);
                }
            }
        }

        for t in &self.angles {
            let u = vec_at(x, t.i) - vec_at(x, t.center);
            let v = vec_at(x, t.k) - vec_at(x, t.center);
            let (ru, rv) = (u.norm(), v.norm());
            if ru < 1e-12 || rv < 1e-12 {
                continue;
            }
            let c = (u.dot(&v) / (ru * rv)).clamp(-1.0, 1.0);
            energy.angle += potentials::cosine_angle(c, t.force_constant, t.coefficients, t.linear);
            if let Some(g) = grad.as_deref_mut() {
                let de_dc = potentials::cosine_angle_derivative(c, t.force_constant, t.coefficients, t.linear);
                let (uh, vh) = (u / ru, v / rv);
                let dci = (vh - uh * c) / ru;
                let dck = (uh - vh * c) / rv;
                accumulate(g, t.i, &(dci * de_dc));
                accumulate(g, t.k, &(dck * de_dc));
                accumulate(g, t.center, &(-(dci + dck) * de_dc));
            }
        }

        for t in &self.torsions {
            let [p1, p2, p3, p4] = t.atoms.map(|a| vec_at(x, a));
            let b1 = p2 - p1;
            let b2 = p3 - p2;
            let b3 = p4 - p3;
            let a = b1.cross(&b2);
            let b = b2.cross(&b3);
            let (na, nb) = (a.norm(), b.norm());
            if na < 1e-8 || nb < 1e-8 {
                continue;
            }
            let c = (a.dot(&b) / (na * nb)).clamp(-1.0, 1.0);
            energy.torsion += potentials::torsion(c, t.barrier, t.periodicity, t.cos_n_phi0);
            if let Some(g) = grad.as_deref_mut() {
                let de_dc = potentials::torsion_derivative(c, t.barrier, t.periodicity, t.cos_n_phi0);
                let dc_da = (b / nb - a * (c / na)) / na;
                let dc_db = (a / na - b * (c / nb)) / nb;
                let g1 = b2.cross(&dc_da);
                let g2 = dc_da.cross(&b1) + b3.cross(&dc_db);
                let g3 = dc_db.cross(&b2);
                let [i, j, k, l] = t.atoms;
                accumulate(g, i, &(-g1 * de_dc));
                accumulate(g, j, &((g1 - g2) * de_dc));
                accumulate(g, k, &((g2 - g3) * de_dc));
                accumulate(g, l, &(g3 * de_dc));
            }
        }

        for t in &self.vdw {
            let d = vec_at(x, t.i) - vec_at(x, t.j);
            let r = d.norm();
            energy.vdw += potentials::lennard_jones_12_6(r, t.r_min, t.well_depth);
            if let Some(g) = grad.as_deref_mut() {
                if r > 1e-6 {
                    let dv = d * (potentials::lennard_jones_12_6_derivative(r, t.r_min, t.well_depth) / r);
                    accumulate(g, t.i, &dv);
                    accumulate(g, t.j, &-dv);
                }
            }
        }

        energy
    }

    pub fn energy(&self, positions: &[Point3<f64>]) -> Result<EnergyTerm, ForcefieldError> {
        self.check_len(positions.len())?;
        Ok(self.evaluate(&flatten(positions), None))
    }

    /// Relaxes `positions` in place and reports the final total energy.
    pub fn minimize(
        &self,
        positions: &mut [Point3<f64>],
        options: &MinimizeOptions,
    ) -> Result<MinimizeResult, ForcefieldError> {
        self.check_len(positions.len())?;
        let mut x = flatten(positions);
        let result = conjugate_gradient(
            &mut x,
            |coords, grad| self.evaluate(coords, Some(grad)).total(),
            options,
        );
        for (i, p) in positions.iter_mut().enumerate() {
            *p = Point3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]);
        }
        Ok(result)
    }

    fn check_len(&self, found: usize) -> Result<(), ForcefieldError> {
        if found != self.num_atoms {
            return Err(ForcefieldError::CoordinateMismatch {
                expected: self.num_atoms,
                found,
            });
        }
        Ok(())
    }
}

pub fn flatten(positions: &[Point3<f64>]) -> Vec<f64> {
    positions.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
}

/// Atoms reachable from `start` in one or two bonds (including `start`).
fn within_two_bonds(adjacency: &[Vec<usize>], start: usize) -> Vec<usize> {
    let mut depth = vec![usize::MAX; adjacency.len()];
    let mut queue = VecDeque::from([start]);
    depth[start] = 0;
    let mut found = vec![start];
    while let Some(current) = queue.pop_front() {
        if depth[current] == 2 {
            continue;
        }
        for &next in &adjacency[current] {
            if depth[next] == usize::MAX {
                depth[next] = depth[current] + 1;
                found.push(next);
                queue.push_back(next);
            }
        }
    }
    found
}
