use super::config::ConformerConfig;
use super::embedding::{DistanceBoundsEmbedder, Embedder};
use super::error::EngineError;
use crate::core::chem::hydrogens::{add_hydrogens, remove_hydrogens};
use crate::core::chem::sanitize::sanitize;
use crate::core::forcefield::energy::UffForceField;
use crate::core::forcefield::minimize::MinimizeOptions;
use crate::core::forcefield::params::Forcefield;
use crate::core::models::molecule::{Conformer, Molecule};
use tracing::{debug, instrument};

/// Relaxes embedded conformers in place and reports one energy per conformer.
pub trait Relaxer {
    fn relax(&self, mol: &Molecule, conformers: &mut [Conformer]) -> Result<Vec<f64>, EngineError>;
}

/// Force-field relaxation with an iteration cap. The final energy is
/// reported whether or not the minimizer converged.
pub struct UffRelaxer {
    forcefield: Forcefield,
    options: MinimizeOptions,
}

impl UffRelaxer {
    pub fn new(forcefield: Forcefield, max_iterations: usize) -> Self {
        Self {
            forcefield,
            options: MinimizeOptions {
                max_iters: max_iterations,
                ..Default::default()
            },
        }
    }
}

impl Relaxer for UffRelaxer {
    fn relax(&self, mol: &Molecule, conformers: &mut [Conformer]) -> Result<Vec<f64>, EngineError> {
        let ff = UffForceField::setup(mol, &self.forcefield)?;
        conformers
            .iter_mut()
            .enumerate()
            .map(|(k, conformer)| {
                let result = ff.minimize(&mut conformer.positions, &self.options)?;
                if !result.converged {
                    debug!(
                        "Conformer {k} not converged after {} iterations (E = {:.3}).",
                        result.iterations, result.energy
                    );
                }
                Ok(result.energy)
            })
            .collect()
    }
}

/// Index of the smallest energy; the first index wins ties. NaN energies are
/// never selected unless every energy is NaN.
pub fn select_lowest_energy(energies: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &e) in energies.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(b) if energies[b].is_nan() && !e.is_nan() => best = Some(i),
            Some(b) if e < energies[b] => best = Some(i),
            _ => {}
        }
    }
    best
}

/// Generates candidate conformers for a ligand, relaxes them and keeps the
/// lowest-energy one.
pub struct ConformerOptimizer<E: Embedder, R: Relaxer> {
    embedder: E,
    relaxer: R,
    num_conformers: usize,
}

impl ConformerOptimizer<DistanceBoundsEmbedder, UffRelaxer> {
    pub fn from_config(config: &ConformerConfig) -> Result<Self, EngineError> {
        let forcefield = match &config.forcefield_path {
            Some(path) => Forcefield::load(path)?,
            None => Forcefield::embedded()?,
        };
        Ok(Self::new(
            DistanceBoundsEmbedder::new(config.seed),
            UffRelaxer::new(forcefield, config.max_iterations),
            config.num_conformers,
        ))
    }
}

impl<E: Embedder, R: Relaxer> ConformerOptimizer<E, R> {
    pub fn new(embedder: E, relaxer: R, num_conformers: usize) -> Self {
        Self {
            embedder,
            relaxer,
            num_conformers,
        }
    }

    /// Returns a heavy-atom copy of `ligand` carrying a single optimized
    /// conformer. Atom order matches the (hydrogen-free) input.
    ///
    /// # Errors
    ///
    /// Sanitization failures propagate; an embedding that yields no
    /// conformer is [`EngineError::NoConformers`].
    #[instrument(level = "debug", skip_all, fields(ligand = %ligand.name))]
    pub fn optimize(&self, ligand: &Molecule) -> Result<Molecule, EngineError> {
        let mut mol = ligand.clone();
        mol.clear_conformers();
        sanitize(&mut mol)?;
        add_hydrogens(&mut mol)?;

        let mut conformers = self.embedder.embed(&mol, self.num_conformers);
        if conformers.is_empty() {
            return Err(EngineError::NoConformers(ligand.name.clone()));
        }
        let energies = self.relaxer.relax(&mol, &mut conformers)?;
        let best = select_lowest_energy(&energies)
            .ok_or_else(|| EngineError::NoConformers(ligand.name.clone()))?;
        debug!(
            "Selected conformer {best} of {} (E = {:.3}).",
            conformers.len(),
            energies[best]
        );

        mol.add_conformer(conformers.swap_remove(best))?;
        remove_hydrogens(&mut mol);
        Ok(mol)
    }
}
