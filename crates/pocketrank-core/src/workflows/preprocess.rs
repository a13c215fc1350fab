use crate::core::chem::solvent::strip_water;
use crate::engine::config::PreprocessConfig;
use crate::engine::conformer::{ConformerOptimizer, Relaxer};
use crate::engine::embedding::Embedder;
use crate::engine::error::EngineError;
use crate::engine::extraction::extract_pocket;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::record::{self, ComplexRecord};
use crate::engine::sources::{SourceDirs, load_ligand};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// What happened to one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A new record was written.
    Written,
    /// A record already existed and was left untouched.
    Existing,
    /// No record was written; the reason is human readable.
    Skipped(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub written: Vec<String>,
    pub existing: Vec<String>,
    pub skipped: Vec<(String, String)>,
}

impl PreprocessSummary {
    fn add(&mut self, key: String, outcome: KeyOutcome) {
        match outcome {
            KeyOutcome::Written => self.written.push(key),
            KeyOutcome::Existing => self.existing.push(key),
            KeyOutcome::Skipped(reason) => self.skipped.push((key, reason)),
        }
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.existing.len() + self.skipped.len()
    }
}

/// `<input>/<key>/<key>_protein.pdb`
pub fn protein_path(input_dir: &Path, key: &str) -> PathBuf {
    input_dir.join(key).join(format!("{key}_protein.pdb"))
}

/// Builds and persists the record for `key`.
///
/// Missing inputs and unusable geometry come back as
/// [`KeyOutcome::Skipped`]; genuine failures (unparsable chemistry, a failed
/// optimization, I/O) are errors. Callers that process many keys treat both
/// as a skip.
pub fn preprocess_key<E: Embedder, R: Relaxer>(
    key: &str,
    dirs: SourceDirs<'_>,
    data_dir: &Path,
    optimizer: &ConformerOptimizer<E, R>,
) -> Result<KeyOutcome, EngineError> {
    if record::exists(data_dir, key) {
        return Ok(KeyOutcome::Existing);
    }

    let (source, ligand) = load_ligand(dirs, key)?;
    debug!("{key}: ligand from {source} with {} heavy atoms.", ligand.num_atoms());

    let optimized = optimizer.optimize(&ligand)?;

    let Some(mut pocket) = extract_pocket(&ligand, &protein_path(dirs.input_dir, key))? else {
        return Ok(KeyOutcome::Skipped("no pocket could be extracted".to_string()));
    };
    let removed = strip_water(&mut pocket);
    if removed > 0 {
        debug!("{key}: removed {removed} water atoms from the pocket.");
    }

    if ligand.num_conformers() == 0 || pocket.num_conformers() == 0 || pocket.num_atoms() == 0 {
        return Ok(KeyOutcome::Skipped(
            "ligand or pocket has no usable conformer".to_string(),
        ));
    }

    record::save(data_dir, key, &ComplexRecord::new(ligand, optimized, pocket))?;
    Ok(KeyOutcome::Written)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs [`preprocess_key`] for every configured key on a pool of
/// `config.workers` threads.
///
/// A failure, or even a panic, while processing one key only skips that key.
/// Each skip is logged at `warn` level with its reason.
#[instrument(skip_all, name = "preprocess_workflow")]
pub fn run(config: &PreprocessConfig, reporter: &ProgressReporter) -> Result<PreprocessSummary, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Setup" });
    info!(
        "Preprocessing {} complexes with {} workers into {}.",
        config.keys.len(),
        config.workers,
        config.data_dir.display()
    );
    std::fs::create_dir_all(&config.data_dir)?;
    let optimizer = ConformerOptimizer::from_config(&config.conformer)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("preprocess-{i}"))
        .build()?;
    let dirs = SourceDirs {
        input_dir: &config.input_dir,
        external_dir: config.external_dir.as_deref(),
    };
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Preprocessing" });
    reporter.report(Progress::TaskStart {
        total_steps: config.keys.len() as u64,
    });

    let summary = Mutex::new(PreprocessSummary::default());
    pool.install(|| {
        config.keys.par_iter().for_each(|key| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                preprocess_key(key, dirs, &config.data_dir, &optimizer)
            }));
            let outcome = match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => KeyOutcome::Skipped(e.to_string()),
                Err(payload) => KeyOutcome::Skipped(format!("panicked: {}", panic_message(&*payload))),
            };
            if let KeyOutcome::Skipped(reason) = &outcome {
                warn!("Skipping {key}: {reason}");
            }
            if let Ok(mut summary) = summary.lock() {
                summary.add(key.clone(), outcome);
            }
            reporter.report(Progress::TaskIncrement);
        });
    });

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let summary = summary
        .into_inner()
        .map_err(|_| EngineError::Internal("preprocessing summary lock poisoned".to_string()))?;
    info!(
        written = summary.written.len(),
        existing = summary.existing.len(),
        skipped = summary.skipped.len(),
        "Preprocessing complete."
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::{Conformer, Molecule};
    use crate::engine::sources::tests::ETHANOL_SDF;
    use nalgebra::Point3;
    use tempfile::tempdir;

    struct StraightLine;

    impl Embedder for StraightLine {
        fn embed(&self, mol: &Molecule, count: usize) -> Vec<Conformer> {
            (0..count)
                .map(|_| {
                    Conformer::new(
                        (0..mol.num_atoms())
                            .map(|i| Point3::new(i as f64 * 1.5, 0.0, 0.0))
                            .collect(),
                    )
                })
                .collect()
        }
    }

    struct Flat;

    impl Relaxer for Flat {
        fn relax(&self, _mol: &Molecule, conformers: &mut [Conformer]) -> Result<Vec<f64>, EngineError> {
            Ok(vec![0.0; conformers.len()])
        }
    }

    struct Panicking;

    impl Relaxer for Panicking {
        fn relax(&self, _mol: &Molecule, _conformers: &mut [Conformer]) -> Result<Vec<f64>, EngineError> {
            panic!("relaxation blew up")
        }
    }

    const PROTEIN: &str = "\
ATOM      1  N   ALA A   1       0.000   3.000   0.000  1.00  0.00           N
ATOM      2  CA  ALA A   1       1.458   3.000   0.000  1.00  0.00           C
ATOM      3  C   ALA A   1       2.009   4.420   0.000  1.00  0.00           C
ATOM      4  O   ALA A   1       1.251   5.390   0.000  1.00  0.00           O
ATOM      5  CB  ALA A   1       1.988   2.236   1.209  1.00  0.00           C
HETATM    6  O   HOH A 101       0.500  -2.500   0.000  1.00  0.00           O
END
";

    fn write_complex(input: &Path, key: &str, protein: bool) {
        let dir = input.join(key);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{key}_ligand.sdf")), ETHANOL_SDF).unwrap();
        if protein {
            std::fs::write(protein_path(input, key), PROTEIN).unwrap();
        }
    }

    fn optimizer() -> ConformerOptimizer<StraightLine, Flat> {
        ConformerOptimizer::new(StraightLine, Flat, 3)
    }

    #[test]
    fn complete_inputs_write_a_water_free_record() {
        let input = tempdir().unwrap();
        let data = tempdir().unwrap();
        write_complex(input.path(), "1abc", true);
        let dirs = SourceDirs {
            input_dir: input.path(),
            external_dir: None,
        };

        let outcome = preprocess_key("1abc", dirs, data.path(), &optimizer()).unwrap();
        assert_eq!(outcome, KeyOutcome::Written);

        let rec = record::load(data.path(), "1abc").unwrap();
        assert_eq!(rec.ligand.num_atoms(), 3);
        assert_eq!(rec.ligand_optimized.num_atoms(), 3);
        assert_eq!(rec.pocket.num_atoms(), 5);
        assert_eq!(rec.pocket.num_conformers(), 1);
    }

    #[test]
    fn existing_record_short_circuits() {
        let input = tempdir().unwrap();
        let data = tempdir().unwrap();
        write_complex(input.path(), "1abc", true);
        let dirs = SourceDirs {
            input_dir: input.path(),
            external_dir: None,
        };
        preprocess_key("1abc", dirs, data.path(), &optimizer()).unwrap();
        let again = preprocess_key("1abc", dirs, data.path(), &optimizer()).unwrap();
        assert_eq!(again, KeyOutcome::Existing);
    }

    #[test]
    fn missing_protein_is_a_skip() {
        let input = tempdir().unwrap();
        let data = tempdir().unwrap();
        write_complex(input.path(), "2def", false);
        let dirs = SourceDirs {
            input_dir: input.path(),
            external_dir: None,
        };
        let outcome = preprocess_key("2def", dirs, data.path(), &optimizer()).unwrap();
        assert!(matches!(outcome, KeyOutcome::Skipped(_)));
        assert!(!record::exists(data.path(), "2def"));
    }

    #[test]
    fn missing_ligand_is_an_error() {
        let input = tempdir().unwrap();
        let data = tempdir().unwrap();
        std::fs::create_dir(input.path().join("3ghi")).unwrap();
        let dirs = SourceDirs {
            input_dir: input.path(),
            external_dir: None,
        };
        let err = preprocess_key("3ghi", dirs, data.path(), &optimizer()).unwrap_err();
        assert!(matches!(err, EngineError::NoLigandSource(_)));
    }

    #[test]
    fn panics_inside_a_key_are_contained() {
        let input = tempdir().unwrap();
        let data = tempdir().unwrap();
        write_complex(input.path(), "1abc", true);
        let dirs = SourceDirs {
            input_dir: input.path(),
            external_dir: None,
        };
        let optimizer = ConformerOptimizer::new(StraightLine, Panicking, 2);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            preprocess_key("1abc", dirs, data.path(), &optimizer)
        }));
        let payload = result.unwrap_err();
        assert_eq!(panic_message(&*payload), "relaxation blew up");
        assert!(!record::exists(data.path(), "1abc"));
    }
}
