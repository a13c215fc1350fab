use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const EMBEDDED_UFF: &str = include_str!("../../../data/uff.toml");

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AtomTypeParams {
    pub r1: f64,
    pub theta0: f64,
    pub x1: f64,
    pub d1: f64,
    pub z1: f64,
    pub v1: f64,
    pub u1: f64,
    pub xi: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct GlobalParams {
    /// Pauling bond-order correction coefficient.
    pub bond_order_scale: f64,
    /// Force constant prefactor `G` in kcal/(mol A) units.
    pub force_constant_g: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Forcefield {
    pub globals: GlobalParams,
    pub atom_types: HashMap<String, AtomTypeParams>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

impl Forcefield {
    /// Parameters compiled into the library.
    pub fn embedded() -> Result<Self, ParamLoadError> {
        toml::from_str(EMBEDDED_UFF).map_err(|e| ParamLoadError::Toml {
            path: "<embedded uff.toml>".to_string(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn atom_type(&self, name: &str) -> Option<&AtomTypeParams> {
        self.atom_types.get(name)
    }
}
