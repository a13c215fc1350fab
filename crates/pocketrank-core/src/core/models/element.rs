use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical elements recognized by the structure and molecule readers.
///
/// Organic elements get full chemistry support (valences, force-field types).
/// Common metal and halide ions found in binding sites are carried through so
/// pockets keep them, but they never take part in conformer generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    H,
    B,
    C,
    N,
    O,
    F,
    Na,
    Mg,
    Si,
    P,
    S,
    Cl,
    K,
    Ca,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Se,
    Br,
    I,
    /// Anything the readers could not map to a known element.
    Unknown,
}

static SYMBOL_TO_ELEMENT: Map<&'static str, Element> = phf_map! {
    "H" => Element::H, "D" => Element::H, "B" => Element::B, "C" => Element::C,
    "N" => Element::N, "O" => Element::O, "F" => Element::F, "NA" => Element::Na,
    "MG" => Element::Mg, "SI" => Element::Si, "P" => Element::P, "S" => Element::S,
    "CL" => Element::Cl, "K" => Element::K, "CA" => Element::Ca, "MN" => Element::Mn,
    "FE" => Element::Fe, "CO" => Element::Co, "NI" => Element::Ni, "CU" => Element::Cu,
    "ZN" => Element::Zn, "SE" => Element::Se, "BR" => Element::Br, "I" => Element::I,
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol '{0}'")]
pub struct ParseElementError(pub String);

impl FromStr for Element {
    type Err = ParseElementError;

    /// Parses an element symbol case-insensitively (`"Cl"`, `"CL"`, `"cl"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_uppercase();
        SYMBOL_TO_ELEMENT
            .get(key.as_str())
            .copied()
            .ok_or_else(|| ParseElementError(s.trim().to_string()))
    }
}

impl Element {
    pub fn symbol(self) -> &'static str {
        match self {
            Element::H => "H",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::Mn => "Mn",
            Element::Fe => "Fe",
            Element::Co => "Co",
            Element::Ni => "Ni",
            Element::Cu => "Cu",
            Element::Zn => "Zn",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
            Element::Unknown => "*",
        }
    }

    /// Single-bond covalent radius in Angstroms, used for bond perception.
    pub fn covalent_radius(self) -> f64 {
        match self {
            Element::H => 0.31,
            Element::B => 0.84,
            Element::C => 0.76,
            Element::N => 0.71,
            Element::O => 0.66,
            Element::F => 0.57,
            Element::Na => 1.66,
            Element::Mg => 1.41,
            Element::Si => 1.11,
            Element::P => 1.07,
            Element::S => 1.05,
            Element::Cl => 1.02,
            Element::K => 2.03,
            Element::Ca => 1.76,
            Element::Mn => 1.39,
            Element::Fe => 1.32,
            Element::Co => 1.26,
            Element::Ni => 1.24,
            Element::Cu => 1.32,
            Element::Zn => 1.22,
            Element::Se => 1.20,
            Element::Br => 1.20,
            Element::I => 1.39,
            Element::Unknown => 0.0,
        }
    }

    /// Neutral-atom valence states in increasing order. Empty for elements
    /// whose bonding is not modeled (ions, unknowns).
    pub fn default_valences(self) -> &'static [u8] {
        match self {
            Element::H | Element::F | Element::Cl | Element::Br => &[1],
            Element::I => &[1, 3, 5],
            Element::B => &[3],
            Element::C | Element::Si => &[4],
            Element::N => &[3],
            Element::O => &[2],
            Element::P => &[3, 5],
            Element::S | Element::Se => &[2, 4, 6],
            _ => &[],
        }
    }

    pub fn is_hydrogen(self) -> bool {
        self == Element::H
    }

    /// True for metals and other ions that carry no covalent bonding model.
    pub fn is_ion(self) -> bool {
        matches!(
            self,
            Element::Na
                | Element::Mg
                | Element::K
                | Element::Ca
                | Element::Mn
                | Element::Fe
                | Element::Co
                | Element::Ni
                | Element::Cu
                | Element::Zn
        )
    }

    /// Guesses the element from a PDB-style atom name when the element columns
    /// are blank. Leading digits are skipped (`1HB` is hydrogen).
    pub fn from_atom_name(name: &str) -> Element {
        let letters: String = name
            .trim()
            .chars()
            .skip_while(|c| c.is_ascii_digit())
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        if letters.len() >= 2 {
            if let Ok(el) = letters[..2].parse::<Element>() {
                if matches!(el, Element::Cl | Element::Br) {
                    return el;
                }
            }
        }
        letters
            .get(..1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(Element::Unknown)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
