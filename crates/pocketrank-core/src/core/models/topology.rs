use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

impl BondOrder {
    /// Contribution of the bond to an atom's explicit valence.
    pub fn valence(self) -> f64 {
        match self {
            Self::Single => 1.0,
            Self::Double => 2.0,
            Self::Triple => 3.0,
            Self::Aromatic => 1.5,
        }
    }

    /// Bond type code used in MDL connection tables.
    pub fn mdl_code(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Aromatic => 4,
        }
    }
}

/// A bond between two atoms of a [`Molecule`](super::molecule::Molecule),
/// referenced by atom index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bond {
    pub begin: usize,
    pub end: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(begin: usize, end: usize, order: BondOrder) -> Self {
        Self { begin, end, order }
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.begin == atom || self.end == atom
    }

    /// The atom on the other side of the bond, if `atom` is one of its ends.
    pub fn partner(&self, atom: usize) -> Option<usize> {
        if self.begin == atom {
            Some(self.end)
        } else if self.end == atom {
            Some(self.begin)
        } else {
            None
        }
    }

    pub fn connects(&self, a: usize, b: usize) -> bool {
        (self.begin == a && self.end == b) || (self.begin == b && self.end == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aromatic_bonds_contribute_one_and_a_half() {
        assert_eq!(BondOrder::Aromatic.valence(), 1.5);
        assert_eq!(BondOrder::Double.mdl_code(), 2);
    }

    #[test]
    fn bond_partner_and_connects() {
        let bond = Bond::new(3, 7, BondOrder::Single);
        assert_eq!(bond.partner(3), Some(7));
        assert_eq!(bond.partner(7), Some(3));
        assert_eq!(bond.partner(1), None);
        assert!(bond.connects(7, 3));
        assert!(!bond.connects(3, 3));
    }
}
