use std::ops::{Add, AddAssign};

/// Energy breakdown of a force-field evaluation, in kcal/mol.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTerm {
    pub bond: f64,
    pub angle: f64,
    pub torsion: f64,
    pub vdw: f64,
}

impl EnergyTerm {
    pub fn new(bond: f64, angle: f64, torsion: f64, vdw: f64) -> Self {
        Self {
            bond,
            angle,
            torsion,
            vdw,
        }
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.bond + self.angle + self.torsion + self.vdw
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            bond: self.bond + rhs.bond,
            angle: self.angle + rhs.angle,
            torsion: self.torsion + rhs.torsion,
            vdw: self.vdw + rhs.vdw,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_returns_sum_of_all_terms() {
        let term = EnergyTerm::new(1.5, -2.0, 0.5, 1.0);
        assert_eq!(term.total(), 1.0);
    }

    #[test]
    fn add_assign_accumulates_each_field() {
        let mut a = EnergyTerm::new(1.0, 2.0, 3.0, 4.0);
        a += EnergyTerm::new(4.0, 5.0, 6.0, 7.0);
        assert_eq!(a, EnergyTerm::new(5.0, 7.0, 9.0, 11.0));
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(EnergyTerm::default().total(), 0.0);
    }
}
