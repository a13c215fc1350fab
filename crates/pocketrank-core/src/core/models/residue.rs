use phf::{Set, phf_set};

static WATER_RESIDUES: Set<&'static str> = phf_set! { "HOH", "WAT", "DOD" };

/// Returns true for residue names that denote solvent water.
pub fn is_water_name(name: &str) -> bool {
    WATER_RESIDUES.contains(name.trim().to_ascii_uppercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_names_are_recognized() {
        assert!(is_water_name("HOH"));
        assert!(is_water_name("wat"));
        assert!(is_water_name(" DOD "));
        assert!(!is_water_name("SOL1"));
        assert!(!is_water_name("ALA"));
    }
}
