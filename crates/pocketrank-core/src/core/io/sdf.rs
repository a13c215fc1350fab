use crate::core::io::generic::{GenericError, molecule_from_generic};
use crate::core::io::traits::MolecularFile;
use crate::core::models::molecule::{Conformer, Molecule};
use bio_files::Sdf;
use nalgebra::Point3;
use std::io::{self, BufRead, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Record ends before its counts line")]
    MissingCountsLine,
    #[error("Only V2000 connection tables are supported")]
    UnsupportedVersion,
    #[error("Invalid SD record: {0}")]
    Record(#[from] GenericError),
}

fn field(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn charge_from_code(code: i32) -> i8 {
    match code {
        1 => 3,
        2 => 2,
        3 => 1,
        5 => -1,
        6 => -2,
        7 => -3,
        _ => 0,
    }
}

/// Formal charges of the first record, by atom index.
///
/// Atom-block charge codes apply unless the property block has `M  CHG`
/// entries, which replace all of them.
fn formal_charges(text: &str, num_atoms: usize) -> Vec<i8> {
    let mut lines = text.lines().skip(4);
    let mut charges: Vec<i8> = lines
        .by_ref()
        .take(num_atoms)
        .map(|line| charge_from_code(field(line, 36, 39).parse().unwrap_or(0)))
        .collect();
    charges.resize(num_atoms, 0);

    let mut charges_reset = false;
    for line in lines {
        if line.starts_with("M  END") || line.starts_with("$$$$") {
            break;
        }
        let Some(rest) = line.strip_prefix("M  CHG") else {
            continue;
        };
        if !charges_reset {
            charges.iter_mut().for_each(|c| *c = 0);
            charges_reset = true;
        }
        let values: Vec<i64> = rest
            .split_whitespace()
            .skip(1)
            .filter_map(|v| v.parse().ok())
            .collect();
        for pair in values.chunks(2) {
            if let &[index, charge] = pair {
                if let Some(slot) = usize::try_from(index - 1).ok().and_then(|i| charges.get_mut(i)) {
                    *slot = charge as i8;
                }
            }
        }
    }
    charges
}

/// Reads and writes MDL SD files (V2000 connection tables).
///
/// Reading parses the first record with `bio_files` and keeps all atoms as
/// written, hydrogens included; formal charges come from the record text since
/// the generic atoms carry none. Writing emits one record per conformer.
pub struct SdfFile;

impl MolecularFile for SdfFile {
    type Output = Molecule;
    type Error = SdfError;

    fn read_from(reader: &mut impl BufRead) -> Result<Molecule, SdfError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let counts = text.lines().nth(3).ok_or(SdfError::MissingCountsLine)?;
        if counts.contains("V3000") {
            return Err(SdfError::UnsupportedVersion);
        }

        let sdf = Sdf::new(&text)?;
        let mut molecule = molecule_from_generic(&sdf.ident, &sdf.atoms, &sdf.bonds)?;
        let charges = formal_charges(&text, molecule.num_atoms());
        for (atom, charge) in molecule.atoms_mut().iter_mut().zip(charges) {
            atom.formal_charge = charge;
        }
        Ok(molecule)
    }

    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), SdfError> {
        let origin = vec![Point3::origin(); molecule.num_atoms()];
        let fallback = [Conformer::new(origin)];
        let conformers = if molecule.num_conformers() == 0 {
            &fallback[..]
        } else {
            molecule.conformers()
        };

        for conformer in conformers {
            writeln!(writer, "{}", molecule.name)?;
            writeln!(writer, "     pocketrank          3D")?;
            writeln!(writer)?;
            writeln!(
                writer,
                "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
                molecule.num_atoms(),
                molecule.num_bonds()
            )?;
            for (atom, p) in molecule.atoms().iter().zip(&conformer.positions) {
                writeln!(
                    writer,
                    "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
                    p.x,
                    p.y,
                    p.z,
                    atom.element.symbol()
                )?;
            }
            for bond in molecule.bonds() {
                writeln!(
                    writer,
                    "{:>3}{:>3}{:>3}  0",
                    bond.begin + 1,
                    bond.end + 1,
                    bond.order.mdl_code()
                )?;
            }
            let charged: Vec<(usize, i8)> = molecule
                .atoms()
                .iter()
                .enumerate()
                .filter(|(_, a)| a.formal_charge != 0)
                .map(|(i, a)| (i + 1, a.formal_charge))
                .collect();
            for chunk in charged.chunks(8) {
                write!(writer, "M  CHG{:>3}", chunk.len())?;
                for (index, charge) in chunk {
                    write!(writer, " {:>3} {:>3}", index, charge)?;
                }
                writeln!(writer)?;
            }
            writeln!(writer, "M  END")?;
            writeln!(writer, "$$$$")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::topology::BondOrder;
    use std::io::Cursor;

    const ACETATE_SDF: &str = "\
acetate
     RDKit          3D

  4  3  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.5000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    2.2000    1.1000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
    2.2000   -1.1000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
  2  3  2  0
  2  4  1  0
M  CHG  1   4  -1
M  END
$$$$
";

    #[test]
    fn read_parses_atoms_bonds_and_charges() {
        let mol = SdfFile::read_from(&mut Cursor::new(ACETATE_SDF)).unwrap();
        assert_eq!(mol.name, "acetate");
        assert_eq!(mol.num_atoms(), 4);
        assert_eq!(mol.num_bonds(), 3);
        assert_eq!(mol.atoms()[3].formal_charge, -1);
        assert!(mol.bonds().iter().any(|b| b.connects(1, 2) && b.order == BondOrder::Double));
        let p = mol.conformer(0).unwrap().positions[1];
        assert!((p.x - 1.5).abs() < 1e-6 && p.y.abs() < 1e-6);
    }

    #[test]
    fn atom_block_charge_codes_apply_without_chg_lines() {
        let text = "\
ammonium


  1  0  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 N   0  3  0  0  0  0  0  0  0  0  0  0
M  END
";
        assert_eq!(formal_charges(text, 1), vec![1]);
    }

    #[test]
    fn chg_lines_replace_atom_block_charges() {
        let text = ACETATE_SDF.replacen(
            "    0.0000    0.0000    0.0000 C   0  0",
            "    0.0000    0.0000    0.0000 C   0  3",
            1,
        );
        assert_eq!(formal_charges(&text, 4), vec![0, 0, 0, -1]);
    }

    #[test]
    fn read_rejects_v3000() {
        let text = "x\n\n\n  0  0  0     0  0            999 V3000\n";
        let err = SdfFile::read_from(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(err, SdfError::UnsupportedVersion));
    }

    #[test]
    fn read_rejects_text_without_counts_line() {
        let err = SdfFile::read_from(&mut Cursor::new("not a molecule\n")).unwrap_err();
        assert!(matches!(err, SdfError::MissingCountsLine));
    }

    #[test]
    fn write_then_read_preserves_graph() {
        let mol = SdfFile::read_from(&mut Cursor::new(ACETATE_SDF)).unwrap();
        let mut out = Vec::new();
        SdfFile::write_to(&mol, &mut out).unwrap();
        let reread = SdfFile::read_from(&mut Cursor::new(out)).unwrap();
        assert_eq!(reread.num_atoms(), 4);
        assert_eq!(reread.bonds(), mol.bonds());
        assert_eq!(reread.atoms()[3].formal_charge, -1);
        let p = reread.conformer(0).unwrap().positions[2];
        assert!((p.x - 2.2).abs() < 1e-4 && (p.y - 1.1).abs() < 1e-4);
    }

    #[test]
    fn write_emits_one_record_per_conformer() {
        let mut mol = SdfFile::read_from(&mut Cursor::new(ACETATE_SDF)).unwrap();
        let shifted = mol.conformer(0).unwrap().positions.iter().map(|p| p + nalgebra::Vector3::x()).collect();
        mol.add_conformer(Conformer::new(shifted)).unwrap();
        let mut out = Vec::new();
        SdfFile::write_to(&mol, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("$$$$").count(), 2);
        assert_eq!(text.matches("M  CHG  1   4  -1").count(), 2);
    }
}
