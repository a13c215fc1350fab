use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Lines preceding the first entry of a label index file.
pub const LABEL_HEADER_LINES: usize = 6;

pub const TRAIN_KEYS_FILE: &str = "train_keys.txt";
pub const TEST_KEYS_FILE: &str = "test_keys.txt";

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Line {line}: expected at least 4 fields")]
    MissingField { line: usize },
    #[error("Line {line}: invalid affinity value '{value}'")]
    InvalidLabel { line: usize, value: String },
}

fn read(path: &Path) -> Result<String, LabelError> {
    fs::read_to_string(path).map_err(|source| LabelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Maps complex id (first field) to affinity (fourth field) after skipping
/// the fixed header. Blank lines are ignored; a later duplicate id wins.
pub fn read_label_index(path: &Path) -> Result<HashMap<String, f64>, LabelError> {
    let content = read(path)?;
    let mut labels = HashMap::new();
    for (idx, line) in content.lines().enumerate().skip(LABEL_HEADER_LINES) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let line_num = idx + 1;
        if fields.len() < 4 {
            return Err(LabelError::MissingField { line: line_num });
        }
        let value: f64 = fields[3].parse().map_err(|_| LabelError::InvalidLabel {
            line: line_num,
            value: fields[3].to_string(),
        })?;
        labels.insert(fields[0].to_string(), value);
    }
    Ok(labels)
}

/// Whitespace-separated keys, in file order.
pub fn read_key_list(path: &Path) -> Result<Vec<String>, LabelError> {
    Ok(read(path)?.split_whitespace().map(str::to_string).collect())
}

/// Reads the pre-split train and test key lists from `key_dir`.
pub fn read_key_split(key_dir: &Path) -> Result<(Vec<String>, Vec<String>), LabelError> {
    let train = read_key_list(&key_dir.join(TRAIN_KEYS_FILE))?;
    let test = read_key_list(&key_dir.join(TEST_KEYS_FILE))?;
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const INDEX: &str = "\
# ==============================================================================
# List of the protein-ligand complexes
# 3 complexes in total
# ==============================================================================
# PDB code, resolution, release year, -logKd/Ki, Kd/Ki, reference
#
2r58  2.00  2007   2.00  Kd=10mM      // 2r58.pdf (MLY)
3c2f  2.35  2008   2.00  Kd=10.1mM    // 3c2f.pdf (PRP)

1abc  1.50  2001   7.35  Ki=45nM      // 1abc.pdf (XYZ)
";

    #[test]
    fn label_index_skips_header_and_reads_fourth_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("INDEX");
        std::fs::write(&path, INDEX).unwrap();
        let labels = read_label_index(&path).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels["1abc"], 7.35);
        assert_eq!(labels["2r58"], 2.0);
    }

    #[test]
    fn label_index_reports_unparsable_value_with_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("INDEX");
        let text = INDEX.replace("7.35", "n/a");
        std::fs::write(&path, text).unwrap();
        let err = read_label_index(&path).unwrap_err();
        assert!(matches!(err, LabelError::InvalidLabel { line: 10, ref value } if value == "n/a"));
    }

    #[test]
    fn key_split_reads_both_lists() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(TRAIN_KEYS_FILE), "1abc\n2r58\n").unwrap();
        std::fs::write(dir.path().join(TEST_KEYS_FILE), "3c2f 4xyz").unwrap();
        let (train, test) = read_key_split(dir.path()).unwrap();
        assert_eq!(train, vec!["1abc", "2r58"]);
        assert_eq!(test, vec!["3c2f", "4xyz"]);
    }

    #[test]
    fn missing_key_list_is_an_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(read_key_split(dir.path()), Err(LabelError::Io { .. })));
    }
}
