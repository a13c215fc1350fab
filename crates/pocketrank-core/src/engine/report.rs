use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report '{path}': {source}")]
    Write { path: String, source: csv::Error },
}

/// One line of a prediction report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: f64,
    pub native: f64,
    pub decoy: f64,
}

/// Per-key predictions for a single pass, in first-seen key order.
/// Recording a key again overwrites its values in place.
#[derive(Debug, Default, Clone)]
pub struct PredictionTable {
    keys: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Prediction>,
}

impl PredictionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str, label: f64, native: f64, decoy: f64) {
        let row = Prediction { label, native, decoy };
        match self.index.get(key) {
            Some(&i) => self.rows[i] = row,
            None => {
                self.index.insert(key.to_string(), self.rows.len());
                self.keys.push(key.to_string());
                self.rows.push(row);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Prediction> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prediction)> {
        self.keys.iter().map(String::as_str).zip(&self.rows)
    }

    pub fn labels(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.label).collect()
    }

    pub fn native_predictions(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.native).collect()
    }
}

/// Truncates `path` and writes one `key\tlabel\tpred1\tpred2` line per key.
pub fn write_predictions(path: &Path, table: &PredictionTable) -> Result<(), ReportError> {
    let wrap = |source: csv::Error| ReportError::Write {
        path: path.display().to_string(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .map_err(wrap)?;
    for (key, row) in table.iter() {
        writer
            .write_record([
                key.to_string(),
                row.label.to_string(),
                row.native.to_string(),
                row.decoy.to_string(),
            ])
            .map_err(wrap)?;
    }
    writer.flush().map_err(|e| wrap(e.into()))?;
    Ok(())
}
