//! Record-oriented tables exchanged with the trainer and the result store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One row, column name to value
pub type Record = Map<String, Value>;

/// A table stored as a list of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTable {
    records: Vec<Record>,
}

impl RecordTable {
    /// Wrap existing records
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Build a table from text columns followed by numeric columns.
    ///
    /// Every column must have the same length; that length is the number
    /// of records. Non-finite numbers become `null`.
    pub fn from_columns(text: &[(String, Vec<String>)], numeric: &[(String, Vec<f64>)]) -> Self {
        let rows = text
            .first()
            .map(|(_, v)| v.len())
            .or_else(|| numeric.first().map(|(_, v)| v.len()))
            .unwrap_or(0);

        let records = (0..rows)
            .map(|row| {
                let mut record = Record::new();
                for (name, values) in text {
                    record.insert(name.clone(), Value::String(values[row].clone()));
                }
                for (name, values) in numeric {
                    let value = Number::from_f64(values[row])
                        .map(Value::Number)
                        .unwrap_or(Value::Null);
                    record.insert(name.clone(), value);
                }
                record
            })
            .collect();

        Self { records }
    }

    /// The records in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Numeric value of `column` in every record, `None` where missing
    pub fn numeric_column(&self, column: &str) -> Vec<Option<f64>> {
        self.records
            .iter()
            .map(|r| r.get(column).and_then(Value::as_f64))
            .collect()
    }
}
