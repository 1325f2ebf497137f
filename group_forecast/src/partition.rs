//! Splitting the sales table into independent groups

use crate::data::SalesTable;
use crate::error::{PipelineError, Result};
use crate::levels::{ModelLevel, ALL_COLUMN, ALL_VALUE};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator between encoded key values; never produced by [`escape`]
const KEY_SEPARATOR: char = '+';

/// Values of the group-by columns identifying one group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    values: Vec<String>,
}

impl GroupKey {
    /// Key from its column values, in group-by column order
    pub fn new<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Column values
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Filename-safe encoding.
    ///
    /// Each value keeps ASCII alphanumerics and `-`; every other byte of
    /// its UTF-8 form becomes `%XX`. Values are joined with `+`, which the
    /// escaping never emits, so distinct keys never share an encoding.
    pub fn encode(&self) -> String {
        self.values
            .iter()
            .map(|v| escape(v))
            .collect::<Vec<_>>()
            .join(&KEY_SEPARATOR.to_string())
    }

    /// Inverse of [`GroupKey::encode`].
    ///
    /// Only the exact output of `encode` is accepted, so a decoded key
    /// always encodes back to the same filename.
    pub fn decode(encoded: &str) -> Result<Self> {
        let values = encoded
            .split(KEY_SEPARATOR)
            .map(unescape)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.values.as_slice() {
            [single] => write!(f, "{}", single),
            values => write!(f, "({})", values.join(", ")),
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn unescape(encoded: &str) -> Result<String> {
    let invalid = || PipelineError::DataError(format!("'{}' is not a valid encoded key value", encoded));
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'%' => {
                let hex = encoded.get(idx + 1..idx + 3).ok_or_else(invalid)?;
                out.push(u8::from_str_radix(hex, 16).map_err(|_| invalid())?);
                idx += 3;
            }
            b if b.is_ascii_alphanumeric() || b == b'-' => {
                out.push(b);
                idx += 1;
            }
            _ => return Err(invalid()),
        }
    }
    let value = String::from_utf8(out).map_err(|_| invalid())?;
    // lowercase hex or escaped alphanumerics decode but never come out of `escape`
    if escape(&value) != encoded {
        return Err(invalid());
    }
    Ok(value)
}

/// One group: its key and the sales rows belonging to it
#[derive(Debug, Clone)]
pub struct Group {
    pub key: GroupKey,
    pub sales: SalesTable,
}

/// Number of raw series per group, for operator visibility
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    level_id: u32,
    columns: Vec<String>,
    counts: Vec<(GroupKey, usize)>,
}

impl GroupSummary {
    /// Level the summary was computed for
    pub fn level_id(&self) -> u32 {
        self.level_id
    }

    /// Group-by columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Series count per group, in group order
    pub fn counts(&self) -> &[(GroupKey, usize)] {
        &self.counts
    }

    /// Number of groups
    pub fn group_count(&self) -> usize {
        self.counts.len()
    }

    /// Series across all groups
    pub fn total_series(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

impl fmt::Display for GroupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Raw time series per model at level {} ({}):",
            self.level_id,
            self.columns.join(", ")
        )?;
        for (key, count) in &self.counts {
            writeln!(f, "  {:<32} {}", key.to_string(), count)?;
        }
        Ok(())
    }
}

/// Groups sales rows by a model level's columns
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupPartitioner;

impl GroupPartitioner {
    /// Split `sales` into groups ordered by key.
    ///
    /// Rows whose key has a missing value are left out, matching how
    /// grouping treats nulls. Each group's table still carries the
    /// synthetic [`ALL_COLUMN`].
    pub fn partition(sales: &SalesTable, level: &ModelLevel) -> Result<(GroupSummary, Vec<Group>)> {
        let mut df = sales.dataframe().clone();
        df.with_column(Series::new(ALL_COLUMN, vec![ALL_VALUE; df.height()]))?;

        let mut key_columns = Vec::with_capacity(level.group_by_columns().len());
        for column in level.group_by_columns() {
            let values = df
                .column(column)
                .map_err(|_| {
                    PipelineError::ValidationError(format!(
                        "Group-by column '{}' of model level {} is missing from the sales table",
                        column,
                        level.id()
                    ))
                })?
                .cast(&DataType::Utf8)?;
            let values: Vec<Option<String>> = values
                .utf8()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect();
            key_columns.push(values);
        }

        let mut rows_by_key: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
        let mut dropped = 0usize;
        for row in 0..df.height() {
            let values: Option<Vec<String>> = key_columns.iter().map(|c| c[row].clone()).collect();
            match values {
                Some(values) => rows_by_key.entry(GroupKey::new(values)).or_default().push(row),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::warn!(dropped, "sales rows with a missing group key were left out");
        }

        let mut counts = Vec::with_capacity(rows_by_key.len());
        let mut groups = Vec::with_capacity(rows_by_key.len());
        for (key, rows) in rows_by_key {
            let mut mask = vec![false; df.height()];
            for &row in &rows {
                mask[row] = true;
            }
            let sub = df.filter(&BooleanChunked::from_slice("mask", &mask))?;
            counts.push((key.clone(), rows.len()));
            groups.push(Group {
                key,
                sales: SalesTable::from_dataframe(sub)?,
            });
        }

        let summary = GroupSummary {
            level_id: level.id(),
            columns: level.group_by_columns().iter().map(|c| c.to_string()).collect(),
            counts,
        };
        tracing::info!(
            level = level.id(),
            groups = summary.group_count(),
            series = summary.total_series(),
            "partitioned sales table"
        );

        Ok((summary, groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_round_trip() {
        let key = GroupKey::new(["CA_1", "FOODS 2/x+y"]);
        let encoded = key.encode();
        assert_eq!(encoded, "CA%5F1+FOODS%202%2Fx%2By");
        assert_eq!(GroupKey::decode(&encoded).unwrap(), key);
    }

    #[test]
    fn test_encoding_does_not_collide() {
        let a = GroupKey::new(["a+b"]);
        let b = GroupKey::new(["a", "b"]);
        let c = GroupKey::new(["a_b"]);
        assert_ne!(a.encode(), b.encode());
        assert_ne!(a.encode(), c.encode());
        assert_ne!(b.encode(), c.encode());
    }

    #[test]
    fn test_unicode_and_empty_values() {
        let key = GroupKey::new(["é", ""]);
        assert_eq!(GroupKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(GroupKey::decode("a_b").is_err());
        assert!(GroupKey::decode("%4").is_err());
        assert!(GroupKey::decode("%ZZ").is_err());
    }

    #[test]
    fn test_decode_rejects_non_canonical_escapes() {
        assert_eq!(GroupKey::decode("CA%5F1").unwrap(), GroupKey::new(["CA_1"]));
        assert!(GroupKey::decode("CA%5f1").is_err());
        assert!(GroupKey::decode("%41").is_err());
        assert!(GroupKey::decode("CA+%2D").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(GroupKey::new(["CA"]).to_string(), "CA");
        assert_eq!(GroupKey::new(["CA", "FOODS"]).to_string(), "(CA, FOODS)");
    }
}
