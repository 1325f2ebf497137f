//! Model level catalog
//!
//! A model level fixes the aggregation granularity: the sales rows sharing
//! the same values in the level's columns form one forecasting group.

use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::fmt;

/// Synthetic constant column added before grouping so level 1 can group
/// everything together
pub const ALL_COLUMN: &str = "for_all";

/// Value of [`ALL_COLUMN`] on every row
pub const ALL_VALUE: &str = "all";

/// One aggregation granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelLevel {
    id: u32,
    description: &'static str,
    group_by_columns: &'static [&'static str],
}

impl ModelLevel {
    /// Level identifier, dense over `1..=MODEL_LEVELS.len()`
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Human readable description
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Ordered columns forming the group key
    pub fn group_by_columns(&self) -> &'static [&'static str] {
        self.group_by_columns
    }
}

impl fmt::Display for ModelLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>2}  {:<28} {}",
            self.id,
            self.group_by_columns.join(", "),
            self.description
        )
    }
}

const fn level(
    id: u32,
    description: &'static str,
    group_by_columns: &'static [&'static str],
) -> ModelLevel {
    ModelLevel {
        id,
        description,
        group_by_columns,
    }
}

/// The fixed catalog of model levels
pub const MODEL_LEVELS: [ModelLevel; 12] = [
    level(1, "Unit sales of all products, for all stores/states", &[ALL_COLUMN]),
    level(2, "Unit sales of all products, for each state", &["state_id"]),
    level(3, "Unit sales of all products, for each store", &["store_id"]),
    level(4, "Unit sales of all products, for each category", &["cat_id"]),
    level(5, "Unit sales of all products, for each department", &["dept_id"]),
    level(
        6,
        "Unit sales of all products, for each state and category",
        &["state_id", "cat_id"],
    ),
    level(
        7,
        "Unit sales of all products, for each state and department",
        &["state_id", "dept_id"],
    ),
    level(
        8,
        "Unit sales of all products, for each store and category",
        &["store_id", "cat_id"],
    ),
    level(
        9,
        "Unit sales of all products, for each store and department",
        &["store_id", "dept_id"],
    ),
    level(10, "Unit sales of product x, for all stores/states", &["item_id"]),
    level(
        11,
        "Unit sales of product x, for each state",
        &["item_id", "state_id"],
    ),
    level(
        12,
        "Unit sales of product x, for each store",
        &["item_id", "store_id"],
    ),
];

/// All model levels in id order
pub fn model_levels() -> &'static [ModelLevel] {
    &MODEL_LEVELS
}

/// Look up a level by id
pub fn find_model_level(id: u32) -> Result<&'static ModelLevel> {
    MODEL_LEVELS.iter().find(|l| l.id == id).ok_or_else(|| {
        PipelineError::ConfigError(format!(
            "'model_level' {} is not within the expected range 1..={}",
            id,
            MODEL_LEVELS.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_dense_and_unique() {
        for (idx, level) in model_levels().iter().enumerate() {
            assert_eq!(level.id() as usize, idx + 1);
            assert!(!level.group_by_columns().is_empty());
        }
        let ids: HashSet<u32> = model_levels().iter().map(|l| l.id()).collect();
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn test_find_model_level() {
        assert_eq!(find_model_level(3).unwrap().group_by_columns(), &["store_id"]);
        assert_eq!(
            find_model_level(12).unwrap().group_by_columns(),
            &["item_id", "store_id"]
        );
        assert!(matches!(
            find_model_level(0),
            Err(PipelineError::ConfigError(_))
        ));
        assert!(matches!(
            find_model_level(13),
            Err(PipelineError::ConfigError(_))
        ));
    }
}
