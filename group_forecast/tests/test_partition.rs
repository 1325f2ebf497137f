mod common;

use common::{sales_frame, units, SERIES};
use group_forecast::data::SalesTable;
use group_forecast::levels::{find_model_level, ALL_COLUMN};
use group_forecast::{GroupKey, GroupPartitioner, PipelineError};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashSet;

fn sales() -> SalesTable {
    SalesTable::from_dataframe(sales_frame(&SERIES, 10, units)).unwrap()
}

#[rstest]
#[case(1, 1)]
#[case(2, 2)]
#[case(3, 3)]
#[case(4, 2)]
#[case(5, 2)]
#[case(6, 3)]
#[case(7, 3)]
#[case(8, 4)]
#[case(9, 4)]
#[case(10, 3)]
#[case(11, 3)]
#[case(12, 4)]
fn test_every_row_lands_in_one_group(#[case] level_id: u32, #[case] expected_groups: usize) {
    let level = find_model_level(level_id).unwrap();
    let (summary, groups) = GroupPartitioner::partition(&sales(), level).unwrap();

    assert_eq!(groups.len(), expected_groups);
    assert_eq!(summary.group_count(), expected_groups);

    let rows: usize = groups.iter().map(|g| g.sales.len()).sum();
    assert_eq!(rows, SERIES.len());
    assert_eq!(summary.total_series(), SERIES.len());

    let keys: HashSet<&GroupKey> = groups.iter().map(|g| &g.key).collect();
    assert_eq!(keys.len(), groups.len());

    let ids: HashSet<String> = groups
        .iter()
        .flat_map(|g| g.sales.text_column("id").unwrap())
        .collect();
    assert_eq!(ids.len(), SERIES.len());
}

#[rstest]
#[case(1)]
#[case(6)]
#[case(12)]
fn test_empty_sales_table_has_no_groups(#[case] level_id: u32) {
    let empty = SalesTable::from_dataframe(sales_frame(&SERIES, 40, units).head(Some(0))).unwrap();
    let level = find_model_level(level_id).unwrap();

    let (summary, groups) = GroupPartitioner::partition(&empty, level).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.group_count(), 0);
    assert_eq!(summary.total_series(), 0);
}

#[test]
fn test_state_and_category_groups() {
    let level = find_model_level(6).unwrap();
    let (summary, groups) = GroupPartitioner::partition(&sales(), level).unwrap();

    let keys: Vec<GroupKey> = groups.iter().map(|g| g.key.clone()).collect();
    assert_eq!(
        keys,
        vec![
            GroupKey::new(["CA", "FOODS"]),
            GroupKey::new(["TX", "FOODS"]),
            GroupKey::new(["TX", "HOBBIES"]),
        ]
    );
    let counts: Vec<usize> = summary.counts().iter().map(|(_, n)| *n).collect();
    assert_eq!(counts, vec![2, 1, 1]);
    assert_eq!(summary.columns(), &["state_id".to_string(), "cat_id".to_string()]);
}

#[test]
fn test_group_tables_keep_day_columns() {
    let level = find_model_level(2).unwrap();
    let (_, groups) = GroupPartitioner::partition(&sales(), level).unwrap();

    for group in &groups {
        assert_eq!(group.sales.day_columns().len(), 10);
        assert!(group.sales.fixed_columns().contains(&ALL_COLUMN.to_string()));
        for state in group.sales.text_column("state_id").unwrap() {
            assert_eq!(GroupKey::new([state]), group.key);
        }
    }
}

#[test]
fn test_for_all_level_has_a_single_group() {
    let level = find_model_level(1).unwrap();
    let (summary, groups) = GroupPartitioner::partition(&sales(), level).unwrap();

    assert_eq!(groups[0].key, GroupKey::new(["all"]));
    assert!(summary.to_string().contains("for_all"));
}

#[test]
fn test_rows_with_missing_key_are_left_out() {
    let mut df = sales_frame(&SERIES, 10, units);
    df.with_column(Series::new("state_id", &[Some("CA"), None, Some("TX"), Some("TX")]))
        .unwrap();
    let sales = SalesTable::from_dataframe(df).unwrap();

    let level = find_model_level(2).unwrap();
    let (summary, _) = GroupPartitioner::partition(&sales, level).unwrap();
    assert_eq!(summary.total_series(), 3);
}

#[test]
fn test_missing_identity_column_is_rejected() {
    let df = sales_frame(&SERIES, 10, units).drop("cat_id").unwrap();
    assert!(matches!(
        SalesTable::from_dataframe(df),
        Err(PipelineError::ValidationError(_))
    ));
}

#[test]
fn test_gap_in_day_columns_is_rejected() {
    let df = sales_frame(&SERIES, 10, units).drop("d_4").unwrap();
    assert!(matches!(
        SalesTable::from_dataframe(df),
        Err(PipelineError::ValidationError(_))
    ));
}
