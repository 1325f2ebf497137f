//! Shared fixtures for the integration tests
#![allow(dead_code)]

use group_forecast::data::{day_column, RawTables};
use polars::prelude::*;
use std::fs;
use std::path::Path;

/// item, dept, cat, store, state
pub type SeriesIdentity = [&'static str; 5];

/// Four series across two states, three stores and two categories
pub const SERIES: [SeriesIdentity; 4] = [
    ["FOODS_1_001", "FOODS_1", "FOODS", "CA_1", "CA"],
    ["FOODS_1_001", "FOODS_1", "FOODS", "CA_2", "CA"],
    ["HOBBIES_1_001", "HOBBIES_1", "HOBBIES", "TX_1", "TX"],
    ["FOODS_1_002", "FOODS_1", "FOODS", "TX_1", "TX"],
];

pub fn series_id(identity: &SeriesIdentity) -> String {
    format!("{}_{}_evaluation", identity[0], identity[3])
}

/// Deterministic unit sales with a weekly pattern per series
pub fn units(series: usize, day: usize) -> f64 {
    ((series + 1) * (day % 7 + 1)) as f64
}

/// Wide sales table over `d_1..=d_days`
pub fn sales_frame(series: &[SeriesIdentity], days: usize, units: impl Fn(usize, usize) -> f64) -> DataFrame {
    let text = |idx: usize| series.iter().map(|s| s[idx]).collect::<Vec<_>>();
    let ids: Vec<String> = series.iter().map(series_id).collect();
    let mut columns = vec![
        Series::new("id", ids.iter().map(String::as_str).collect::<Vec<_>>()),
        Series::new("item_id", text(0)),
        Series::new("dept_id", text(1)),
        Series::new("cat_id", text(2)),
        Series::new("store_id", text(3)),
        Series::new("state_id", text(4)),
    ];
    for day in 0..days {
        let values: Vec<f64> = (0..series.len()).map(|s| units(s, day)).collect();
        columns.push(Series::new(&day_column(day + 1), values));
    }
    DataFrame::new(columns).unwrap()
}

/// Calendar over `d_1..=d_days`; SNAP days every 10th day, an event every 7th
pub fn calendar_frame(days: usize) -> DataFrame {
    let d: Vec<String> = (1..=days).map(day_column).collect();
    let date: Vec<String> = (0..days).map(|i| format!("2011-{:02}-{:02}", 1 + i / 28, 1 + i % 28)).collect();
    let event: Vec<Option<&str>> = (0..days).map(|i| (i % 7 == 6).then_some("SuperBowl")).collect();
    let event_type: Vec<Option<&str>> = (0..days).map(|i| (i % 7 == 6).then_some("Sporting")).collect();
    let none: Vec<Option<&str>> = vec![None; days];
    let snap: Vec<i64> = (0..days).map(|i| i64::from(i % 10 == 0)).collect();

    DataFrame::new(vec![
        Series::new("date", date.iter().map(String::as_str).collect::<Vec<_>>()),
        Series::new("wm_yr_wk", (0..days).map(|i| 11101 + (i / 7) as i64).collect::<Vec<_>>()),
        Series::new("weekday", (0..days).map(|i| ["Sat", "Sun", "Mon", "Tue", "Wed", "Thu", "Fri"][i % 7]).collect::<Vec<_>>()),
        Series::new("wday", (0..days).map(|i| (i % 7 + 1) as i64).collect::<Vec<_>>()),
        Series::new("month", (0..days).map(|i| (1 + i / 28) as i64).collect::<Vec<_>>()),
        Series::new("year", vec![2011i64; days]),
        Series::new("d", d.iter().map(String::as_str).collect::<Vec<_>>()),
        Series::new("event_name_1", event),
        Series::new("event_type_1", event_type),
        Series::new("event_name_2", none.clone()),
        Series::new("event_type_2", none),
        Series::new("snap_CA", snap.clone()),
        Series::new("snap_TX", snap.clone()),
        Series::new("snap_WI", snap),
    ])
    .unwrap()
}

pub fn sell_prices_frame() -> DataFrame {
    DataFrame::new(vec![
        Series::new("store_id", &["CA_1", "TX_1"]),
        Series::new("item_id", &["FOODS_1_001", "HOBBIES_1_001"]),
        Series::new("wm_yr_wk", &[11101i64, 11101]),
        Series::new("sell_price", &[2.0f64, 9.5]),
    ])
    .unwrap()
}

/// Validated tables for `SERIES` over `days` days
pub fn raw_tables(days: usize) -> RawTables {
    RawTables::from_dataframes(calendar_frame(days), sales_frame(&SERIES, days, units), sell_prices_frame()).unwrap()
}

/// Write the three input CSV files for `SERIES` into `dir`
pub fn write_csv_inputs(dir: &Path, days: usize) {
    let mut sales = String::from("id,item_id,dept_id,cat_id,store_id,state_id");
    for day in 1..=days {
        sales.push_str(&format!(",{}", day_column(day)));
    }
    sales.push('\n');
    for (s, identity) in SERIES.iter().enumerate() {
        sales.push_str(&format!("{},{}", series_id(identity), identity.join(",")));
        for day in 0..days {
            sales.push_str(&format!(",{}", units(s, day) as i64));
        }
        sales.push('\n');
    }
    fs::write(dir.join("sales_train.csv"), sales).unwrap();

    let mut calendar = String::from(
        "date,wm_yr_wk,weekday,wday,month,year,d,event_name_1,event_type_1,event_name_2,event_type_2,snap_CA,snap_TX,snap_WI\n",
    );
    for i in 0..days {
        let event = if i % 7 == 6 { "SuperBowl,Sporting" } else { "," };
        let snap = u8::from(i % 10 == 0);
        calendar.push_str(&format!(
            "2011-01-01,{},Sat,{},1,2011,{},{},,,{},{},{}\n",
            11101 + i / 7,
            i % 7 + 1,
            day_column(i + 1),
            event,
            snap,
            snap,
            snap
        ));
    }
    fs::write(dir.join("calendar.csv"), calendar).unwrap();

    fs::write(
        dir.join("sell_prices.csv"),
        "store_id,item_id,wm_yr_wk,sell_price\nCA_1,FOODS_1_001,11101,2.0\nTX_1,HOBBIES_1_001,11101,9.5\n",
    )
    .unwrap();
}
