//! Generate a small synthetic data set and run every group of one level
//!
//! cargo run --example synthetic_run -- 9

use anyhow::Result;
use group_forecast::models::TrainerKind;
use group_forecast::{find_model_level, Orchestrator, PipelineConfig};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const DAYS: usize = 120;
const STORES: [(&str, &str); 3] = [("CA_1", "CA"), ("TX_1", "TX"), ("WI_1", "WI")];
const ITEMS: [(&str, &str, &str); 3] = [
    ("FOODS_1_001", "FOODS_1", "FOODS"),
    ("FOODS_2_001", "FOODS_2", "FOODS"),
    ("HOUSEHOLD_1_001", "HOUSEHOLD_1", "HOUSEHOLD"),
];

fn write_inputs(dir: &Path) -> Result<()> {
    let mut sales = String::from("id,item_id,dept_id,cat_id,store_id,state_id");
    for day in 1..=DAYS {
        write!(sales, ",d_{}", day)?;
    }
    sales.push('\n');
    for (s, (store, state)) in STORES.iter().enumerate() {
        for (i, (item, dept, cat)) in ITEMS.iter().enumerate() {
            write!(sales, "{item}_{store}_evaluation,{item},{dept},{cat},{store},{state}")?;
            for day in 0..DAYS {
                let weekly = [3, 2, 2, 2, 3, 5, 6][day % 7];
                write!(sales, ",{}", weekly * (i + 1) + s + day / 30)?;
            }
            sales.push('\n');
        }
    }
    fs::write(dir.join("sales_train.csv"), sales)?;

    let mut calendar = String::from(
        "date,wm_yr_wk,weekday,wday,month,year,d,event_name_1,event_type_1,event_name_2,event_type_2,snap_CA,snap_TX,snap_WI\n",
    );
    for day in 0..DAYS {
        let snap = u8::from(day % 30 < 10);
        let event = if day % 45 == 44 { "Holiday,National" } else { "," };
        writeln!(
            calendar,
            "2016-01-01,{},Sat,{},1,2016,d_{},{},,,{snap},{snap},{snap}",
            11601 + day / 7,
            day % 7 + 1,
            day + 1,
            event
        )?;
    }
    fs::write(dir.join("calendar.csv"), calendar)?;

    fs::write(
        dir.join("sell_prices.csv"),
        "store_id,item_id,wm_yr_wk,sell_price\nCA_1,FOODS_1_001,11601,1.25\n",
    )?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let level_id = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(2);
    println!("Level: {}", find_model_level(level_id)?);

    let root = std::env::temp_dir().join("sales_owl_demo");
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir)?;
    write_inputs(&data_dir)?;

    let mut config = PipelineConfig::new(level_id, 50);
    config.n_training = 14;
    config.n_forecast = 14;
    config.data_dir = data_dir;
    config.results_dir = root.join("results");

    for trainer in [TrainerKind::MovingAverage, TrainerKind::Linear] {
        config.trainer = trainer;
        let orchestrator = Orchestrator::from_config(config.clone())?;
        let report = orchestrator.run_from_disk()?;
        println!("\n=== {:?} ===\n{}", trainer, report);
    }

    println!("Results in {}", root.join("results").display());
    Ok(())
}
