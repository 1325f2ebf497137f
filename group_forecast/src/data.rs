//! Input tables, their column contracts and the CSV loader

use crate::error::{PipelineError, Result};
use ndarray::Array2;
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Identity columns every sales row carries
pub const IDENTITY_COLUMNS: [&str; 6] = ["item_id", "dept_id", "cat_id", "store_id", "state_id", "id"];

/// Prefix of the daily unit-sold columns
pub const DAY_PREFIX: &str = "d_";

/// Calendar columns the pipeline relies on
pub const CALENDAR_COLUMNS: [&str; 14] = [
    "d",
    "date",
    "wm_yr_wk",
    "weekday",
    "wday",
    "month",
    "year",
    "event_name_1",
    "event_type_1",
    "event_name_2",
    "event_type_2",
    "snap_CA",
    "snap_TX",
    "snap_WI",
];

/// Sell price columns
pub const SELL_PRICE_COLUMNS: [&str; 4] = ["store_id", "item_id", "wm_yr_wk", "sell_price"];

/// Exogenous feature names, in the order they are appended to a group matrix
pub const EXOGENOUS_COLUMNS: [&str; 5] = ["snap_CA", "snap_TX", "snap_WI", "event_1_flag", "event_2_flag"];

/// Default file names inside the data directory
pub const CALENDAR_FILE: &str = "calendar.csv";
pub const SALES_FILE: &str = "sales_train.csv";
pub const SELL_PRICES_FILE: &str = "sell_prices.csv";

/// Named set of columns a table must contain
#[derive(Debug, Clone)]
pub struct TableDefinition {
    name: &'static str,
    columns: Vec<String>,
}

impl TableDefinition {
    /// Create a definition from column names
    pub fn new<S: AsRef<str>>(name: &'static str, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name,
            columns: columns.into_iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    /// Calendar table definition
    pub fn calendar() -> Self {
        Self::new("calendar", CALENDAR_COLUMNS)
    }

    /// Sales table definition for the identity columns plus `d_1..=d_days`
    pub fn sales(days: usize) -> Self {
        let columns = IDENTITY_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain((1..=days).map(day_column));
        Self::new("sales", columns)
    }

    /// Sell prices table definition
    pub fn sell_prices() -> Self {
        Self::new("sell_prices", SELL_PRICE_COLUMNS)
    }

    /// Table name
    pub fn name(&self) -> &str {
        self.name
    }

    /// All expected column names
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Fail if `df` lacks any expected column
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        let actual: BTreeSet<&str> = df.get_column_names().into_iter().collect();
        let missing: Vec<&str> = self
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| !actual.contains(c))
            .collect();

        if !missing.is_empty() {
            return Err(PipelineError::ValidationError(format!(
                "Invalid {} table. Some expected columns are missing: {:?}",
                self.name, missing
            )));
        }
        Ok(())
    }
}

/// Name of the `n`-th day column (1-based)
pub fn day_column(n: usize) -> String {
    format!("{}{}", DAY_PREFIX, n)
}

fn day_number(column: &str) -> Option<usize> {
    column.strip_prefix(DAY_PREFIX)?.parse().ok()
}

/// Text values of a column, nulls become empty strings
pub(crate) fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let col = df
        .column(name)
        .map_err(|e| PipelineError::ValidationError(format!("Column '{}' not found: {}", name, e)))?;
    let text = col.cast(&DataType::Utf8)?;
    Ok(text
        .utf8()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// Numeric values of a column, nulls kept as `None`
pub(crate) fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(name)
        .map_err(|e| PipelineError::ValidationError(format!("Column '{}' not found: {}", name, e)))?;
    let numbers = col.cast(&DataType::Float64).map_err(|e| {
        PipelineError::DataError(format!("Column '{}' cannot be converted to f64: {}", name, e))
    })?;
    Ok(numbers.f64()?.into_iter().collect())
}

/// Wide sales table: identity columns plus contiguous day columns
#[derive(Debug, Clone)]
pub struct SalesTable {
    df: DataFrame,
    day_columns: Vec<String>,
}

impl SalesTable {
    /// Validate and wrap a sales DataFrame
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        let day_columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|c| day_number(c).is_some())
            .map(str::to_string)
            .collect();

        if day_columns.is_empty() {
            return Err(PipelineError::ValidationError(
                "Invalid sales table. No day columns found".to_string(),
            ));
        }
        for (idx, column) in day_columns.iter().enumerate() {
            if day_number(column) != Some(idx + 1) {
                return Err(PipelineError::ValidationError(format!(
                    "Invalid sales table. Day columns must run contiguously from d_1, found '{}' at position {}",
                    column,
                    idx + 1
                )));
            }
        }
        TableDefinition::sales(day_columns.len()).validate(&df)?;

        Ok(Self { df, day_columns })
    }

    /// Underlying DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Day columns in order
    pub fn day_columns(&self) -> &[String] {
        &self.day_columns
    }

    /// Non-day columns in table order
    pub fn fixed_columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .filter(|c| day_number(c).is_none())
            .map(str::to_string)
            .collect()
    }

    /// Number of series (rows)
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Whether the table holds no series
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Keep only the first `n` rows
    pub fn head(&self, n: usize) -> Self {
        Self {
            df: self.df.head(Some(n)),
            day_columns: self.day_columns.clone(),
        }
    }

    /// Copy of the table without `column`, unchanged if it is absent
    pub fn without_column(&self, column: &str) -> Result<Self> {
        if !self.df.get_column_names().contains(&column) {
            return Ok(self.clone());
        }
        Ok(Self {
            df: self.df.drop(column)?,
            day_columns: self.day_columns.clone(),
        })
    }

    /// Text values of one column
    pub fn text_column(&self, column: &str) -> Result<Vec<String>> {
        column_as_strings(&self.df, column)
    }

    /// Units sold, shape `[series, days]`; missing values read as 0
    pub fn day_matrix(&self) -> Result<Array2<f64>> {
        let mut matrix = Array2::<f64>::zeros((self.len(), self.day_columns.len()));
        for (day, column) in self.day_columns.iter().enumerate() {
            for (row, value) in column_as_f64(&self.df, column)?.into_iter().enumerate() {
                matrix[[row, day]] = value.unwrap_or(0.0);
            }
        }
        Ok(matrix)
    }
}

/// Calendar-derived exogenous values of one day
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalendarFeatures {
    pub snap_ca: f64,
    pub snap_tx: f64,
    pub snap_wi: f64,
    pub event_1_flag: f64,
    pub event_2_flag: f64,
}

impl CalendarFeatures {
    /// Values in [`EXOGENOUS_COLUMNS`] order
    pub fn to_array(self) -> [f64; 5] {
        [
            self.snap_ca,
            self.snap_tx,
            self.snap_wi,
            self.event_1_flag,
            self.event_2_flag,
        ]
    }
}

/// Calendar table indexed by day key
#[derive(Debug, Clone)]
pub struct CalendarTable {
    by_day: HashMap<String, CalendarFeatures>,
}

impl CalendarTable {
    /// Validate a calendar DataFrame and index it by `d`
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        TableDefinition::calendar().validate(&df)?;

        let days = column_as_strings(&df, "d")?;
        let snap_ca = column_as_f64(&df, "snap_CA")?;
        let snap_tx = column_as_f64(&df, "snap_TX")?;
        let snap_wi = column_as_f64(&df, "snap_WI")?;
        let event_1 = column_as_strings(&df, "event_name_1")?;
        let event_2 = column_as_strings(&df, "event_name_2")?;

        let flag = |name: &str| if name.is_empty() { 0.0 } else { 1.0 };
        let mut by_day = HashMap::with_capacity(days.len());
        for (idx, day) in days.into_iter().enumerate() {
            let features = CalendarFeatures {
                snap_ca: snap_ca[idx].unwrap_or(0.0),
                snap_tx: snap_tx[idx].unwrap_or(0.0),
                snap_wi: snap_wi[idx].unwrap_or(0.0),
                event_1_flag: flag(&event_1[idx]),
                event_2_flag: flag(&event_2[idx]),
            };
            if by_day.insert(day.clone(), features).is_some() {
                return Err(PipelineError::ValidationError(format!(
                    "Invalid calendar table. Day '{}' appears more than once",
                    day
                )));
            }
        }

        Ok(Self { by_day })
    }

    /// Exogenous values for a day key, if the calendar has that day
    pub fn features(&self, day: &str) -> Option<CalendarFeatures> {
        self.by_day.get(day).copied()
    }

    /// Number of calendar days
    pub fn len(&self) -> usize {
        self.by_day.len()
    }

    /// Whether the calendar is empty
    pub fn is_empty(&self) -> bool {
        self.by_day.is_empty()
    }
}

/// Weekly sell prices; validated but not consumed by the pipeline
#[derive(Debug, Clone)]
pub struct SellPricesTable {
    rows: usize,
}

impl SellPricesTable {
    /// Validate a sell prices DataFrame
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        TableDefinition::sell_prices().validate(&df)?;
        Ok(Self { rows: df.height() })
    }

    /// Number of price rows
    pub fn row_count(&self) -> usize {
        self.rows
    }
}

/// The three validated input tables
#[derive(Debug, Clone)]
pub struct RawTables {
    pub calendar: CalendarTable,
    pub sales: SalesTable,
    pub sell_prices: SellPricesTable,
}

impl RawTables {
    /// Validate raw DataFrames and bundle them
    pub fn from_dataframes(calendar: DataFrame, sales: DataFrame, sell_prices: DataFrame) -> Result<Self> {
        Ok(Self {
            calendar: CalendarTable::from_dataframe(calendar)?,
            sales: SalesTable::from_dataframe(sales)?,
            sell_prices: SellPricesTable::from_dataframe(sell_prices)?,
        })
    }
}

/// Loads the input CSV files from a data directory
#[derive(Debug, Clone)]
pub struct TableLoader {
    data_dir: PathBuf,
    sales_row_limit: Option<usize>,
}

impl TableLoader {
    /// Loader reading from `data_dir`
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            sales_row_limit: None,
        }
    }

    /// Keep only the first `limit` sales rows
    pub fn with_sales_row_limit(mut self, limit: Option<usize>) -> Self {
        self.sales_row_limit = limit;
        self
    }

    /// Read one CSV file into a DataFrame
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;
        tracing::info!(path = %path.display(), rows = df.height(), "loaded table");
        Ok(df)
    }

    /// Load and validate calendar, sales and sell prices
    pub fn load(&self) -> Result<RawTables> {
        let calendar = Self::from_csv(self.data_dir.join(CALENDAR_FILE))?;
        let mut sales = Self::from_csv(self.data_dir.join(SALES_FILE))?;
        let sell_prices = Self::from_csv(self.data_dir.join(SELL_PRICES_FILE))?;

        if let Some(limit) = self.sales_row_limit {
            sales = sales.head(Some(limit));
        }

        RawTables::from_dataframes(calendar, sales, sell_prices)
    }
}
