use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    #[serde(deserialize_with = "crate::loader::deserialize_date")]
    pub date: NaiveDate,
    pub state: String,
    pub store_id: String,
    pub product_id: String,
    pub sales: f64,
    pub margin: f64,
    pub out_of_stock_pct: f64,
}

/// The full dataset, in file order. Never mutated after load.
#[derive(Debug, Default)]
pub struct RawTable {
    records: Vec<SalesRecord>,
}

impl RawTable {
    pub fn new(records: Vec<SalesRecord>) -> Self {
        RawTable { records }
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }
}

/// Rows of a `RawTable` matching one selection, borrowed in table order.
#[derive(Debug, Clone, Default)]
pub struct FilteredTable<'a> {
    rows: Vec<&'a SalesRecord>,
}

impl<'a> FilteredTable<'a> {
    pub fn new(rows: Vec<&'a SalesRecord>) -> Self {
        FilteredTable { rows }
    }

    pub fn rows(&self) -> &[&'a SalesRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub state: String,
    pub store_id: String,
    pub product_id: String,
}

impl Selection {
    pub fn new(
        state: impl Into<String>,
        store_id: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Self {
        Selection {
            state: state.into(),
            store_id: store_id.into(),
            product_id: product_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSummary {
    pub latest_sales: f64,
    pub average_sales: f64,
    pub average_margin: f64,
    pub average_out_of_stock_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One model output: point estimate plus uncertainty band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub date: NaiveDate,
    pub yhat: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub actual: Option<f64>,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    pub points: Vec<ForecastPoint>,
    /// Last date with an observed value.
    pub cutoff: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductTotal {
    pub product_id: String,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreTotal {
    pub store_id: String,
    pub total_sales: f64,
}
