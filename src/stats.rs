use crate::error::{DashboardError, Result};
use crate::model::{FilteredTable, MetricsSummary, SalesRecord};
use statrs::statistics::Statistics;

fn column_mean(filtered: &FilteredTable, column: impl Fn(&SalesRecord) -> f64) -> Result<f64> {
    if filtered.is_empty() {
        return Err(DashboardError::EmptyInput);
    }
    Ok(filtered.rows().iter().map(|&r| column(r)).mean())
}

/// Sales on the most recent date. With several rows on that date the last one wins.
pub fn latest_sales(filtered: &FilteredTable) -> Result<f64> {
    filtered
        .rows()
        .iter()
        .max_by_key(|r| r.date)
        .map(|r| r.sales)
        .ok_or(DashboardError::EmptyInput)
}

pub fn average_sales(filtered: &FilteredTable) -> Result<f64> {
    column_mean(filtered, |r| r.sales)
}

pub fn average_margin(filtered: &FilteredTable) -> Result<f64> {
    column_mean(filtered, |r| r.margin)
}

pub fn average_out_of_stock_pct(filtered: &FilteredTable) -> Result<f64> {
    column_mean(filtered, |r| r.out_of_stock_pct)
}

impl MetricsSummary {
    pub fn compute(filtered: &FilteredTable) -> Result<Self> {
        Ok(MetricsSummary {
            latest_sales: latest_sales(filtered)?,
            average_sales: average_sales(filtered)?,
            average_margin: average_margin(filtered)?,
            average_out_of_stock_pct: average_out_of_stock_pct(filtered)?,
        })
    }
}
