use crate::aggregate::{store_sales_trailing_window, top_n_products};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::filters::filter;
use crate::forecast::{forecast, to_series, ForecastModel};
use crate::model::{ForecastSeries, MetricsSummary, ProductTotal, RawTable, Selection, StoreTotal};
use tracing::warn;

/// Views over the whole table; they do not depend on the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub top_products: Vec<ProductTotal>,
    pub store_sales: Vec<StoreTotal>,
}

impl Overview {
    pub fn build(table: &RawTable, config: &DashboardConfig) -> Self {
        Overview {
            top_products: top_n_products(table, config.top_n),
            store_sales: store_sales_trailing_window(table, config.window_days),
        }
    }
}

/// Everything derived from one selection. Each output fails on its own.
#[derive(Debug)]
pub struct SelectionView {
    pub selection: Selection,
    pub row_count: usize,
    pub metrics: Result<MetricsSummary>,
    pub forecast: Result<ForecastSeries>,
}

impl SelectionView {
    pub fn build<M: ForecastModel>(
        table: &RawTable,
        selection: &Selection,
        config: &DashboardConfig,
        model: &M,
    ) -> Self {
        let filtered = filter(table, selection);

        let metrics = MetricsSummary::compute(&filtered);
        let forecast = to_series(&filtered)
            .and_then(|series| forecast(model, &series, config.horizon_days));

        if let Err(e) = &forecast {
            warn!(?selection, error = %e, "forecast unavailable");
        }

        SelectionView {
            selection: selection.clone(),
            row_count: filtered.len(),
            metrics,
            forecast,
        }
    }
}
