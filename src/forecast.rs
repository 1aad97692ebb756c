//! Forecast orchestration: turn a filtered selection into a daily series, run
//! a forecasting model over it and merge the actual and predicted values into
//! one display-ready series.

use crate::error::{DashboardError, Result};
use crate::model::{FilteredTable, ForecastPoint, ForecastSeries, Prediction, SeriesPoint};
use chrono::{Datelike, Days, NaiveDate};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::time::Instant;
use tracing::info;

/// The forecasting capability needs at least this many distinct dates.
pub const MIN_DISTINCT_DATES: usize = 2;

/// Width of the uncertainty band around the point forecast.
pub const DEFAULT_INTERVAL_WIDTH: f64 = 0.8;

/// Histories shorter than two weeks get no day-of-week component.
const WEEKLY_MIN_SPAN_DAYS: i64 = 14;

/// A fitted model that can produce values for arbitrary dates.
pub trait TrainedForecastModel: Debug {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<Prediction>>;
}

/// A forecasting model that can be fitted on a daily history.
pub trait ForecastModel: Debug {
    type Trained: TrainedForecastModel;

    fn fit(&self, series: &[SeriesPoint]) -> Result<Self::Trained>;

    fn name(&self) -> &str;
}

/// Additive model: least-squares linear trend, plus a day-of-week effect once
/// the history spans two weeks, plus a symmetric band from the residual spread.
#[derive(Debug, Clone)]
pub struct AdditiveTrend {
    name: String,
    interval_width: f64,
}

#[derive(Debug, Clone)]
pub struct TrainedAdditiveTrend {
    origin: NaiveDate,
    intercept: f64,
    slope: f64,
    weekly: Option<[f64; 7]>,
    /// Half-width of the uncertainty band.
    margin: f64,
}

impl AdditiveTrend {
    pub fn new(interval_width: f64) -> Result<Self> {
        if !(interval_width > 0.0 && interval_width < 1.0) {
            return Err(DashboardError::ForecastFailure(format!(
                "interval width must be between 0 and 1, got {interval_width}"
            )));
        }

        Ok(AdditiveTrend {
            name: format!("Additive trend (interval={interval_width})"),
            interval_width,
        })
    }

    pub fn interval_width(&self) -> f64 {
        self.interval_width
    }
}

impl Default for AdditiveTrend {
    fn default() -> Self {
        AdditiveTrend {
            name: format!("Additive trend (interval={DEFAULT_INTERVAL_WIDTH})"),
            interval_width: DEFAULT_INTERVAL_WIDTH,
        }
    }
}

fn days_since(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64
}

fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

fn weekly_effects(residuals: &[(NaiveDate, f64)]) -> [f64; 7] {
    let mut sums = [0.0; 7];
    let mut counts = [0usize; 7];
    for &(date, r) in residuals {
        let d = weekday_index(date);
        sums[d] += r;
        counts[d] += 1;
    }

    let mut effects = [0.0; 7];
    let mut observed = Vec::with_capacity(7);
    for d in 0..7 {
        if counts[d] > 0 {
            effects[d] = sums[d] / counts[d] as f64;
            observed.push(effects[d]);
        }
    }

    // Center on the observed weekdays so the trend keeps the level.
    let center = observed.iter().mean();
    for d in 0..7 {
        if counts[d] > 0 {
            effects[d] -= center;
        }
    }
    effects
}

impl ForecastModel for AdditiveTrend {
    type Trained = TrainedAdditiveTrend;

    fn fit(&self, series: &[SeriesPoint]) -> Result<Self::Trained> {
        if series.iter().any(|p| !p.value.is_finite()) {
            return Err(DashboardError::ForecastFailure(
                "series contains non-finite values".to_string(),
            ));
        }

        let distinct = distinct_dates(series);
        let (Some(&origin), Some(&last)) = (distinct.first(), distinct.last()) else {
            return Err(DashboardError::InsufficientData {
                required: MIN_DISTINCT_DATES,
                actual: 0,
            });
        };
        if distinct.len() < MIN_DISTINCT_DATES {
            return Err(DashboardError::InsufficientData {
                required: MIN_DISTINCT_DATES,
                actual: distinct.len(),
            });
        }

        let n = series.len() as f64;
        let t_mean = series.iter().map(|p| days_since(origin, p.date)).sum::<f64>() / n;
        let y_mean = series.iter().map(|p| p.value).sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for p in series {
            let t_diff = days_since(origin, p.date) - t_mean;
            numerator += t_diff * (p.value - y_mean);
            denominator += t_diff * t_diff;
        }
        if denominator == 0.0 {
            return Err(DashboardError::ForecastFailure(
                "degenerate time axis".to_string(),
            ));
        }

        let slope = numerator / denominator;
        let intercept = y_mean - slope * t_mean;
        let trend = |date: NaiveDate| intercept + slope * days_since(origin, date);

        let mut residuals: Vec<(NaiveDate, f64)> =
            series.iter().map(|p| (p.date, p.value - trend(p.date))).collect();

        let weekly = if (last - origin).num_days() >= WEEKLY_MIN_SPAN_DAYS {
            let effects = weekly_effects(&residuals);
            for (date, r) in residuals.iter_mut() {
                *r -= effects[weekday_index(*date)];
            }
            Some(effects)
        } else {
            None
        };

        let sigma = if residuals.len() > 2 {
            residuals.iter().map(|(_, r)| *r).std_dev()
        } else {
            0.0
        };
        let z = Normal::new(0.0, 1.0)
            .map_err(|e| DashboardError::ForecastFailure(e.to_string()))?
            .inverse_cdf(0.5 + self.interval_width / 2.0);
        let margin = z * sigma;

        if !(slope.is_finite() && intercept.is_finite() && margin.is_finite()) {
            return Err(DashboardError::ForecastFailure(
                "model parameters are not finite".to_string(),
            ));
        }

        Ok(TrainedAdditiveTrend {
            origin,
            intercept,
            slope,
            weekly,
            margin,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedAdditiveTrend {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<Prediction>> {
        dates
            .iter()
            .map(|&date| {
                let seasonal = self.weekly.map(|w| w[weekday_index(date)]).unwrap_or(0.0);
                let yhat = self.intercept + self.slope * days_since(self.origin, date) + seasonal;
                if !yhat.is_finite() {
                    return Err(DashboardError::ForecastFailure(format!(
                        "non-finite prediction for {date}"
                    )));
                }
                Ok(Prediction {
                    date,
                    yhat,
                    lower: yhat - self.margin,
                    upper: yhat + self.margin,
                })
            })
            .collect()
    }
}

fn distinct_dates(series: &[SeriesPoint]) -> Vec<NaiveDate> {
    series
        .iter()
        .map(|p| p.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `(date, sales)` pairs sorted by date.
pub fn to_series(filtered: &FilteredTable) -> Result<Vec<SeriesPoint>> {
    if filtered.is_empty() {
        return Err(DashboardError::EmptyInput);
    }

    let mut series: Vec<SeriesPoint> = filtered
        .rows()
        .iter()
        .map(|r| SeriesPoint {
            date: r.date,
            value: r.sales,
        })
        .collect();
    series.sort_by_key(|p| p.date);

    let distinct = distinct_dates(&series).len();
    if distinct < MIN_DISTINCT_DATES {
        return Err(DashboardError::InsufficientData {
            required: MIN_DISTINCT_DATES,
            actual: distinct,
        });
    }

    Ok(series)
}

/// Last observed date; the forecast starts after it.
pub fn cutoff_date(series: &[SeriesPoint]) -> Option<NaiveDate> {
    series.iter().map(|p| p.date).max()
}

/// Every calendar day from the first observation to `horizon` days past the last.
pub fn forecast_dates(series: &[SeriesPoint], horizon: u32) -> Result<Vec<NaiveDate>> {
    let start = series
        .iter()
        .map(|p| p.date)
        .min()
        .ok_or(DashboardError::EmptyInput)?;
    let end = cutoff_date(series)
        .and_then(|d| d.checked_add_days(Days::new(u64::from(horizon))))
        .ok_or_else(|| DashboardError::ForecastFailure("date range overflow".to_string()))?;

    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}

/// Joins observed values onto the predictions. Several observations on the
/// same date are summed. Every observed date must have a prediction.
pub fn merge(series: &[SeriesPoint], predicted: &[Prediction]) -> Result<ForecastSeries> {
    let cutoff = cutoff_date(series).ok_or(DashboardError::EmptyInput)?;

    let mut actuals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for p in series {
        *actuals.entry(p.date).or_insert(0.0) += p.value;
    }

    let mut by_date: BTreeMap<NaiveDate, &Prediction> = BTreeMap::new();
    for p in predicted {
        by_date.insert(p.date, p);
    }

    if let Some(missing) = actuals.keys().find(|d| !by_date.contains_key(d)) {
        return Err(DashboardError::ForecastFailure(format!(
            "no prediction for observed date {missing}"
        )));
    }

    let points = by_date
        .into_values()
        .map(|p| ForecastPoint {
            date: p.date,
            actual: actuals.get(&p.date).copied(),
            predicted: p.yhat,
            lower: p.lower,
            upper: p.upper,
        })
        .collect();

    Ok(ForecastSeries { points, cutoff })
}

pub fn forecast<M: ForecastModel>(
    model: &M,
    series: &[SeriesPoint],
    horizon: u32,
) -> Result<ForecastSeries> {
    let dates = forecast_dates(series, horizon)?;
    let started = Instant::now();

    let trained = model.fit(series)?;
    let predicted = trained.predict(&dates)?;
    if predicted.len() != dates.len() {
        return Err(DashboardError::ForecastFailure(format!(
            "model returned {} predictions for {} dates",
            predicted.len(),
            dates.len()
        )));
    }

    info!(
        model = model.name(),
        history = series.len(),
        horizon,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "forecast computed"
    );
    merge(series, &predicted)
}

impl ForecastSeries {
    /// Rows strictly after the cutoff, i.e. the forecast-only table.
    pub fn future_rows(&self) -> &[ForecastPoint] {
        let start = self.points.partition_point(|p| p.date <= self.cutoff);
        &self.points[start..]
    }

    pub fn max_actual(&self) -> Option<f64> {
        self.points
            .iter()
            .filter_map(|p| p.actual)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }
}
