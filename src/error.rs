use thiserror::Error;

/// Why the sales file could not be turned into a table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("data load failed: {0}")]
    DataLoad(#[from] LoadError),

    #[error("no rows match the current selection")]
    EmptyInput,

    #[error("forecast needs at least {required} distinct dates, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("forecast failed: {0}")]
    ForecastFailure(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
