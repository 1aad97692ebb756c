use crate::error::{LoadError, Result};
use crate::model::{RawTable, SalesRecord};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "date",
    "state",
    "store_id",
    "product_id",
    "sales",
    "margin",
    "out_of_stock_pct",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Owner of the process-wide sales table.
///
/// The file is read on the first successful `load` and the parsed table is
/// shared read-only for the lifetime of the store. A failed load leaves the
/// store empty so the caller can retry.
pub struct DataStore {
    path: PathBuf,
    table: OnceLock<RawTable>,
}

impl DataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DataStore {
            path: path.into(),
            table: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }

    pub fn load(&self) -> Result<&RawTable> {
        if let Some(table) = self.table.get() {
            return Ok(table);
        }

        let table = load_file(&self.path)?;
        if table.is_empty() {
            warn!(path = %self.path.display(), "sales file has no records");
        }
        info!(
            path = %self.path.display(),
            records = table.len(),
            "sales data loaded"
        );
        Ok(self.table.get_or_init(|| table))
    }
}

pub fn load_file(path: &Path) -> std::result::Result<RawTable, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_records(file)
}

pub fn load_records<R: Read>(reader: R) -> std::result::Result<RawTable, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let mut records = Vec::new();
    for result in csv_reader.deserialize::<SalesRecord>() {
        let record = result.map_err(|e| LoadError::InvalidRecord {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            reason: e.to_string(),
        })?;
        records.push(record);
    }

    debug!(records = records.len(), "parsed sales records");
    Ok(RawTable::new(records))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
}

pub fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "date,state,store_id,product_id,sales,margin,out_of_stock_pct";

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn loads_records_in_file_order() {
        let file = write_csv(&[
            HEADER,
            "2024-01-02,CA,S1,P1,20,4.5,1.0",
            "2024-01-01,CA,S1,P1,10,2.5,0.0",
        ]);
        let table = load_file(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        let first = &table.records()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(first.state, "CA");
        assert_eq!(first.sales, 20.0);
        assert_eq!(first.margin, 4.5);
    }

    #[test]
    fn store_loads_once_and_shares_the_table() {
        let file = write_csv(&[HEADER, "2024-01-01,CA,S1,P1,10,2.5,0.0"]);
        let store = DataStore::new(file.path());
        assert!(!store.is_loaded());

        let first = store.load().unwrap() as *const RawTable;
        let second = store.load().unwrap() as *const RawTable;

        assert!(store.is_loaded());
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn failed_load_is_not_cached() {
        let store = DataStore::new("definitely_not_here.csv");
        assert!(matches!(
            store.load(),
            Err(DashboardError::DataLoad(LoadError::Io { .. }))
        ));
        assert!(!store.is_loaded());
    }

    #[test]
    fn missing_columns_are_reported() {
        let file = write_csv(&["date,state,store_id,product_id,sales", "2024-01-01,CA,S1,P1,10"]);
        match load_file(file.path()) {
            Err(LoadError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["margin".to_string(), "out_of_stock_pct".to_string()]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn extra_columns_are_ignored() {
        let file = write_csv(&[
            "region,date,state,store_id,product_id,sales,margin,out_of_stock_pct,promo",
            "west,2024-01-01,CA,S1,P1,10,2.5,0.0,yes",
        ]);
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.records()[0].product_id, "P1");
    }

    #[test]
    fn bad_date_reports_line() {
        let file = write_csv(&[
            HEADER,
            "2024-01-01,CA,S1,P1,10,2.5,0.0",
            "yesterday,CA,S1,P1,10,2.5,0.0",
        ]);
        match load_file(file.path()) {
            Err(LoadError::InvalidRecord { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("yesterday"));
            }
            other => panic!("expected InvalidRecord, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_sales_is_rejected() {
        let file = write_csv(&[HEADER, "2024-01-01,CA,S1,P1,lots,2.5,0.0"]);
        assert!(matches!(
            load_file(file.path()),
            Err(LoadError::InvalidRecord { .. })
        ));
    }

    #[rstest]
    #[case("2024-03-05")]
    #[case("2024/03/05")]
    #[case("2024-03-05 13:45:00")]
    #[case("2024-03-05T13:45:00")]
    #[case(" 2024-03-05 ")]
    fn accepts_common_date_layouts(#[case] raw: &str) {
        assert_eq!(parse_date(raw), NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(parse_date("05.03.2024x"), None);
        assert_eq!(parse_date(""), None);
    }
}
