use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "dashboard.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    /// Days forecast past the last observation.
    pub horizon_days: u32,
    pub top_n: usize,
    pub window_days: u32,
    /// Coverage of the forecast uncertainty band, strictly between 0 and 1.
    pub interval_width: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            data_path: PathBuf::from("enhanced_sample_sales.csv"),
            horizon_days: 30,
            top_n: 5,
            window_days: 7,
            interval_width: 0.8,
        }
    }
}

impl DashboardConfig {
    /// Reads the config file if there is one. Any problem falls back to defaults.
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(_) => {
                info!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed config");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_gives_defaults() {
        let config = DashboardConfig::load(Path::new("no_such_dashboard.json"));
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.horizon_days, 30);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.window_days, 7);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"data_path": "sales/q1.csv", "horizon_days": 14}}"#).unwrap();

        let config = DashboardConfig::load(file.path());
        assert_eq!(config.data_path, PathBuf::from("sales/q1.csv"));
        assert_eq!(config.horizon_days, 14);
        assert_eq!(config.top_n, 5);
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert_eq!(DashboardConfig::load(file.path()), DashboardConfig::default());
    }
}
