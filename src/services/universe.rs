//! Loads and saves the ticker universe CSV that bounds batch-sweep coverage.
//!
//! Transliterated from `original_source/src/services/universe.py`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub ticker: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub sub_industry: String,
}

pub fn universe_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("sp500_universe.csv")
}

/// Loads ticker symbols from the universe CSV. Returns an empty list if the
/// file is missing rather than erroring, so a fresh checkout can still boot.
pub fn load_universe(data_dir: &str) -> Vec<String> {
    let path = universe_path(data_dir);
    if !path.exists() {
        warn!(path = %path.display(), "universe file not found");
        return Vec::new();
    }

    let mut reader = match csv::Reader::from_path(&path) {
        Ok(r) => r,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open universe file");
            return Vec::new();
        }
    };

    let tickers: Vec<String> = reader
        .deserialize::<UniverseEntry>()
        .filter_map(|row| row.ok())
        .map(|row| row.ticker.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();

    info!(count = tickers.len(), "loaded universe");
    tickers
}

/// Writes universe rows to CSV, returning the number of rows written.
pub fn save_universe(data_dir: &str, rows: &[UniverseEntry]) -> std::io::Result<usize> {
    let path = universe_path(data_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(count = rows.len(), path = %path.display(), "saved universe");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_universe_through_csv() {
        let dir = std::env::temp_dir().join(format!("insider-sentinel-universe-test-{}", std::process::id()));
        let rows = vec![
            UniverseEntry { ticker: "acme".into(), company_name: "Acme Corp".into(), sector: "Industrials".into(), sub_industry: "Widgets".into() },
            UniverseEntry { ticker: "beta".into(), company_name: "Beta Inc".into(), sector: "Tech".into(), sub_industry: "Software".into() },
        ];

        save_universe(dir.to_str().unwrap(), &rows).unwrap();
        let loaded = load_universe(dir.to_str().unwrap());

        assert_eq!(loaded, vec!["ACME", "BETA"]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_file_returns_empty() {
        let loaded = load_universe("/nonexistent/path/for/insider-sentinel-tests");
        assert!(loaded.is_empty());
    }
}
