//! JSON file results adapter.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::domain::backtest::BacktestResults;
use crate::domain::error::TurtleError;
use crate::ports::results_port::ResultsPort;

#[derive(Debug, Default)]
pub struct JsonResultsAdapter;

impl JsonResultsAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ResultsPort for JsonResultsAdapter {
    fn save(&self, results: &BacktestResults, path: &str) -> Result<(), TurtleError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, results)?;
        writer.flush()?;
        Ok(())
    }

    fn load(&self, path: &str) -> Result<BacktestResults, TurtleError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_missing_file_is_io_error() {
        let adapter = JsonResultsAdapter::new();
        assert!(matches!(
            adapter.load("/nonexistent/results.json"),
            Err(TurtleError::Io(_))
        ));
    }

    #[test]
    fn load_garbage_is_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let adapter = JsonResultsAdapter::new();
        assert!(matches!(
            adapter.load(path.to_str().unwrap()),
            Err(TurtleError::Json(_))
        ));
    }
}
