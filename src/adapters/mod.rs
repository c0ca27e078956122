//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_journal;
pub mod file_config_adapter;
pub mod json_results_adapter;
pub mod synthetic_adapter;
pub mod tracing_journal;
