pub mod config;
pub mod processor;
pub mod summary;
pub mod writer;

pub use config::{AccountGroup, OutputSettings, ReportConfig, ReportSettings};
pub use processor::{filter_period, Flow, ProcessedTransaction, Processor};
pub use summary::{Reports, SummaryStatistics};
pub use writer::ReportWriter;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid report configuration in {file}: {reason}")]
    InvalidConfig { file: String, reason: String },
}
