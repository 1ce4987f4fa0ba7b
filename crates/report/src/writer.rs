use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::ReportError;

pub const REPORTS_DIR: &str = "reports";

/// Writes serializable rows as CSV files into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    /// Creates `dir` (and parents) if needed.
    pub fn new(dir: PathBuf) -> Result<Self, ReportError> {
        std::fs::create_dir_all(&dir).map_err(|source| ReportError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Writer for `<output_dir>/reports/`.
    pub fn reports(output_dir: &Path) -> Result<Self, ReportError> {
        Self::new(output_dir.join(REPORTS_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write<T: Serialize>(&self, file_name: &str, rows: &[T]) -> Result<PathBuf, ReportError> {
        let path = self.dir.join(file_name);
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush().map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(path)
    }
}
