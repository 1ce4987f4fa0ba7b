pub mod csv;

pub use crate::csv::{CsvColumnMapping, CsvError, CsvImportProfile};

use famex_core::{OwnerTable, Source, Transaction};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to load {source_id}: {error}")]
    Source {
        source_id: Source,
        #[source]
        error: CsvError,
    },
    #[error("No data loaded from any source under {}", .0.display())]
    NoData(PathBuf),
}

/// Every `*.csv` in `folder`, in file name order.
fn csv_files(folder: &Path) -> Result<Vec<PathBuf>, CsvError> {
    if !folder.is_dir() {
        return Err(CsvError::NoCsvFiles(folder.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    if files.is_empty() {
        return Err(CsvError::NoCsvFiles(folder.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Loads and concatenates every CSV export in the profile's folder.
pub fn load_source(
    data_dir: &Path,
    profile: &CsvImportProfile,
    owners: &OwnerTable,
) -> Result<Vec<Transaction>, CsvError> {
    let folder = data_dir.join(&profile.folder);
    let mut transactions = Vec::new();

    for file in csv_files(&folder)? {
        match crate::csv::import_file(&file, profile, owners) {
            Ok(txs) => {
                tracing::debug!("{}: {} rows", file.display(), txs.len());
                transactions.extend(txs);
            }
            Err(CsvError::NoDataRows) => {
                tracing::warn!("Skipping {}: no data rows", file.display());
            }
            Err(e) => return Err(e),
        }
    }

    Ok(transactions)
}

/// Loads every known source under `data_dir`, sorted by date.
///
/// Sources whose folder is missing or holds no CSV files are skipped with a
/// warning; any other failure aborts the load.
pub fn load_all(data_dir: &Path, owners: &OwnerTable) -> Result<Vec<Transaction>, LoadError> {
    let profiles: Vec<CsvImportProfile> =
        Source::ALL.into_iter().map(CsvImportProfile::for_source).collect();
    load_profiles(data_dir, &profiles, owners)
}

pub fn load_profiles(
    data_dir: &Path,
    profiles: &[CsvImportProfile],
    owners: &OwnerTable,
) -> Result<Vec<Transaction>, LoadError> {
    let mut all = Vec::new();
    let mut loaded_any = false;

    for profile in profiles {
        match load_source(data_dir, profile, owners) {
            Ok(txs) => {
                tracing::info!("Loaded {} records from {}", txs.len(), profile.source);
                loaded_any = true;
                all.extend(txs);
            }
            Err(CsvError::NoCsvFiles(folder)) => {
                tracing::warn!("No CSV files found in {}", folder.display());
            }
            Err(error) => {
                return Err(LoadError::Source {
                    source_id: profile.source,
                    error,
                })
            }
        }
    }

    if !loaded_any {
        return Err(LoadError::NoData(data_dir.to_path_buf()));
    }

    all.sort_by_key(|tx| tx.date);
    Ok(all)
}
