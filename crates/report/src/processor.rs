use chrono::{Datelike, NaiveDate};
use famex_core::{AccountOwner, DateRange, Money, Source, Transaction, YearMonth};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ReportConfig;
use crate::summary::{category_summary, merchant_summary};
use crate::writer::ReportWriter;
use crate::ReportError;

pub const INTERMEDIATE_DIR: &str = "intermediate";

/// Category a transaction reports under when it reached reporting without one.
const FALLBACK_CATEGORY: &str = "Uncategorized";

/// Money in or money out. Zero-amount rows count as expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Flow {
    Income,
    Expense,
}

impl Flow {
    pub fn of(amount: Money) -> Self {
        if amount.is_positive() {
            Flow::Income
        } else {
            Flow::Expense
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Income => f.write_str("Income"),
            Flow::Expense => f.write_str("Expense"),
        }
    }
}

/// A fully processed transaction with the fields reports group by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub master_category: String,
    pub merchant: String,
    pub source: Source,
    pub account_owner: AccountOwner,
    pub source_file: Option<String>,
    pub year: i32,
    pub month: u32,
    pub year_month: YearMonth,
    pub abs_amount: Money,
    #[serde(rename = "transaction_type")]
    pub flow: Flow,
    pub account_group: String,
}

impl ProcessedTransaction {
    pub fn is_expense(&self) -> bool {
        self.amount.is_negative()
    }

    pub fn is_income(&self) -> bool {
        self.amount.is_positive()
    }
}

/// Keeps only transactions dated inside `range`.
pub fn filter_period(transactions: Vec<Transaction>, range: DateRange) -> Vec<Transaction> {
    let before = transactions.len();
    let kept: Vec<Transaction> = transactions.into_iter().filter(|tx| range.contains(tx.date)).collect();
    tracing::info!("{} of {} transactions fall within {}", kept.len(), before, range);
    kept
}

/// Turns rule-processed transactions into report rows and saves the
/// intermediate files.
#[derive(Debug, Clone)]
pub struct Processor {
    config: ReportConfig,
}

impl Processor {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn derive(&self, transactions: Vec<Transaction>) -> Vec<ProcessedTransaction> {
        let settings = &self.config.report_settings;
        transactions
            .into_iter()
            .map(|tx| {
                let account_group = settings.account_group_for(tx.source).to_string();
                ProcessedTransaction {
                    year: tx.date.year(),
                    month: tx.date.month(),
                    year_month: YearMonth::of(tx.date),
                    abs_amount: tx.amount.abs(),
                    flow: Flow::of(tx.amount),
                    account_group,
                    master_category: tx.category.unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
                    date: tx.date,
                    description: tx.description,
                    amount: tx.amount,
                    kind: tx.kind,
                    merchant: tx.merchant,
                    source: tx.source,
                    account_owner: tx.account_owner,
                    source_file: tx.source_file,
                }
            })
            .collect()
    }

    /// Writes the processed rows plus category and merchant summaries under
    /// `<output_dir>/intermediate/`.
    pub fn save_intermediate(
        &self,
        processed: &[ProcessedTransaction],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, ReportError> {
        let files = &self.config.output_settings.files;
        let writer = ReportWriter::new(output_dir.join(INTERMEDIATE_DIR))?;

        let paths = vec![
            writer.write(&files.processed_transactions, processed)?,
            writer.write(&files.category_summary, &category_summary(processed))?,
            writer.write(&files.merchant_summary, &merchant_summary(processed))?,
        ];
        for path in &paths {
            tracing::info!("Saved {}", path.display());
        }
        Ok(paths)
    }

    /// Derives report fields and, when configured, saves intermediate files.
    pub fn process(
        &self,
        transactions: Vec<Transaction>,
        output_dir: &Path,
    ) -> Result<Vec<ProcessedTransaction>, ReportError> {
        let processed = self.derive(transactions);
        if self.config.output_settings.save_intermediate {
            self.save_intermediate(&processed, output_dir)?;
        }
        tracing::info!("Processing complete: {} transactions", processed.len());
        Ok(processed)
    }
}
