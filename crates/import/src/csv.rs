use chrono::NaiveDate;
use famex_core::{AccountError, Money, OwnerTable, Source, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Header names of the columns a source export provides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvColumnMapping {
    pub date_column: String,
    pub description_column: String,
    pub amount_column: String,
    pub type_column: Option<String>,
    pub category_column: Option<String>,
    /// Falls back to the description when absent or blank.
    pub merchant_column: Option<String>,
    pub date_format: String,
}

impl Default for CsvColumnMapping {
    fn default() -> Self {
        Self {
            date_column: "Transaction Date".to_string(),
            description_column: "Description".to_string(),
            amount_column: "Amount".to_string(),
            type_column: Some("Type".to_string()),
            category_column: None,
            merchant_column: None,
            date_format: "%m/%d/%Y".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvImportProfile {
    pub source: Source,
    /// Folder under the data directory, relative.
    pub folder: String,
    pub mapping: CsvColumnMapping,
    pub delimiter: String,
}

impl CsvImportProfile {
    pub fn chase_checking() -> Self {
        Self {
            source: Source::ChaseChecking,
            folder: Source::ChaseChecking.folder_name().to_string(),
            mapping: CsvColumnMapping {
                date_column: "Posting Date".to_string(),
                ..CsvColumnMapping::default()
            },
            delimiter: ",".to_string(),
        }
    }

    pub fn chase_credit_card() -> Self {
        Self {
            source: Source::ChaseCreditCard,
            folder: Source::ChaseCreditCard.folder_name().to_string(),
            mapping: CsvColumnMapping {
                category_column: Some("Category".to_string()),
                ..CsvColumnMapping::default()
            },
            delimiter: ",".to_string(),
        }
    }

    /// Apple Card export for a cardholder, e.g. `apple_card("Joe")`.
    pub fn apple_card(owner: &str) -> Result<Self, AccountError> {
        Ok(Self::apple_card_for(Source::apple_card_for(owner)?))
    }

    fn apple_card_for(source: Source) -> Self {
        Self {
            source,
            folder: source.folder_name().to_string(),
            mapping: CsvColumnMapping {
                amount_column: "Amount (USD)".to_string(),
                category_column: Some("Category".to_string()),
                merchant_column: Some("Merchant".to_string()),
                ..CsvColumnMapping::default()
            },
            delimiter: ",".to_string(),
        }
    }

    pub fn for_source(source: Source) -> Self {
        match source {
            Source::ChaseChecking => Self::chase_checking(),
            Source::ChaseCreditCard => Self::chase_credit_card(),
            Source::AppleCardJoe | Source::AppleCardNikita => Self::apple_card_for(source),
        }
    }

    pub fn with_folder(mut self, folder: &str) -> Self {
        self.folder = folder.to_string();
        self
    }
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("No data rows")]
    NoDataRows,
    #[error("No CSV files found in {}", .0.display())]
    NoCsvFiles(PathBuf),
    #[error(transparent)]
    Account(#[from] AccountError),
}

/// Header positions resolved once per file.
struct ColumnIndex {
    date: usize,
    description: usize,
    amount: usize,
    kind: Option<usize>,
    category: Option<usize>,
    merchant: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, mapping: &CsvColumnMapping) -> Result<Self, CsvError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| CsvError::MissingColumn(name.to_string()))
        };
        let find_opt = |name: &Option<String>| name.as_deref().map(find).transpose();

        Ok(Self {
            date: find(&mapping.date_column)?,
            description: find(&mapping.description_column)?,
            amount: find(&mapping.amount_column)?,
            kind: find_opt(&mapping.type_column)?,
            category: find_opt(&mapping.category_column)?,
            merchant: find_opt(&mapping.merchant_column)?,
        })
    }
}

pub struct CsvImporter;

impl CsvImporter {
    pub fn parse_profile<R: Read>(
        reader: &mut csv::Reader<R>,
        profile: &CsvImportProfile,
        owners: &OwnerTable,
        file_name: Option<&str>,
    ) -> Result<Vec<Transaction>, CsvError> {
        let mapping = &profile.mapping;
        let owner = owners.owner_of(profile.source)?.clone();
        let columns = ColumnIndex::resolve(reader.headers()?, mapping)?;

        let mut transactions = Vec::new();

        for result in reader.records() {
            let record = result?;

            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let text = |col: usize| record.get(col).unwrap_or_default().trim();
            let non_blank = |col: Option<usize>| col.map(text).filter(|s| !s.is_empty());

            let date = parse_date(text(columns.date), &mapping.date_format)?;
            let description = text(columns.description);
            let amount = parse_amount(text(columns.amount))?;

            let mut tx = Transaction::new(date, description, amount, profile.source, owner.clone());
            if let Some(kind) = non_blank(columns.kind) {
                tx = tx.with_kind(kind);
            }
            if let Some(category) = non_blank(columns.category) {
                tx = tx.with_category(category);
            }
            if let Some(merchant) = non_blank(columns.merchant) {
                tx = tx.with_merchant(merchant);
            }
            if let Some(name) = file_name {
                tx = tx.with_source_file(name);
            }

            transactions.push(tx);
        }

        if transactions.is_empty() {
            return Err(CsvError::NoDataRows);
        }

        Ok(transactions)
    }
}

fn parse_date(s: &str, format: &str) -> Result<NaiveDate, CsvError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return Ok(date);
    }

    for fmt in &["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%m-%d-%Y", "%m/%d/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(CsvError::InvalidDate(s.to_string()))
}

fn parse_amount(s: &str) -> Result<Money, CsvError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s = s.replace([',', '$', ' '], "");
    let mut dec = Decimal::from_str(&s).map_err(|_| CsvError::InvalidAmount(s.to_string()))?;
    if negative {
        dec = -dec;
    }
    Ok(Money::from_decimal(dec))
}

fn reader_for<R: Read>(data: R, profile: &CsvImportProfile) -> csv::Reader<R> {
    let delimiter = profile
        .delimiter
        .as_bytes()
        .first()
        .copied()
        .unwrap_or(b',');
    // Chase exports carry a trailing comma on data rows only.
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data)
}

pub fn import_csv<R: Read>(
    data: R,
    profile: &CsvImportProfile,
    owners: &OwnerTable,
) -> Result<Vec<Transaction>, CsvError> {
    let mut reader = reader_for(data, profile);
    CsvImporter::parse_profile(&mut reader, profile, owners, None)
}

pub fn import_file(
    path: &Path,
    profile: &CsvImportProfile,
    owners: &OwnerTable,
) -> Result<Vec<Transaction>, CsvError> {
    let file = std::fs::File::open(path)?;
    let file_name = path.file_name().and_then(|n| n.to_str());
    let mut reader = reader_for(file, profile);
    CsvImporter::parse_profile(&mut reader, profile, owners, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_plain() {
        assert_eq!(parse_amount("123.45").unwrap(), Money::from_cents(12345));
    }

    #[test]
    fn parse_amount_with_dollar_sign_and_commas() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), Money::from_cents(123456));
    }

    #[test]
    fn parse_amount_negative() {
        assert_eq!(parse_amount("-50.00").unwrap(), Money::from_cents(-5000));
    }

    #[test]
    fn parse_amount_accounting_parens() {
        assert_eq!(parse_amount("(75.25)").unwrap(), Money::from_cents(-7525));
    }

    #[test]
    fn parse_amount_whole_number() {
        assert_eq!(parse_amount("3000").unwrap(), Money::from_cents(300000));
    }

    #[test]
    fn parse_amount_invalid() {
        assert!(parse_amount("not_a_number").is_err());
        assert!(parse_amount("").is_err());
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn parse_date_us_slash() {
        let d = parse_date("06/30/2025", "%m/%d/%Y").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
    }

    #[test]
    fn parse_date_iso_fallback() {
        let d = parse_date("2025-06-30", "%m/%d/%Y").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
    }

    #[test]
    fn parse_date_invalid() {
        assert!(matches!(parse_date("not-a-date", "%m/%d/%Y"), Err(CsvError::InvalidDate(_))));
    }

    // ── per-source profiles ───────────────────────────────────────────────────

    #[test]
    fn chase_checking_rows() {
        let data = "Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #\n\
                    DEBIT,06/30/2025,ATM WITHDRAWAL,-100.00,ATM,4900.00,,\n\
                    CREDIT,06/29/2025,SALARY DEPOSIT,5000.00,ACH_CREDIT,5000.00,,\n";
        let txs = import_csv(data.as_bytes(), &CsvImportProfile::chase_checking(), &OwnerTable::default())
            .unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].source, Source::ChaseChecking);
        assert_eq!(txs[0].account_owner.as_str(), "shared");
        assert_eq!(txs[0].amount, Money::from_cents(-10000));
        assert_eq!(txs[0].kind.as_deref(), Some("ATM"));
        assert_eq!(txs[0].category, None);
        assert_eq!(txs[0].merchant, "ATM WITHDRAWAL");
        assert_eq!(txs[1].date, NaiveDate::from_ymd_opt(2025, 6, 29).unwrap());
    }

    #[test]
    fn chase_credit_card_rows_carry_category() {
        let data = "Transaction Date,Post Date,Description,Category,Type,Amount\n\
                    06/30/2025,06/30/2025,AMAZON PURCHASE,Shopping,Sale,-50.00\n\
                    06/29/2025,06/30/2025,RESTAURANT,Food & Drink,Sale,-30.00\n";
        let txs = import_csv(data.as_bytes(), &CsvImportProfile::chase_credit_card(), &OwnerTable::default())
            .unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].source, Source::ChaseCreditCard);
        assert_eq!(txs[0].category.as_deref(), Some("Shopping"));
        assert_eq!(txs[1].category.as_deref(), Some("Food & Drink"));
        assert_eq!(txs[1].kind.as_deref(), Some("Sale"));
    }

    #[test]
    fn apple_card_rows_use_merchant_column() {
        let data = "Transaction Date,Clearing Date,Description,Merchant,Category,Type,Amount (USD),Purchased By\n\
                    06/30/2025,06/30/2025,UBER EATS ORDER #123,Uber Eats,Restaurants,Purchase,-21.50,Joseph Rule\n\
                    06/29/2025,06/30/2025,SQ *CORNER CAFE,,Restaurants,Purchase,-4.25,Joseph Rule\n";
        let profile = CsvImportProfile::apple_card("Joe").unwrap();
        let txs = import_csv(data.as_bytes(), &profile, &OwnerTable::default()).unwrap();
        assert_eq!(txs[0].source, Source::AppleCardJoe);
        assert_eq!(txs[0].account_owner.as_str(), "joe");
        assert_eq!(txs[0].merchant, "Uber Eats");
        assert_eq!(txs[0].description, "UBER EATS ORDER #123");
        // blank Merchant falls back to the description
        assert_eq!(txs[1].merchant, "SQ *CORNER CAFE");
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let data = "Date,Description,Amount\n06/30/2025,X,-1.00\n";
        let result = import_csv(data.as_bytes(), &CsvImportProfile::chase_checking(), &OwnerTable::default());
        assert!(matches!(result, Err(CsvError::MissingColumn(col)) if col == "Posting Date"));
    }

    #[test]
    fn header_only_file_has_no_data_rows() {
        let data = "Transaction Date,Post Date,Description,Category,Type,Amount\n";
        let result = import_csv(data.as_bytes(), &CsvImportProfile::chase_credit_card(), &OwnerTable::default());
        assert!(matches!(result, Err(CsvError::NoDataRows)));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let data = "Transaction Date,Post Date,Description,Category,Type,Amount\n\
                    ,,,,,\n\
                    06/30/2025,06/30/2025,AMAZON PURCHASE,Shopping,Sale,-50.00\n";
        let txs = import_csv(data.as_bytes(), &CsvImportProfile::chase_credit_card(), &OwnerTable::default())
            .unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[test]
    fn source_without_owner_fails() {
        let data = "Transaction Date,Post Date,Description,Category,Type,Amount\n\
                    06/30/2025,06/30/2025,AMAZON PURCHASE,Shopping,Sale,-50.00\n";
        let result = import_csv(data.as_bytes(), &CsvImportProfile::chase_credit_card(), &OwnerTable::new([]));
        assert!(matches!(result, Err(CsvError::Account(AccountError::NoOwner(Source::ChaseCreditCard)))));
    }
}
