use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::account::{AccountOwner, Source};
use super::money::Money;

/// A statement row normalized to the common schema.
///
/// Only `category` and `merchant` are rewritten once a transaction exists;
/// everything else is fixed by the loader that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    /// Source-native transaction type (`Type` column), e.g. `ACH_CREDIT`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub merchant: String,
    pub source: Source,
    pub account_owner: AccountOwner,
    pub source_file: Option<String>,
}

impl Transaction {
    /// A transaction whose merchant starts out as its description.
    pub fn new(
        date: NaiveDate,
        description: &str,
        amount: Money,
        source: Source,
        account_owner: AccountOwner,
    ) -> Self {
        Transaction {
            date,
            description: description.to_string(),
            amount,
            kind: None,
            category: None,
            merchant: description.to_string(),
            source,
            account_owner,
            source_file: None,
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_merchant(mut self, merchant: &str) -> Self {
        self.merchant = merchant.to_string();
        self
    }

    pub fn with_source_file(mut self, file: &str) -> Self {
        self.source_file = Some(file.to_string());
        self
    }

    pub fn is_expense(&self) -> bool {
        self.amount.is_negative()
    }

    pub fn is_income(&self) -> bool {
        self.amount.is_positive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn merchant_defaults_to_description() {
        let tx = Transaction::new(
            date(2025, 6, 30),
            "AMAZON PURCHASE",
            Money::from_cents(-5000),
            Source::ChaseCreditCard,
            AccountOwner::new("shared"),
        );
        assert_eq!(tx.merchant, "AMAZON PURCHASE");
        assert!(tx.kind.is_none());
        assert!(tx.category.is_none());
    }

    #[test]
    fn builders_fill_optional_fields() {
        let tx = Transaction::new(
            date(2025, 6, 30),
            "UBER EATS ORDER #123",
            Money::from_cents(-2150),
            Source::AppleCardJoe,
            AccountOwner::new("joe"),
        )
        .with_kind("Purchase")
        .with_category("Restaurants")
        .with_merchant("Uber Eats")
        .with_source_file("june.csv");

        assert_eq!(tx.kind.as_deref(), Some("Purchase"));
        assert_eq!(tx.category.as_deref(), Some("Restaurants"));
        assert_eq!(tx.merchant, "Uber Eats");
        assert_eq!(tx.source_file.as_deref(), Some("june.csv"));
    }

    #[test]
    fn expense_and_income_by_sign() {
        let owner = AccountOwner::new("shared");
        let out = Transaction::new(date(2025, 1, 1), "ATM", Money::from_cents(-100), Source::ChaseChecking, owner.clone());
        let inc = Transaction::new(date(2025, 1, 1), "PAYROLL", Money::from_cents(100), Source::ChaseChecking, owner.clone());
        let zero = Transaction::new(date(2025, 1, 1), "ADJ", Money::zero(), Source::ChaseChecking, owner);
        assert!(out.is_expense() && !out.is_income());
        assert!(inc.is_income() && !inc.is_expense());
        assert!(!zero.is_income() && !zero.is_expense());
    }
}
