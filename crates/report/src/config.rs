use famex_core::{Money, OwnerTable, Source};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::ReportError;

pub const REPORT_CONFIG_FILE: &str = "report_config.toml";

/// Name of the aggregate group; it never becomes a transaction's own group.
pub const ALL_GROUP: &str = "all";
pub const UNKNOWN_GROUP: &str = "unknown";

pub const DEFAULT_FIXED_CATEGORIES: &[&str] = &["Home & Garden", "Debt Payments", "Childcare", "Savings"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountGroup {
    pub name: String,
    pub sources: Vec<Source>,
}

impl AccountGroup {
    pub fn new(name: &str, sources: &[Source]) -> Self {
        Self {
            name: name.to_string(),
            sources: sources.to_vec(),
        }
    }

    pub fn contains(&self, source: Source) -> bool {
        self.sources.contains(&source)
    }

    pub fn is_all(&self) -> bool {
        self.name == ALL_GROUP
    }
}

fn default_account_groups() -> Vec<AccountGroup> {
    vec![
        AccountGroup::new("shared", &[Source::ChaseChecking, Source::ChaseCreditCard]),
        AccountGroup::new("joe", &[Source::AppleCardJoe]),
        AccountGroup::new("nikita", &[Source::AppleCardNikita]),
        AccountGroup::new(ALL_GROUP, &Source::ALL),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    pub top_n_transactions: usize,
    pub top_n_categories: usize,
    pub top_n_merchants: usize,
    /// Merchant reports ignore expenses smaller than this (absolute value).
    pub min_transaction_amount: Money,
    /// Structural categories left out of merchant reports.
    pub fixed_categories: Vec<String>,
    pub account_groups: Vec<AccountGroup>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            top_n_transactions: 20,
            top_n_categories: 10,
            top_n_merchants: 15,
            min_transaction_amount: Money::from_cents(1_000),
            fixed_categories: DEFAULT_FIXED_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            account_groups: default_account_groups(),
        }
    }
}

impl ReportSettings {
    /// Groups that get their own per-group reports.
    pub fn reporting_groups(&self) -> impl Iterator<Item = &AccountGroup> {
        self.account_groups.iter().filter(|g| !g.is_all())
    }

    /// First non-aggregate group listing `source`.
    pub fn account_group_for(&self, source: Source) -> &str {
        self.reporting_groups()
            .find(|g| g.contains(source))
            .map(|g| g.name.as_str())
            .unwrap_or(UNKNOWN_GROUP)
    }

    pub fn is_fixed_category(&self, category: &str) -> bool {
        self.fixed_categories.iter().any(|c| c == category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputFiles {
    pub processed_transactions: String,
    pub category_summary: String,
    pub merchant_summary: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            processed_transactions: "processed_transactions.csv".to_string(),
            category_summary: "category_summary.csv".to_string(),
            merchant_summary: "merchant_summary.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub save_intermediate: bool,
    pub files: OutputFiles,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            save_intermediate: true,
            files: OutputFiles::default(),
        }
    }
}

/// Contents of `report_config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub report_settings: ReportSettings,
    pub account_owners: OwnerTable,
    pub output_settings: OutputSettings,
}

impl ReportConfig {
    /// Reads `report_config.toml` from `dir`; a missing file means defaults.
    pub fn load(dir: &Path) -> Result<Self, ReportError> {
        let path = dir.join(REPORT_CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ReportError::Io { path, source }),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ReportError> {
        let mut config: ReportConfig = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        // Owners not listed keep their default.
        config.account_owners = OwnerTable::default().merged(config.account_owners);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ReportError> {
        let mut seen = HashSet::new();
        for group in &self.report_settings.account_groups {
            if group.name.trim().is_empty() {
                return Err(invalid("account group with empty name"));
            }
            if group.name == UNKNOWN_GROUP {
                return Err(invalid(format!("account group name '{UNKNOWN_GROUP}' is reserved")));
            }
            if !seen.insert(group.name.as_str()) {
                return Err(invalid(format!("duplicate account group '{}'", group.name)));
            }
        }
        if self.report_settings.min_transaction_amount.is_negative() {
            return Err(invalid("min_transaction_amount must not be negative"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ReportError {
    ReportError::InvalidConfig {
        file: REPORT_CONFIG_FILE.to_string(),
        reason: reason.into(),
    }
}
