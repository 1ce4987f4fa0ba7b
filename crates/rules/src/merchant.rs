use famex_core::Transaction;
use serde::Deserialize;

/// Consolidates merchant spellings under one canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantGroup {
    /// Stored lowercased.
    patterns: Vec<String>,
    pub master_name: String,
}

impl MerchantGroup {
    pub fn new<I, S>(patterns: I, master_name: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns.into_iter().map(|p| p.as_ref().to_lowercase()).collect(),
            master_name: master_name.to_string(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Case-insensitive substring test against description or merchant.
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.matches_lowered(&tx.description.to_lowercase(), &tx.merchant.to_lowercase())
    }

    /// Same as [`matches`](Self::matches) with both fields already lowercased.
    fn matches_lowered(&self, description: &str, merchant: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| description.contains(p.as_str()) || merchant.contains(p.as_str()))
    }
}

/// One `[[merchant_groups]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawMerchantGroup {
    #[serde(default)]
    patterns: Vec<String>,
    master_name: Option<String>,
}

impl RawMerchantGroup {
    pub(crate) fn validate(self, index: usize) -> Result<MerchantGroup, String> {
        let master_name = self
            .master_name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| format!("merchant group #{} is missing master_name", index + 1))?;
        if self.patterns.is_empty() {
            return Err(format!("merchant group '{master_name}' has no patterns"));
        }
        if self.patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(format!("merchant group '{master_name}' has an empty pattern"));
        }
        Ok(MerchantGroup::new(self.patterns, &master_name))
    }
}

/// Sets `merchant` to the master name of the first matching group. Returns
/// the transactions and how many were regrouped.
pub(crate) fn group_merchants(
    mut transactions: Vec<Transaction>,
    groups: &[MerchantGroup],
) -> (Vec<Transaction>, usize) {
    let mut regrouped = 0;

    for tx in transactions.iter_mut() {
        let description = tx.description.to_lowercase();
        let merchant = tx.merchant.to_lowercase();
        if let Some(group) = groups.iter().find(|g| g.matches_lowered(&description, &merchant)) {
            tracing::trace!("{} -> {}", tx.merchant, group.master_name);
            tx.merchant = group.master_name.clone();
            regrouped += 1;
        }
    }

    tracing::debug!("Grouped {} merchants", regrouped);
    (transactions, regrouped)
}

pub fn apply_merchant_grouping(transactions: Vec<Transaction>, groups: &[MerchantGroup]) -> Vec<Transaction> {
    group_merchants(transactions, groups).0
}
