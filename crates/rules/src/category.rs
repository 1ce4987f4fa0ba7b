use famex_core::Transaction;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Raw (or rule-assigned) category label to master category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    mapping: HashMap<String, String>,
    default_category: String,
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self {
            mapping: HashMap::new(),
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl CategoryMap {
    pub fn new(mapping: HashMap<String, String>, default_category: &str) -> Self {
        Self {
            mapping,
            default_category: default_category.to_string(),
        }
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// Master category for `category`; unmapped or absent labels get the
    /// default.
    pub fn lookup(&self, category: Option<&str>) -> &str {
        category
            .and_then(|c| self.mapping.get(c))
            .map(String::as_str)
            .unwrap_or(&self.default_category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.mapping.contains_key(category)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawCategoryMapping {
    #[serde(default)]
    master_categories: HashMap<String, String>,
    default_category: Option<String>,
}

impl RawCategoryMapping {
    pub(crate) fn validate(self) -> Result<CategoryMap, String> {
        let default_category = self
            .default_category
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        if default_category.trim().is_empty() {
            return Err("default_category must not be empty".to_string());
        }
        Ok(CategoryMap {
            mapping: self.master_categories,
            default_category,
        })
    }
}

/// Replaces every category with its master category. Returns the
/// transactions and how many fell through to the default.
pub(crate) fn map_categories(
    mut transactions: Vec<Transaction>,
    map: &CategoryMap,
) -> (Vec<Transaction>, usize) {
    let mut unmapped = BTreeSet::new();
    let mut defaulted = 0;

    for tx in transactions.iter_mut() {
        let current = tx.category.as_deref();
        if !current.is_some_and(|c| map.contains(c)) {
            defaulted += 1;
            unmapped.insert(current.unwrap_or("<none>").to_string());
        }
        let master = map.lookup(current).to_string();
        tx.category = Some(master);
    }

    if defaulted > 0 {
        tracing::debug!(
            "{} transactions fell back to '{}': {:?}",
            defaulted,
            map.default_category(),
            unmapped
        );
    }

    (transactions, defaulted)
}

pub fn apply_category_mapping(transactions: Vec<Transaction>, map: &CategoryMap) -> Vec<Transaction> {
    map_categories(transactions, map).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use famex_core::{AccountOwner, Money, Source};

    fn make_tx(category: Option<&str>) -> Transaction {
        let mut tx = Transaction::new(
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            "TEST",
            Money::from_cents(-100),
            Source::ChaseCreditCard,
            AccountOwner::new("shared"),
        );
        tx.category = category.map(str::to_string);
        tx
    }

    fn mapping() -> CategoryMap {
        let entries = [
            ("Salary Income", "Income"),
            ("Income", "Income"),
            ("Shopping", "Shopping"),
            ("Food & Drink", "Dining"),
        ];
        CategoryMap::new(
            entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            "Uncategorized",
        )
    }

    #[test]
    fn mapped_categories_are_replaced() {
        let out = apply_category_mapping(vec![make_tx(Some("Food & Drink")), make_tx(Some("Salary Income"))], &mapping());
        assert_eq!(out[0].category.as_deref(), Some("Dining"));
        assert_eq!(out[1].category.as_deref(), Some("Income"));
    }

    #[test]
    fn unmapped_and_absent_fall_back_to_default() {
        let (out, defaulted) = map_categories(vec![make_tx(Some("Childcare")), make_tx(None)], &mapping());
        assert_eq!(defaulted, 2);
        assert!(out.iter().all(|t| t.category.as_deref() == Some("Uncategorized")));
    }

    #[test]
    fn identity_entries_are_idempotent() {
        let once = apply_category_mapping(vec![make_tx(Some("Salary Income"))], &mapping());
        let twice = apply_category_mapping(once.clone(), &mapping());
        assert_eq!(once[0].category.as_deref(), Some("Income"));
        assert_eq!(twice, once);
    }

    #[test]
    fn default_is_stable() {
        let once = apply_category_mapping(vec![make_tx(Some("Mystery"))], &mapping());
        let twice = apply_category_mapping(once.clone(), &mapping());
        assert_eq!(once[0].category.as_deref(), Some("Uncategorized"));
        assert_eq!(twice[0].category.as_deref(), Some("Uncategorized"));
    }

    #[test]
    fn lookup_is_exact() {
        let map = mapping();
        assert_eq!(map.lookup(Some("shopping")), "Uncategorized");
        assert_eq!(map.lookup(Some("Shopping")), "Shopping");
        assert_eq!(map.lookup(None), "Uncategorized");
    }

    #[test]
    fn raw_mapping_defaults() {
        let map = RawCategoryMapping::default().validate().unwrap();
        assert!(map.is_empty());
        assert_eq!(map.default_category(), DEFAULT_CATEGORY);
    }

    #[test]
    fn raw_mapping_rejects_blank_default() {
        let raw = RawCategoryMapping {
            master_categories: HashMap::new(),
            default_category: Some(" ".into()),
        };
        assert!(raw.validate().is_err());
    }
}
