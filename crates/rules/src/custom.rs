use famex_core::Transaction;
use serde::Deserialize;

use crate::condition::{ConditionSet, RawConditions};

/// Recategorization rule; the first matching rule in file order wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomRule {
    pub name: String,
    pub conditions: ConditionSet,
    pub category: String,
}

impl CustomRule {
    pub fn new(name: &str, conditions: ConditionSet, category: &str) -> Self {
        Self {
            name: name.to_string(),
            conditions,
            category: category.to_string(),
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.conditions.matches(tx)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawAction {
    category: Option<String>,
}

/// One `[[custom_rules]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawCustomRule {
    name: Option<String>,
    #[serde(default)]
    conditions: RawConditions,
    action: Option<RawAction>,
}

impl RawCustomRule {
    pub(crate) fn validate(self, index: usize) -> Result<CustomRule, String> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| format!("custom rule #{} is missing a name", index + 1))?;
        let category = self
            .action
            .and_then(|a| a.category)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| format!("custom rule '{name}' is missing action.category"))?;
        let conditions = self
            .conditions
            .validate()
            .map_err(|e| format!("custom rule '{name}': {e}"))?;

        Ok(CustomRule {
            name,
            conditions,
            category,
        })
    }
}

pub fn find_matching_rule<'a>(rules: &'a [CustomRule], tx: &Transaction) -> Option<&'a CustomRule> {
    rules.iter().find(|r| r.matches(tx))
}

/// Overwrites `category` from the first matching rule. Returns the
/// transactions and how many were recategorized.
pub(crate) fn recategorize(
    mut transactions: Vec<Transaction>,
    rules: &[CustomRule],
) -> (Vec<Transaction>, usize) {
    let mut hits = vec![0usize; rules.len()];

    for tx in transactions.iter_mut() {
        if let Some(idx) = rules.iter().position(|r| r.matches(tx)) {
            tx.category = Some(rules[idx].category.clone());
            hits[idx] += 1;
        }
    }

    for (rule, count) in rules.iter().zip(&hits) {
        if *count > 0 {
            tracing::info!("Applied rule '{}' to {} transactions", rule.name, count);
        }
    }

    let total = hits.iter().sum();
    (transactions, total)
}

pub fn apply_custom_rules(transactions: Vec<Transaction>, rules: &[CustomRule]) -> Vec<Transaction> {
    recategorize(transactions, rules).0
}
