use famex_core::Transaction;
use serde::Deserialize;

use crate::condition::{ConditionSet, RawConditions};

pub const DEFAULT_REASON: &str = "No reason provided";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    pub conditions: ConditionSet,
    pub reason: String,
}

impl ExclusionRule {
    pub fn new(conditions: ConditionSet, reason: &str) -> Self {
        Self {
            conditions,
            reason: reason.to_string(),
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.conditions.matches(tx)
    }
}

/// One `[[exclusions]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawExclusion {
    source: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    category: Option<String>,
    description_contains: Option<String>,
    reason: Option<String>,
}

impl RawExclusion {
    pub(crate) fn validate(self, index: usize) -> Result<ExclusionRule, String> {
        let reason = self.reason.unwrap_or_else(|| DEFAULT_REASON.to_string());
        let conditions = RawConditions {
            source: self.source,
            kind: self.kind,
            category: self.category,
            description_contains: self.description_contains,
            ..RawConditions::default()
        }
        .validate()
        .map_err(|e| format!("exclusion #{} ({reason}): {e}", index + 1))?;

        // A rule with no conditions would drop every transaction.
        if conditions.is_empty() {
            return Err(format!("exclusion #{} ({reason}) has no conditions", index + 1));
        }

        Ok(ExclusionRule { conditions, reason })
    }
}

/// Drops every transaction matched by at least one rule. Returns the
/// survivors, in input order, and the number dropped.
pub(crate) fn exclude(
    transactions: Vec<Transaction>,
    rules: &[ExclusionRule],
) -> (Vec<Transaction>, usize) {
    let mut hits = vec![0usize; rules.len()];
    let before = transactions.len();

    let kept: Vec<Transaction> = transactions
        .into_iter()
        .filter(|tx| match rules.iter().position(|r| r.matches(tx)) {
            Some(idx) => {
                hits[idx] += 1;
                false
            }
            None => true,
        })
        .collect();

    for (rule, count) in rules.iter().zip(&hits) {
        if *count > 0 {
            tracing::info!("Excluded {} transactions: {}", count, rule.reason);
        }
    }

    let excluded = before - kept.len();
    (kept, excluded)
}

/// Removes every transaction that matches any exclusion rule.
pub fn apply_exclusions(transactions: Vec<Transaction>, rules: &[ExclusionRule]) -> Vec<Transaction> {
    exclude(transactions, rules).0
}
