use famex_core::{Money, Source, Transaction};
use rust_decimal::Decimal;
use serde::Deserialize;

/// A single test against one transaction field.
///
/// Conditions over a field the transaction does not carry (no `kind`, no
/// `category`) simply do not hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    SourceEquals(Source),
    TypeEquals(String),
    CategoryEquals(String),
    /// Case-sensitive substring of `description`.
    DescriptionContains(String),
    AmountAtLeast(Money),
    AmountAtMost(Money),
}

impl Condition {
    pub fn holds(&self, tx: &Transaction) -> bool {
        match self {
            Condition::SourceEquals(source) => tx.source == *source,
            Condition::TypeEquals(kind) => tx.kind.as_deref() == Some(kind.as_str()),
            Condition::CategoryEquals(category) => tx.category.as_deref() == Some(category.as_str()),
            Condition::DescriptionContains(needle) => tx.description.contains(needle.as_str()),
            Condition::AmountAtLeast(min) => tx.amount >= *min,
            Condition::AmountAtMost(max) => tx.amount <= *max,
        }
    }
}

/// AND-list of conditions. An empty set matches every transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet(Vec<Condition>);

impl ConditionSet {
    pub fn new(conditions: Vec<Condition>) -> Self {
        ConditionSet(conditions)
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.0.iter().all(|c| c.holds(tx))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }
}

/// Condition keys as written in the rule files. Unknown keys are rejected
/// when the file is parsed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConditions {
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub description_contains: Option<String>,
    pub amount_min: Option<Decimal>,
    pub amount_max: Option<Decimal>,
}

impl RawConditions {
    /// Validates every present key and builds the typed AND-list.
    pub fn validate(self) -> Result<ConditionSet, String> {
        let mut conditions = Vec::new();

        if let Some(source) = self.source {
            let source = source.parse::<Source>().map_err(|e| e.to_string())?;
            conditions.push(Condition::SourceEquals(source));
        }
        if let Some(kind) = self.kind {
            conditions.push(Condition::TypeEquals(kind));
        }
        if let Some(category) = self.category {
            conditions.push(Condition::CategoryEquals(category));
        }
        if let Some(needle) = self.description_contains {
            if needle.is_empty() {
                return Err("description_contains must not be empty".to_string());
            }
            conditions.push(Condition::DescriptionContains(needle));
        }
        if let Some(min) = self.amount_min {
            conditions.push(Condition::AmountAtLeast(Money::from_decimal(min)));
        }
        if let Some(max) = self.amount_max {
            conditions.push(Condition::AmountAtMost(Money::from_decimal(max)));
        }

        Ok(ConditionSet(conditions))
    }
}
