use famex_core::Transaction;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::category::map_categories;
use crate::config::{RuleSet, RulesError};
use crate::custom::recategorize;
use crate::exclusion::exclude;
use crate::merchant::group_merchants;

/// Pipeline stages, in the only order they ever run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Exclude,
    Recategorize,
    MapCategories,
    GroupMerchants,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [
        Stage::Exclude,
        Stage::Recategorize,
        Stage::MapCategories,
        Stage::GroupMerchants,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Exclude => "exclusions",
            Stage::Recategorize => "custom rules",
            Stage::MapCategories => "category mapping",
            Stage::GroupMerchants => "merchant grouping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub input: usize,
    pub excluded: usize,
    pub recategorized: usize,
    pub defaulted: usize,
    pub regrouped: usize,
    pub output: usize,
}

/// Applies a loaded [`RuleSet`] to transactions.
#[derive(Debug, Clone, Default)]
pub struct RulesEngine {
    rules: RuleSet,
}

impl RulesEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn from_dir(dir: &Path) -> Result<Self, RulesError> {
        RuleSet::from_dir(dir).map(Self::new)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn apply_exclusions(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        exclude(transactions, &self.rules.exclusions).0
    }

    pub fn apply_custom_rules(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        recategorize(transactions, &self.rules.custom_rules).0
    }

    pub fn apply_category_mapping(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        map_categories(transactions, &self.rules.category_map).0
    }

    pub fn apply_merchant_grouping(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        group_merchants(transactions, &self.rules.merchant_groups).0
    }

    /// Runs one stage, returning the transactions and how many it affected.
    pub fn apply_stage(&self, stage: Stage, transactions: Vec<Transaction>) -> (Vec<Transaction>, usize) {
        match stage {
            Stage::Exclude => exclude(transactions, &self.rules.exclusions),
            Stage::Recategorize => recategorize(transactions, &self.rules.custom_rules),
            Stage::MapCategories => map_categories(transactions, &self.rules.category_map),
            Stage::GroupMerchants => group_merchants(transactions, &self.rules.merchant_groups),
        }
    }

    pub fn run(&self, transactions: Vec<Transaction>) -> (Vec<Transaction>, PipelineStats) {
        let mut stats = PipelineStats {
            input: transactions.len(),
            ..PipelineStats::default()
        };

        let mut current = transactions;
        for stage in Stage::ORDER {
            let (next, affected) = self.apply_stage(stage, current);
            tracing::debug!("Stage {}: {} affected, {} remaining", stage, affected, next.len());
            match stage {
                Stage::Exclude => stats.excluded = affected,
                Stage::Recategorize => stats.recategorized = affected,
                Stage::MapCategories => stats.defaulted = affected,
                Stage::GroupMerchants => stats.regrouped = affected,
            }
            current = next;
        }

        stats.output = current.len();
        tracing::info!(
            "Rules applied: {} in, {} excluded, {} out",
            stats.input,
            stats.excluded,
            stats.output
        );
        (current, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use famex_core::{AccountOwner, Money, Source};

    const EXCLUSIONS: &str = include_str!("../../../config/exclusions.toml");
    const RULES: &str = include_str!("../../../config/rules.toml");
    const CATEGORY_MAPPING: &str = include_str!("../../../config/category_mapping.toml");

    fn engine() -> RulesEngine {
        RulesEngine::new(RuleSet::from_toml(EXCLUSIONS, RULES, CATEGORY_MAPPING).unwrap())
    }

    fn make_tx(source: Source, kind: &str, desc: &str, cents: i64) -> Transaction {
        let owner = match source {
            Source::AppleCardJoe => "joe",
            Source::AppleCardNikita => "nikita",
            _ => "shared",
        };
        Transaction::new(
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            desc,
            Money::from_cents(cents),
            source,
            AccountOwner::new(owner),
        )
        .with_kind(kind)
    }

    #[test]
    fn shipped_config_parses() {
        let engine = engine();
        assert!(!engine.rules().exclusions.is_empty());
        assert!(!engine.rules().custom_rules.is_empty());
        assert!(!engine.rules().merchant_groups.is_empty());
        assert!(!engine.rules().category_map.is_empty());
    }

    #[test]
    fn payroll_ends_as_income() {
        let tx = make_tx(Source::ChaseChecking, "ACH_CREDIT", "CLOCKWISE PAYROLL", 300_000);
        let engine = engine();

        let after_rules = engine.apply_custom_rules(vec![tx.clone()]);
        assert_eq!(after_rules[0].category.as_deref(), Some("Salary Income"));

        let (out, _) = engine.run(vec![tx]);
        assert_eq!(out[0].category.as_deref(), Some("Income"));
    }

    #[test]
    fn apple_card_payment_is_excluded() {
        let (out, stats) = engine().run(vec![make_tx(
            Source::AppleCardJoe,
            "Payment",
            "ACH DEPOSIT INTERNET TRANSFER",
            -50_000,
        )]);
        assert!(out.is_empty());
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.output, 0);
    }

    #[test]
    fn large_atm_withdrawal_is_childcare() {
        let (out, _) = engine().run(vec![make_tx(Source::ChaseChecking, "ATM", "ATM WITHDRAWAL", -75_000)]);
        assert_eq!(out[0].category.as_deref(), Some("Childcare"));
    }

    #[test]
    fn uber_eats_groups_under_uber() {
        let tx = make_tx(Source::AppleCardNikita, "Purchase", "UBER EATS ORDER #123", -3_200).with_merchant("Uber Eats");
        let (out, stats) = engine().run(vec![tx]);
        assert_eq!(out[0].merchant, "Uber");
        assert_eq!(stats.regrouped, 1);
    }

    #[test]
    fn stats_add_up() {
        let txs = vec![
            make_tx(Source::AppleCardJoe, "Payment", "ACH DEPOSIT", -50_000),
            make_tx(Source::ChaseChecking, "ACH_CREDIT", "CLOCKWISE PAYROLL", 300_000),
            make_tx(Source::ChaseCreditCard, "Sale", "AMAZON.COM PURCHASE", -4_999).with_category("Shopping"),
            make_tx(Source::ChaseCreditCard, "Sale", "MYSTERY SHOP", -1_000).with_category("Not A Category"),
        ];
        let (out, stats) = engine().run(txs);
        assert_eq!(stats.input, 4);
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.recategorized, 1);
        assert_eq!(stats.defaulted, 1);
        assert_eq!(stats.output, out.len());
        assert_eq!(out[2].category.as_deref(), Some("Uncategorized"));
        assert_eq!(out[1].merchant, "Amazon");
    }

    #[test]
    fn run_equals_stages_in_order() {
        let engine = engine();
        let txs = vec![
            make_tx(Source::ChaseChecking, "ATM", "ATM WITHDRAWAL", -80_000),
            make_tx(Source::ChaseCreditCard, "Sale", "UBER TRIP", -1_800).with_category("Travel"),
        ];
        let mut staged = txs.clone();
        for stage in Stage::ORDER {
            staged = engine.apply_stage(stage, staged).0;
        }
        let manual = engine.apply_merchant_grouping(
            engine.apply_category_mapping(engine.apply_custom_rules(engine.apply_exclusions(txs.clone()))),
        );
        assert_eq!(engine.run(txs).0, staged);
        assert_eq!(manual, staged);
    }

    #[test]
    fn empty_input_is_fine() {
        let (out, stats) = engine().run(Vec::new());
        assert!(out.is_empty());
        assert_eq!(stats, PipelineStats::default());
    }

    #[test]
    fn default_engine_only_maps_to_default() {
        let tx = make_tx(Source::ChaseCreditCard, "Sale", "SOMETHING", -100).with_category("Shopping");
        let (out, stats) = RulesEngine::default().run(vec![tx]);
        assert_eq!(out[0].category.as_deref(), Some("Uncategorized"));
        assert_eq!(stats.defaulted, 1);
    }
}
