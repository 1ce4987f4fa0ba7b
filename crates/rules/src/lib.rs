pub mod category;
pub mod condition;
pub mod config;
pub mod custom;
pub mod exclusion;
pub mod merchant;
pub mod pipeline;

pub use category::{apply_category_mapping, CategoryMap, DEFAULT_CATEGORY};
pub use condition::{Condition, ConditionSet};
pub use config::{RuleSet, RulesError};
pub use custom::{apply_custom_rules, CustomRule};
pub use exclusion::{apply_exclusions, ExclusionRule};
pub use merchant::{apply_merchant_grouping, MerchantGroup};
pub use pipeline::{PipelineStats, RulesEngine, Stage};
