use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::category::{CategoryMap, RawCategoryMapping};
use crate::custom::{CustomRule, RawCustomRule};
use crate::exclusion::{ExclusionRule, RawExclusion};
use crate::merchant::{MerchantGroup, RawMerchantGroup};

pub const EXCLUSIONS_FILE: &str = "exclusions.toml";
pub const RULES_FILE: &str = "rules.toml";
pub const CATEGORY_MAPPING_FILE: &str = "category_mapping.toml";

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("invalid rule configuration in {file}: {reason}")]
    InvalidConfig { file: String, reason: String },
    #[error("failed to read {file}")]
    Io {
        file: String,
        #[source]
        error: std::io::Error,
    },
}

impl RulesError {
    fn invalid(file: &str, reason: impl Into<String>) -> Self {
        RulesError::InvalidConfig {
            file: file.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExclusionsFile {
    #[serde(default)]
    exclusions: Vec<RawExclusion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesFile {
    #[serde(default)]
    custom_rules: Vec<RawCustomRule>,
    #[serde(default)]
    merchant_groups: Vec<RawMerchantGroup>,
}

/// Every rule a run needs, validated and immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub exclusions: Vec<ExclusionRule>,
    pub custom_rules: Vec<CustomRule>,
    pub category_map: CategoryMap,
    pub merchant_groups: Vec<MerchantGroup>,
}

impl RuleSet {
    /// Loads the three rule files from `dir`. A missing file contributes an
    /// empty rule set.
    pub fn from_dir(dir: &Path) -> Result<Self, RulesError> {
        let exclusions = match read_optional(&dir.join(EXCLUSIONS_FILE))? {
            Some(content) => parse_exclusions(&content)?,
            None => Vec::new(),
        };
        let (custom_rules, merchant_groups) = match read_optional(&dir.join(RULES_FILE))? {
            Some(content) => parse_rules(&content)?,
            None => (Vec::new(), Vec::new()),
        };
        let category_map = match read_optional(&dir.join(CATEGORY_MAPPING_FILE))? {
            Some(content) => parse_category_mapping(&content)?,
            None => CategoryMap::default(),
        };

        let rules = RuleSet {
            exclusions,
            custom_rules,
            category_map,
            merchant_groups,
        };
        tracing::info!(
            "Loaded {} exclusions, {} custom rules, {} category mappings, {} merchant groups",
            rules.exclusions.len(),
            rules.custom_rules.len(),
            rules.category_map.len(),
            rules.merchant_groups.len()
        );
        Ok(rules)
    }

    /// Builds a rule set from in-memory file contents.
    pub fn from_toml(exclusions: &str, rules: &str, category_mapping: &str) -> Result<Self, RulesError> {
        let (custom_rules, merchant_groups) = parse_rules(rules)?;
        Ok(RuleSet {
            exclusions: parse_exclusions(exclusions)?,
            custom_rules,
            category_map: parse_category_mapping(category_mapping)?,
            merchant_groups,
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, RulesError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Config file not found: {}", path.display());
            Ok(None)
        }
        Err(error) => Err(RulesError::Io {
            file: display_name(path),
            error,
        }),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn parse_exclusions(content: &str) -> Result<Vec<ExclusionRule>, RulesError> {
    let file: ExclusionsFile =
        toml::from_str(content).map_err(|e| RulesError::invalid(EXCLUSIONS_FILE, e.to_string()))?;
    file.exclusions
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.validate(i))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|reason| RulesError::invalid(EXCLUSIONS_FILE, reason))
}

pub fn parse_rules(content: &str) -> Result<(Vec<CustomRule>, Vec<MerchantGroup>), RulesError> {
    let file: RulesFile =
        toml::from_str(content).map_err(|e| RulesError::invalid(RULES_FILE, e.to_string()))?;
    let custom_rules = file
        .custom_rules
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.validate(i))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|reason| RulesError::invalid(RULES_FILE, reason))?;
    let merchant_groups = file
        .merchant_groups
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.validate(i))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|reason| RulesError::invalid(RULES_FILE, reason))?;
    Ok((custom_rules, merchant_groups))
}

pub fn parse_category_mapping(content: &str) -> Result<CategoryMap, RulesError> {
    let raw: RawCategoryMapping = toml::from_str(content)
        .map_err(|e| RulesError::invalid(CATEGORY_MAPPING_FILE, e.to_string()))?;
    raw.validate()
        .map_err(|reason| RulesError::invalid(CATEGORY_MAPPING_FILE, reason))
}
