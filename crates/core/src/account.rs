use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The financial account a transaction was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    ChaseChecking,
    ChaseCreditCard,
    AppleCardJoe,
    AppleCardNikita,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::ChaseChecking,
        Source::ChaseCreditCard,
        Source::AppleCardJoe,
        Source::AppleCardNikita,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::ChaseChecking => "chase_checking",
            Source::ChaseCreditCard => "chase_credit_card",
            Source::AppleCardJoe => "apple_card_joe",
            Source::AppleCardNikita => "apple_card_nikita",
        }
    }

    /// Folder under the data directory holding this source's CSV exports.
    pub fn folder_name(self) -> &'static str {
        match self {
            Source::ChaseChecking => "chase_checking",
            Source::ChaseCreditCard => "chase_card",
            Source::AppleCardJoe => "joe_apple_card",
            Source::AppleCardNikita => "nikita_apple_card",
        }
    }

    /// Apple Card source for a cardholder name, e.g. "Joe" -> `apple_card_joe`.
    pub fn apple_card_for(owner: &str) -> Result<Source, AccountError> {
        format!("apple_card_{}", owner.to_lowercase()).parse()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|src| src.as_str() == s)
            .ok_or_else(|| AccountError::UnknownSource(s.to_string()))
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Household member (or "shared") that owns a source. Always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountOwner(String);

impl AccountOwner {
    pub fn new(name: &str) -> Self {
        AccountOwner(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AccountOwner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(AccountOwner::new(&s))
    }
}

impl fmt::Display for AccountOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("Unknown source: '{0}'")]
    UnknownSource(String),
    #[error("No owner configured for source {0}")]
    NoOwner(Source),
}

pub const DEFAULT_OWNERS: &[(Source, &str)] = &[
    (Source::ChaseChecking, "shared"),
    (Source::ChaseCreditCard, "shared"),
    (Source::AppleCardJoe, "joe"),
    (Source::AppleCardNikita, "nikita"),
];

/// Explicit `source -> account_owner` table handed to the loaders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerTable(BTreeMap<Source, AccountOwner>);

impl Default for OwnerTable {
    fn default() -> Self {
        OwnerTable(
            DEFAULT_OWNERS
                .iter()
                .map(|(src, owner)| (*src, AccountOwner::new(owner)))
                .collect(),
        )
    }
}

impl OwnerTable {
    pub fn new(entries: impl IntoIterator<Item = (Source, AccountOwner)>) -> Self {
        OwnerTable(entries.into_iter().collect())
    }

    pub fn owner_of(&self, source: Source) -> Result<&AccountOwner, AccountError> {
        self.0.get(&source).ok_or(AccountError::NoOwner(source))
    }

    /// Overlays `other` on top of this table; entries in `other` win.
    pub fn merged(mut self, other: OwnerTable) -> Self {
        self.0.extend(other.0);
        self
    }
}
