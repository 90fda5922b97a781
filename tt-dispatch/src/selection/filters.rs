//! Selection filters
//!
//! The caller-owned value object that shapes the primary pick of a draw, and
//! the cohesion mode that shapes the companions.

use super::tiers::Tier;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tt_common::Tune;

/// Sentinel shown first in type/key choice lists
pub const ANY: &str = "any";

/// How tightly companions must match the primary tune
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohesionMode {
    /// Same type and key; adjacent tiers only when the own tier runs dry.
    Strict,
    /// Mostly same type; widen to related keys, then adjacent tiers.
    #[default]
    Medium,
    /// Half the pool may be other types; prefer unrelated keys.
    Creative,
}

impl CohesionMode {
    /// Probability that a candidate tune must share the primary's type
    pub fn type_match_probability(self) -> f64 {
        match self {
            CohesionMode::Strict => 1.0,
            CohesionMode::Medium => 0.85,
            CohesionMode::Creative => 0.5,
        }
    }

    /// Whether the selection engine may fall back to the whole type pool,
    /// dropping the key rule
    pub fn allows_pool_fallback(self) -> bool {
        !matches!(self, CohesionMode::Strict)
    }
}

impl FromStr for CohesionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CohesionMode::Strict),
            "medium" => Ok(CohesionMode::Medium),
            "creative" => Ok(CohesionMode::Creative),
            other => Err(format!("unknown cohesion mode '{}'", other)),
        }
    }
}

impl fmt::Display for CohesionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CohesionMode::Strict => "strict",
            CohesionMode::Medium => "medium",
            CohesionMode::Creative => "creative",
        };
        f.write_str(s)
    }
}

/// Popularity filter, evaluated against the ranking of the type-filtered pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Popularity {
    #[default]
    #[serde(alias = "all")]
    Any,
    #[serde(alias = "very popular")]
    VeryPopular,
    Common,
    Rare,
    Obscure,
}

impl Popularity {
    pub fn tier(self) -> Option<Tier> {
        match self {
            Popularity::Any => None,
            Popularity::VeryPopular => Some(Tier::VeryPopular),
            Popularity::Common => Some(Tier::Common),
            Popularity::Rare => Some(Tier::Rare),
            Popularity::Obscure => Some(Tier::Obscure),
        }
    }
}

impl FromStr for Popularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(Popularity::Any),
            "very-popular" | "very popular" => Ok(Popularity::VeryPopular),
            "common" => Ok(Popularity::Common),
            "rare" => Ok(Popularity::Rare),
            "obscure" => Ok(Popularity::Obscure),
            other => Err(format!("unknown popularity '{}'", other)),
        }
    }
}

/// Filters applied to the primary pick of a draw
///
/// `tune_type` and `key` of `None` mean "any".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionFilters {
    #[serde(rename = "type", default, deserialize_with = "any_as_none")]
    pub tune_type: Option<String>,

    #[serde(default)]
    pub popularity: Popularity,

    #[serde(default, deserialize_with = "any_as_none")]
    pub key: Option<String>,

    #[serde(default)]
    pub mode: CohesionMode,

    /// Forced primary pick, consumed by the next spin
    #[serde(default, skip_deserializing)]
    pub seed: Option<Tune>,
}

impl SelectionFilters {
    pub fn with_mode(mode: CohesionMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Reset type, popularity and key to "any" and drop any seed.
    /// The cohesion mode is kept.
    pub fn clear_choices(&mut self) {
        self.tune_type = None;
        self.popularity = Popularity::Any;
        self.key = None;
        self.seed = None;
    }
}

/// Normalize a type/key choice: blank, "any" and the legacy "all" mean no filter
pub fn normalize_choice(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ANY) || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

fn any_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_choice(raw.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_deserialize_sentinels() {
        let filters: SelectionFilters = serde_json::from_str(
            r#"{"type": "all", "popularity": "very popular", "key": "any", "mode": "strict"}"#,
        )
        .unwrap();

        assert_eq!(filters.tune_type, None);
        assert_eq!(filters.key, None);
        assert_eq!(filters.popularity, Popularity::VeryPopular);
        assert_eq!(filters.mode, CohesionMode::Strict);
    }

    #[test]
    fn test_filters_defaults() {
        let filters: SelectionFilters = serde_json::from_str(r#"{"type": "reel"}"#).unwrap();
        assert_eq!(filters.tune_type.as_deref(), Some("reel"));
        assert_eq!(filters.popularity, Popularity::Any);
        assert_eq!(filters.mode, CohesionMode::Medium);
        assert!(filters.seed.is_none());
    }

    #[test]
    fn test_clear_choices_keeps_mode() {
        let mut filters = SelectionFilters {
            tune_type: Some("jig".into()),
            popularity: Popularity::Rare,
            key: Some("D".into()),
            mode: CohesionMode::Creative,
            seed: Some(Tune::new(1, "x", "jig", "D", 1)),
        };
        filters.clear_choices();
        assert_eq!(filters, SelectionFilters::with_mode(CohesionMode::Creative));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Strict".parse::<CohesionMode>().unwrap(), CohesionMode::Strict);
        assert!("wild".parse::<CohesionMode>().is_err());
        assert_eq!(CohesionMode::Creative.to_string(), "creative");
    }

    #[test]
    fn test_popularity_parse() {
        assert_eq!("all".parse::<Popularity>().unwrap(), Popularity::Any);
        assert_eq!("very popular".parse::<Popularity>().unwrap(), Popularity::VeryPopular);
        assert_eq!(Popularity::Rare.tier(), Some(Tier::Rare));
        assert!("famous".parse::<Popularity>().is_err());
    }
}
