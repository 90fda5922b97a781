//! Catalog data model
//!
//! A `Tune` is one record of the tune catalog JSON. Field names follow the
//! catalog document (`type` is renamed because it is a Rust keyword).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Catalog identifier of a tune
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TuneId(pub u64);

impl fmt::Display for TuneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TuneId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TuneId)
    }
}

impl From<u64> for TuneId {
    fn from(id: u64) -> Self {
        TuneId(id)
    }
}

/// Immutable catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tune {
    pub id: TuneId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Rhythm / dance category ("reel", "jig", ...)
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub tune_type: String,

    /// Tonic plus optional mode ("G", "D minor", "A dorian")
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,

    /// ABC notation payload, opaque to the selection engine
    #[serde(default, deserialize_with = "null_as_default")]
    pub abc: String,

    /// Number of tunebooks the tune appears in (popularity count)
    #[serde(default, deserialize_with = "null_as_default")]
    pub tunebooks: u32,

    /// 1-based rank by descending `tunebooks`, assigned when the catalog loads
    #[serde(default, rename = "globalRank")]
    pub global_rank: u32,
}

impl Tune {
    /// Convenience constructor used by loaders and tests
    pub fn new(
        id: u64,
        name: impl Into<String>,
        tune_type: impl Into<String>,
        key: impl Into<String>,
        tunebooks: u32,
    ) -> Self {
        Self {
            id: TuneId(id),
            name: name.into(),
            tune_type: tune_type.into(),
            key: key.into(),
            abc: String::new(),
            tunebooks,
            global_rank: 0,
        }
    }
}

/// A named, persisted copy of a working sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedCollection {
    pub id: Uuid,
    pub title: String,
    pub tunes: Vec<Tune>,
    pub date: DateTime<Utc>,
}

/// Treat explicit JSON `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tune_deserializes_catalog_record() {
        let json = r#"{"id": 1, "name": "The Kesh", "type": "jig", "key": "G",
                       "abc": "|:GAG GAB|", "tunebooks": 1520}"#;
        let tune: Tune = serde_json::from_str(json).unwrap();

        assert_eq!(tune.id, TuneId(1));
        assert_eq!(tune.tune_type, "jig");
        assert_eq!(tune.key, "G");
        assert_eq!(tune.tunebooks, 1520);
        assert_eq!(tune.global_rank, 0);
    }

    #[test]
    fn test_missing_and_null_fields_default() {
        let json = r#"{"id": 7, "name": "Untitled", "tunebooks": null}"#;
        let tune: Tune = serde_json::from_str(json).unwrap();

        assert_eq!(tune.tunebooks, 0);
        assert!(tune.tune_type.is_empty());
        assert!(tune.key.is_empty());
        assert!(tune.abc.is_empty());
    }

    #[test]
    fn test_tune_id_parse_and_display() {
        let id: TuneId = " 42 ".parse().unwrap();
        assert_eq!(id, TuneId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<TuneId>().is_err());
    }

    #[test]
    fn test_type_field_serializes_with_catalog_name() {
        let tune = Tune::new(3, "Drowsy Maggie", "reel", "E dorian", 900);
        let value = serde_json::to_value(&tune).unwrap();
        assert_eq!(value["type"], "reel");
        assert_eq!(value["globalRank"], 0);
    }
}
