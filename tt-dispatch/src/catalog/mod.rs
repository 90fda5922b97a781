//! Catalog index
//!
//! Holds the rank-annotated tune catalog and answers the pool queries the
//! selection engine and the filter choices need. Immutable once built.

pub mod loader;

use crate::selection::filters::{Popularity, SelectionFilters, ANY};
use crate::selection::tiers::{self, Tier};
use std::collections::{BTreeSet, HashSet};
use tracing::warn;
use tt_common::{Tune, TuneId};

pub use loader::{load_catalog, CatalogSource};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Sorted by descending `tunebooks`; `global_rank` is the 1-based position
    tunes: Vec<Tune>,
}

impl Catalog {
    /// Empty catalog (degraded mode: every query returns nothing)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rank `tunes` by descending popularity and build the index
    ///
    /// The sort is stable, so equal `tunebooks` keep input order. Duplicate
    /// ids keep their first occurrence.
    pub fn load(tunes: Vec<Tune>) -> Self {
        let mut seen = HashSet::with_capacity(tunes.len());
        let mut tunes: Vec<Tune> = tunes
            .into_iter()
            .filter(|t| {
                let fresh = seen.insert(t.id);
                if !fresh {
                    warn!("Dropping duplicate catalog entry for tune {}", t.id);
                }
                fresh
            })
            .collect();

        tunes.sort_by(|a, b| b.tunebooks.cmp(&a.tunebooks));
        for (index, tune) in tunes.iter_mut().enumerate() {
            tune.global_rank = index as u32 + 1;
        }

        Self { tunes }
    }

    pub fn len(&self) -> usize {
        self.tunes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tunes.is_empty()
    }

    /// Full catalog in rank order (for external search indexers)
    pub fn tunes(&self) -> &[Tune] {
        &self.tunes
    }

    pub fn get(&self, id: TuneId) -> Option<&Tune> {
        self.tunes.iter().find(|t| t.id == id)
    }

    /// Cohesion tier of `tune` against the global ranking
    pub fn tier_of(&self, tune: &Tune) -> Option<Tier> {
        tiers::tier_of(tune, self.len())
    }

    /// Distinct tune types, sorted, prefixed with "any"
    pub fn available_types(&self) -> Vec<String> {
        let types: BTreeSet<&str> = self
            .tunes
            .iter()
            .map(|t| t.tune_type.as_str())
            .filter(|t| !t.is_empty())
            .collect();

        std::iter::once(ANY.to_string())
            .chain(types.into_iter().map(str::to_string))
            .collect()
    }

    /// Distinct keys present after applying the type then popularity filter,
    /// sorted, prefixed with "any"
    pub fn available_keys(&self, tune_type: Option<&str>, popularity: Popularity) -> Vec<String> {
        let pool = filter_by_popularity(self.by_type(tune_type), popularity);
        let keys: BTreeSet<&str> = pool
            .iter()
            .map(|t| t.key.as_str())
            .filter(|k| !k.is_empty())
            .collect();

        std::iter::once(ANY.to_string())
            .chain(keys.into_iter().map(str::to_string))
            .collect()
    }

    /// Pool for a primary pick: type, then popularity (ranked within the
    /// type pool), then key
    pub fn filtered_pool(&self, filters: &SelectionFilters) -> Vec<&Tune> {
        let pool = filter_by_popularity(self.by_type(filters.tune_type.as_deref()), filters.popularity);
        match filters.key.as_deref() {
            Some(key) => pool.into_iter().filter(|t| t.key == key).collect(),
            None => pool,
        }
    }

    fn by_type(&self, tune_type: Option<&str>) -> Vec<&Tune> {
        match tune_type {
            Some(tt) => self.tunes.iter().filter(|t| t.tune_type == tt).collect(),
            None => self.tunes.iter().collect(),
        }
    }
}

/// Keep the members of `pool` whose percentile within `pool` falls in the
/// requested tier
fn filter_by_popularity(mut pool: Vec<&Tune>, popularity: Popularity) -> Vec<&Tune> {
    let tier = match popularity.tier() {
        Some(t) => t,
        None => return pool,
    };
    if pool.is_empty() {
        return pool;
    }

    pool.sort_by(|a, b| b.tunebooks.cmp(&a.tunebooks));
    let total = pool.len();
    pool.into_iter()
        .enumerate()
        .filter(|(index, _)| Tier::from_rank(*index as u32 + 1, total) == tier)
        .map(|(_, t)| t)
        .collect()
}
