//! Popularity tiers
//!
//! A rank within a ranked population maps to one of four buckets by
//! percentile: <=10% very popular, <=30% common, <=60% rare, else obscure.
//! The same cutoffs are used against two different bases: the whole catalog
//! (a tune's cohesion tier) and a filtered pool (popularity filter).

use serde::{Deserialize, Serialize};
use tt_common::Tune;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    VeryPopular = 0,
    Common = 1,
    Rare = 2,
    Obscure = 3,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::VeryPopular, Tier::Common, Tier::Rare, Tier::Obscure];

    /// Classify a 1-based `rank` among `total` ranked items
    ///
    /// Integer form of `rank / total * 100 <= cutoff`. `total` must be > 0.
    pub fn from_rank(rank: u32, total: usize) -> Tier {
        debug_assert!(total > 0, "tier of an empty population");
        let scaled = rank as u64 * 100;
        let total = total as u64;
        if scaled <= 10 * total {
            Tier::VeryPopular
        } else if scaled <= 30 * total {
            Tier::Common
        } else if scaled <= 60 * total {
            Tier::Rare
        } else {
            Tier::Obscure
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: i32) -> Option<Tier> {
        match index {
            0 => Some(Tier::VeryPopular),
            1 => Some(Tier::Common),
            2 => Some(Tier::Rare),
            3 => Some(Tier::Obscure),
            _ => None,
        }
    }

    /// `{tier-1, tier, tier+1}` clamped to the valid range
    pub fn with_neighbors(self) -> Vec<Tier> {
        let i = self.index() as i32;
        (i - 1..=i + 1).filter_map(Tier::from_index).collect()
    }
}

/// Cohesion tier of a tune, from its global rank in a catalog of
/// `catalog_size` tunes
///
/// Returns None for an empty catalog or an unranked tune.
pub fn tier_of(tune: &Tune, catalog_size: usize) -> Option<Tier> {
    if catalog_size == 0 || tune.global_rank == 0 {
        return None;
    }
    Some(Tier::from_rank(tune.global_rank, catalog_size))
}
