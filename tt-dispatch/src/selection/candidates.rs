//! Candidate pool builder
//!
//! Given a primary tune, produces the tunes that may follow it. Two stages:
//!
//! 1. [`type_pool`]: which tunes are eligible by type. The type constraint
//!    is a per-tune Bernoulli trial (probability from the cohesion mode), so
//!    the pool itself differs from draw to draw.
//! 2. [`build_candidates`]: within that pool, narrow by popularity tier and
//!    key, widening stepwise when too little survives.
//!
//! [`cascade`] adds the tier widening the sequencer applies around stage 2.

use super::filters::CohesionMode;
use super::keys::related_keys;
use super::tiers::{tier_of, Tier};
use crate::catalog::Catalog;
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;
use tt_common::{Tune, TuneId};

/// Creative mode keeps only "surprising" keys when at least this many exist
const CREATIVE_MIN_SURPRISES: usize = 5;

/// Catalog tunes eligible to follow `primary` by type
///
/// Excludes the primary itself and every id in `excluded`. A tune of a
/// different type survives when its own coin flip waives the type
/// constraint (never in strict mode).
pub fn type_pool<'a, R>(
    catalog: &'a Catalog,
    primary: &Tune,
    mode: CohesionMode,
    excluded: &HashSet<TuneId>,
    rng: &mut R,
) -> Vec<&'a Tune>
where
    R: Rng + ?Sized,
{
    let p = mode.type_match_probability();
    catalog
        .tunes()
        .iter()
        .filter(|t| t.id != primary.id && !excluded.contains(&t.id))
        .filter(|t| {
            t.tune_type == primary.tune_type
                || (mode != CohesionMode::Strict && !rng.gen_bool(p))
        })
        .collect()
}

/// Narrow `pool` to `tiers` and then by key according to `mode`
///
/// - strict: same key only.
/// - medium: same key; under 2, add related keys; under 2, whole tier pool.
/// - creative: keys neither equal nor related; under 5, any other key;
///   if none, whole tier pool.
pub fn build_candidates<'a>(
    tiers: &[Tier],
    pool: &[&'a Tune],
    primary_key: &str,
    mode: CohesionMode,
    catalog_size: usize,
) -> Vec<&'a Tune> {
    let tiered: Vec<&'a Tune> = pool
        .iter()
        .copied()
        .filter(|t| {
            tier_of(t, catalog_size)
                .map(|tier| tiers.contains(&tier))
                .unwrap_or(false)
        })
        .collect();

    match mode {
        CohesionMode::Strict => tiered.into_iter().filter(|t| t.key == primary_key).collect(),

        CohesionMode::Medium => {
            let mut matches: Vec<&'a Tune> =
                tiered.iter().copied().filter(|t| t.key == primary_key).collect();

            if matches.len() < 2 {
                let related = related_keys(primary_key);
                matches.extend(
                    tiered
                        .iter()
                        .copied()
                        .filter(|t| related.iter().any(|k| *k == t.key)),
                );
            }

            if matches.len() < 2 {
                return tiered;
            }
            matches
        }

        CohesionMode::Creative => {
            let related = related_keys(primary_key);
            let surprising: Vec<&'a Tune> = tiered
                .iter()
                .copied()
                .filter(|t| t.key != primary_key && !related.iter().any(|k| *k == t.key))
                .collect();
            if surprising.len() >= CREATIVE_MIN_SURPRISES {
                return surprising;
            }

            let different: Vec<&'a Tune> =
                tiered.iter().copied().filter(|t| t.key != primary_key).collect();
            if !different.is_empty() {
                return different;
            }
            tiered
        }
    }
}

/// Candidates for `primary` with tier widening
///
/// Tries the primary's tier alone; when fewer than `wanted` survive, retries
/// with the adjacent tiers, and finally falls back to the whole type pool.
/// Strict mode widens tiers but keeps its same-key rule, so it never takes
/// the pool fallback.
pub fn cascade<'a>(
    primary: &Tune,
    primary_tier: Tier,
    pool: &[&'a Tune],
    mode: CohesionMode,
    catalog_size: usize,
    wanted: usize,
) -> Vec<&'a Tune> {
    let mut candidates = build_candidates(&[primary_tier], pool, &primary.key, mode, catalog_size);
    if candidates.len() >= wanted {
        return candidates;
    }

    let neighbors = primary_tier.with_neighbors();
    debug!(
        "Only {} candidates in tier {:?}; widening to {:?}",
        candidates.len(),
        primary_tier,
        neighbors
    );
    candidates = build_candidates(&neighbors, pool, &primary.key, mode, catalog_size);
    if candidates.len() >= wanted || !mode.allows_pool_fallback() {
        return candidates;
    }

    debug!("Tier widening left {} candidates; using whole type pool", candidates.len());
    pool.to_vec()
}
