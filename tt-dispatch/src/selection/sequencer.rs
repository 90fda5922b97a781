//! Sequencer
//!
//! Synchronous core of the selection engine. Owns the working sequence, the
//! in-progress draw and the stored filters, and computes draws against a
//! borrowed catalog with an injected random source.
//!
//! Timing and the one-draw-at-a-time guard live in [`crate::engine`]; every
//! method here runs to completion.

use super::candidates::{cascade, type_pool};
use super::filters::{CohesionMode, SelectionFilters};
use crate::catalog::Catalog;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use tt_common::{Tune, TuneId};

/// Companions picked after the primary tune of a spin
const COMPANIONS_PER_SPIN: usize = 2;

/// Direction for reordering the in-progress draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    /// Committed tunes, accumulated across draws
    working: Vec<Tune>,

    /// Tunes from the latest draw, not yet committed
    draw: Vec<Tune>,

    filters: SelectionFilters,
}

impl Sequencer {
    pub fn new(filters: SelectionFilters) -> Self {
        Self {
            working: Vec::new(),
            draw: Vec::new(),
            filters,
        }
    }

    pub fn working(&self) -> &[Tune] {
        &self.working
    }

    pub fn draw(&self) -> &[Tune] {
        &self.draw
    }

    pub fn filters(&self) -> &SelectionFilters {
        &self.filters
    }

    /// Replace the stored filters
    pub fn set_filters(&mut self, filters: SelectionFilters) {
        self.filters = filters;
    }

    /// Force (or clear) the primary pick of the next spin
    pub fn set_seed(&mut self, seed: Option<Tune>) {
        self.filters.seed = seed;
    }

    pub fn working_ids(&self) -> Vec<TuneId> {
        self.working.iter().map(|t| t.id).collect()
    }

    /// Move the in-progress draw into the working sequence
    ///
    /// Tunes already in the working sequence are not added twice. Returns
    /// true if the working sequence grew.
    pub fn commit(&mut self) -> bool {
        let before = self.working.len();
        for tune in self.draw.drain(..) {
            if !self.working.iter().any(|t| t.id == tune.id) {
                self.working.push(tune);
            }
        }
        self.working.len() != before
    }

    /// Draw up to three tunes using the stored filters
    ///
    /// Commits the previous draw first. A stored seed is consumed. Returns
    /// None when there is nothing to draw.
    pub fn spin(&mut self, catalog: &Catalog, rng: &mut dyn RngCore) -> Option<Vec<Tune>> {
        let filters = self.filters.clone();
        self.filters.seed = None;
        self.spin_filtered(catalog, &filters, rng)
    }

    /// Spin with one-off filters, leaving the stored ones untouched
    pub fn spin_with(
        &mut self,
        catalog: &Catalog,
        filters: &SelectionFilters,
        rng: &mut dyn RngCore,
    ) -> Option<Vec<Tune>> {
        self.spin_filtered(catalog, filters, rng)
    }

    /// Spin for tunes matching the type and key of the last committed tune
    ///
    /// The stored popularity and cohesion mode apply. No-op when the working
    /// sequence is empty.
    pub fn spin_matching(&mut self, catalog: &Catalog, rng: &mut dyn RngCore) -> Option<Vec<Tune>> {
        let last = self.working.last()?;
        let filters = SelectionFilters {
            tune_type: Some(last.tune_type.clone()),
            popularity: self.filters.popularity,
            key: Some(last.key.clone()),
            mode: self.filters.mode,
            seed: None,
        };
        self.spin_filtered(catalog, &filters, rng)
    }

    /// Commit, reset the filter choices to "any" and spin around `tune`
    pub fn seed_and_spin(
        &mut self,
        catalog: &Catalog,
        tune: Tune,
        rng: &mut dyn RngCore,
    ) -> Option<Vec<Tune>> {
        self.commit();
        self.filters.clear_choices();
        self.filters.seed = Some(tune);
        self.spin(catalog, rng)
    }

    fn spin_filtered(
        &mut self,
        catalog: &Catalog,
        filters: &SelectionFilters,
        rng: &mut dyn RngCore,
    ) -> Option<Vec<Tune>> {
        self.commit();

        let used: HashSet<TuneId> = self.working.iter().map(|t| t.id).collect();

        let seed = filters.seed.as_ref().filter(|seed| {
            let fresh = !used.contains(&seed.id);
            if !fresh {
                warn!("Seed tune {} is already in the working sequence; ignoring it", seed.id);
            }
            fresh
        });

        let primary = match seed {
            Some(seed) => seed.clone(),
            None => {
                let pool: Vec<&Tune> = catalog
                    .filtered_pool(filters)
                    .into_iter()
                    .filter(|t| !used.contains(&t.id))
                    .collect();
                debug!("Primary pool has {} tunes", pool.len());
                match pool.choose(rng) {
                    Some(tune) => (*tune).clone(),
                    None => {
                        info!("Nothing to draw with the current filters");
                        return None;
                    }
                }
            }
        };

        let mut picks = vec![primary.clone()];
        picks.extend(pick_companions(catalog, &primary, filters.mode, &used, rng));

        info!(
            "Drew {} ({})",
            picks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(" / "),
            filters.mode
        );
        self.draw = picks.clone();
        Some(picks)
    }

    /// Append one tune related to the last tune of the in-progress draw
    ///
    /// No-op (returns None) when the draw is empty or nothing is eligible.
    pub fn draw_one_more(&mut self, catalog: &Catalog, rng: &mut dyn RngCore) -> Option<Tune> {
        let last = self.draw.last()?.clone();
        let excluded: HashSet<TuneId> = self
            .working
            .iter()
            .chain(self.draw.iter())
            .map(|t| t.id)
            .collect();

        let mode = self.filters.mode;
        let pool = type_pool(catalog, &last, mode, &excluded, rng);
        let candidates = match catalog.tier_of(&last) {
            Some(tier) => cascade(&last, tier, &pool, mode, catalog.len(), 1),
            None => pool,
        };

        let next = (*candidates.choose(rng)?).clone();
        debug!("Appending {} after {}", next.id, last.id);
        self.draw.push(next.clone());
        Some(next)
    }

    /// Returns true if the tune was in the working sequence
    pub fn remove_from_working(&mut self, id: TuneId) -> bool {
        let before = self.working.len();
        self.working.retain(|t| t.id != id);
        self.working.len() != before
    }

    /// Returns true if the tune was in the in-progress draw
    pub fn remove_from_draw(&mut self, id: TuneId) -> bool {
        let before = self.draw.len();
        self.draw.retain(|t| t.id != id);
        self.draw.len() != before
    }

    /// Swap the draw entry at `index` with its neighbor in `direction`
    ///
    /// Out-of-bounds moves are ignored (returns false).
    pub fn move_in_draw(&mut self, index: usize, direction: MoveDirection) -> bool {
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => index.checked_add(1),
        };
        match target {
            Some(target) if index < self.draw.len() && target < self.draw.len() => {
                self.draw.swap(index, target);
                true
            }
            _ => false,
        }
    }

    /// Empty both the working sequence and the in-progress draw
    pub fn clear(&mut self) {
        self.working.clear();
        self.draw.clear();
    }

    /// Replace the working sequence with a saved collection's tunes
    pub fn load_collection(&mut self, tunes: Vec<Tune>) {
        let mut seen = HashSet::with_capacity(tunes.len());
        self.working = tunes.into_iter().filter(|t| seen.insert(t.id)).collect();
        self.draw.clear();
    }
}

/// Shuffle the candidates for `primary` once and take the first two
fn pick_companions(
    catalog: &Catalog,
    primary: &Tune,
    mode: CohesionMode,
    used: &HashSet<TuneId>,
    rng: &mut dyn RngCore,
) -> Vec<Tune> {
    let pool = type_pool(catalog, primary, mode, used, rng);
    let mut candidates = match catalog.tier_of(primary) {
        Some(tier) => cascade(primary, tier, &pool, mode, catalog.len(), COMPANIONS_PER_SPIN),
        None => pool,
    };
    debug!("{} companion candidates for {}", candidates.len(), primary.id);

    candidates.shuffle(rng);
    candidates
        .into_iter()
        .take(COMPANIONS_PER_SPIN)
        .cloned()
        .collect()
}
