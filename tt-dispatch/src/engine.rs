//! Set engine
//!
//! Async owner of the catalog, the sequencer and the favorites. Adds what the
//! synchronous core leaves out:
//!
//! - **One draw at a time:** the phase flag moves Idle -> Drawing/Extending
//!   on entry and back on exit. A draw requested while another is in flight
//!   returns [`DrawOutcome::Busy`] without touching any state. Sequence edits
//!   in that window fail with [`Error::Busy`].
//! - **Settle delays:** a finished draw becomes final only after the
//!   configured delay (zero in tests).
//! - **Events:** every visible change is broadcast through [`SharedState`].
//! - **Persistence:** favorites and saved collections are written to SQLite
//!   when a database is attached. Write failures are logged and the
//!   in-memory state stays authoritative.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::favorites::Favorites;
use crate::selection::{CohesionMode, MoveDirection, SelectionFilters, Sequencer};
use crate::state::SharedState;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};
use tt_common::events::DispatchEvent;
use tt_common::{db, time, SavedCollection, Tune, TuneId};
use uuid::Uuid;

/// Default delay before a spin becomes final
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3500;

/// Default delay before an appended tune becomes final
pub const DEFAULT_EXTEND_DELAY_MS: u64 = 1500;

/// What the engine is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle = 0,
    Drawing = 1,
    Extending = 2,
}

impl Phase {
    fn from_u8(value: u8) -> Phase {
        match value {
            1 => Phase::Drawing,
            2 => Phase::Extending,
            _ => Phase::Idle,
        }
    }
}

/// Result of a draw request
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    /// Tunes added by this request (three or fewer for a spin, one for an
    /// extension)
    Drawn(Vec<Tune>),

    /// Another draw was in flight; nothing changed
    Busy,

    /// No eligible tune; the caller may relax its filters and retry
    NothingToDraw,
}

impl DrawOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            DrawOutcome::Drawn(_) => "drawn",
            DrawOutcome::Busy => "busy",
            DrawOutcome::NothingToDraw => "empty",
        }
    }

    pub fn into_tunes(self) -> Vec<Tune> {
        match self {
            DrawOutcome::Drawn(tunes) => tunes,
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub settle_delay: Duration,
    pub extend_delay: Duration,
    /// Cohesion mode of the initial filters
    pub default_mode: CohesionMode,
}

impl EngineConfig {
    /// No settle delays
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            extend_delay: Duration::ZERO,
            default_mode: CohesionMode::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay: time::millis_to_duration(DEFAULT_SETTLE_DELAY_MS),
            extend_delay: time::millis_to_duration(DEFAULT_EXTEND_DELAY_MS),
            default_mode: CohesionMode::default(),
        }
    }
}

struct Inner {
    sequencer: Sequencer,
    favorites: Favorites,
    rng: Box<dyn RngCore + Send>,
}

/// Resets the phase flag to Idle when the draw ends, however it ends
struct PhaseGuard<'a>(&'a AtomicU8);

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.store(Phase::Idle as u8, Ordering::Release);
    }
}

pub struct SetEngine {
    catalog: RwLock<Arc<Catalog>>,
    inner: Mutex<Inner>,
    phase: AtomicU8,
    config: EngineConfig,
    db: Option<Pool<Sqlite>>,
    state: Arc<SharedState>,
}

impl SetEngine {
    /// Create an engine with an entropy-seeded random source and no database
    pub fn new(catalog: Catalog, config: EngineConfig, state: Arc<SharedState>) -> Self {
        let filters = SelectionFilters::with_mode(config.default_mode);
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
            inner: Mutex::new(Inner {
                sequencer: Sequencer::new(filters),
                favorites: Favorites::new(),
                rng: Box::new(StdRng::from_entropy()),
            }),
            phase: AtomicU8::new(Phase::Idle as u8),
            config,
            db: None,
            state,
        }
    }

    /// Replace the random source
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.inner.get_mut().rng = Box::new(rng);
        self
    }

    /// Attach a database and load the persisted favorites
    pub async fn with_database(mut self, db: Pool<Sqlite>) -> Self {
        match Favorites::load(&db).await {
            Ok(favorites) => {
                info!("Loaded {} favorites", favorites.len());
                self.inner.get_mut().favorites = favorites;
            }
            Err(e) => warn!("Failed to load favorites: {}", e),
        }
        self.db = Some(db);
        self
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current catalog snapshot
    pub async fn catalog(&self) -> Arc<Catalog> {
        self.catalog.read().await.clone()
    }

    /// Swap in a new catalog; the working sequence and draw are kept
    pub async fn install_catalog(&self, catalog: Catalog) {
        let tune_count = catalog.len();
        *self.catalog.write().await = Arc::new(catalog);
        if tune_count == 0 {
            warn!("Installed an empty catalog; draws will find nothing");
        } else {
            info!("Installed catalog with {} tunes", tune_count);
        }
        self.state.broadcast_event(DispatchEvent::CatalogLoaded {
            tune_count,
            timestamp: time::now(),
        });
    }

    pub async fn filters(&self) -> SelectionFilters {
        self.inner.lock().await.sequencer.filters().clone()
    }

    /// Replace the stored filters, keeping a pending seed
    pub async fn set_filters(&self, mut filters: SelectionFilters) {
        let mut inner = self.inner.lock().await;
        if filters.seed.is_none() {
            filters.seed = inner.sequencer.filters().seed.clone();
        }
        debug!("Filters set to {:?}", filters);
        inner.sequencer.set_filters(filters);
    }

    /// Force the primary pick of the next spin (None clears it)
    pub async fn set_seed(&self, id: Option<TuneId>) -> Result<()> {
        let seed = match id {
            Some(id) => Some(self.lookup(id).await?),
            None => None,
        };
        self.inner.lock().await.sequencer.set_seed(seed);
        Ok(())
    }

    pub async fn working(&self) -> Vec<Tune> {
        self.inner.lock().await.sequencer.working().to_vec()
    }

    pub async fn draw(&self) -> Vec<Tune> {
        self.inner.lock().await.sequencer.draw().to_vec()
    }

    /// Draw up to three tunes with the stored filters
    pub async fn spin(&self) -> DrawOutcome {
        self.run_spin(|sequencer, catalog, rng| sequencer.spin(catalog, rng))
            .await
    }

    /// Draw with one-off filters; the stored filters are left alone
    pub async fn spin_with(&self, filters: SelectionFilters) -> DrawOutcome {
        self.run_spin(move |sequencer, catalog, rng| sequencer.spin_with(catalog, &filters, rng))
            .await
    }

    /// Draw tunes matching the type and key of the last committed tune
    pub async fn spin_matching(&self) -> DrawOutcome {
        self.run_spin(|sequencer, catalog, rng| sequencer.spin_matching(catalog, rng))
            .await
    }

    /// Commit, reset the filter choices and draw around the given tune
    pub async fn seed_and_spin(&self, id: TuneId) -> Result<DrawOutcome> {
        let seed = self.lookup(id).await?;
        Ok(self
            .run_spin(move |sequencer, catalog, rng| sequencer.seed_and_spin(catalog, seed, rng))
            .await)
    }

    /// Append one related tune to the in-progress draw
    pub async fn draw_one_more(&self) -> DrawOutcome {
        let _guard = match self.try_enter(Phase::Extending) {
            Some(guard) => guard,
            None => return DrawOutcome::Busy,
        };
        let catalog = self.catalog().await;

        let next = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            let rng: &mut dyn RngCore = inner.rng.as_mut();
            inner.sequencer.draw_one_more(&catalog, rng)
        };

        let tune = match next {
            Some(tune) => tune,
            None => {
                debug!("Nothing to append");
                return DrawOutcome::NothingToDraw;
            }
        };

        if !self.config.extend_delay.is_zero() {
            tokio::time::sleep(self.config.extend_delay).await;
        }
        info!("Appended {} to the draw", tune.name);
        self.state.broadcast_event(DispatchEvent::TuneAppended {
            tune: tune.clone(),
            timestamp: time::now(),
        });
        DrawOutcome::Drawn(vec![tune])
    }

    /// Commit the in-progress draw into the working sequence
    pub async fn reset_draw(&self) -> Result<Vec<Tune>> {
        let (changed, working) = {
            let mut inner = self.lock_idle().await?;
            let changed = inner.sequencer.commit();
            (changed, inner.sequencer.working().to_vec())
        };
        if changed {
            self.announce_working(&working);
        }
        Ok(working)
    }

    /// Empty the working sequence and the in-progress draw
    pub async fn clear_all(&self) -> Result<()> {
        self.lock_idle().await?.sequencer.clear();
        info!("Cleared working sequence and draw");
        self.announce_working(&[]);
        Ok(())
    }

    /// Remove a tune from the working sequence, un-starring it as well
    pub async fn remove_from_working(&self, id: TuneId) -> Result<bool> {
        let (removed, unstarred, working, favorites) = {
            let mut inner = self.lock_idle().await?;
            let removed = inner.sequencer.remove_from_working(id);
            let unstarred = removed && inner.favorites.remove(id);
            (
                removed,
                unstarred,
                inner.sequencer.working().to_vec(),
                inner.favorites.clone(),
            )
        };

        if unstarred {
            self.persist_favorites(&favorites).await;
            self.state.broadcast_event(DispatchEvent::FavoritesChanged {
                tune_id: id,
                favorite: false,
                timestamp: time::now(),
            });
        }
        if removed {
            self.announce_working(&working);
        }
        Ok(removed)
    }

    pub async fn remove_from_draw(&self, id: TuneId) -> Result<bool> {
        Ok(self.lock_idle().await?.sequencer.remove_from_draw(id))
    }

    pub async fn move_in_draw(&self, index: usize, direction: MoveDirection) -> Result<bool> {
        Ok(self.lock_idle().await?.sequencer.move_in_draw(index, direction))
    }

    /// Flip a tune's favorite state; returns the new state
    pub async fn toggle_favorite(&self, id: TuneId) -> bool {
        let (favorite, favorites) = {
            let mut inner = self.inner.lock().await;
            let favorite = inner.favorites.toggle(id);
            (favorite, inner.favorites.clone())
        };

        self.persist_favorites(&favorites).await;
        self.state.broadcast_event(DispatchEvent::FavoritesChanged {
            tune_id: id,
            favorite,
            timestamp: time::now(),
        });
        favorite
    }

    pub async fn is_favorite(&self, id: TuneId) -> bool {
        self.inner.lock().await.favorites.is_favorite(id)
    }

    pub async fn favorites(&self) -> Vec<TuneId> {
        self.inner.lock().await.favorites.ids()
    }

    /// Replace the working sequence with `tunes` and clear the draw
    pub async fn load_collection(&self, tunes: Vec<Tune>) -> Result<()> {
        let working = {
            let mut inner = self.lock_idle().await?;
            inner.sequencer.load_collection(tunes);
            inner.sequencer.working().to_vec()
        };
        self.announce_working(&working);
        Ok(())
    }

    /// Save the working sequence under `title`
    pub async fn save_collection(&self, title: &str) -> Result<SavedCollection> {
        let pool = self.database()?;
        let working = self.working().await;
        let collection = db::save_collection(pool, title, &working).await?;
        info!("Saved collection '{}' ({} tunes)", collection.title, collection.tunes.len());
        Ok(collection)
    }

    pub async fn list_collections(&self) -> Result<Vec<SavedCollection>> {
        Ok(db::list_collections(self.database()?).await?)
    }

    /// Load a saved collection into the working sequence
    pub async fn load_saved_collection(&self, id: Uuid) -> Result<SavedCollection> {
        let collection = db::get_collection(self.database()?, id).await?;
        self.load_collection(collection.tunes.clone()).await?;
        info!("Loaded collection '{}'", collection.title);
        Ok(collection)
    }

    pub async fn delete_collection(&self, id: Uuid) -> Result<bool> {
        Ok(db::delete_collection(self.database()?, id).await?)
    }

    async fn run_spin<F>(&self, spin: F) -> DrawOutcome
    where
        F: FnOnce(&mut Sequencer, &Catalog, &mut dyn RngCore) -> Option<Vec<Tune>>,
    {
        let _guard = match self.try_enter(Phase::Drawing) {
            Some(guard) => guard,
            None => {
                debug!("Draw already in flight");
                return DrawOutcome::Busy;
            }
        };
        let catalog = self.catalog().await;

        let (drawn, working_before, working_after) = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            let before = inner.sequencer.working_ids();
            let rng: &mut dyn RngCore = inner.rng.as_mut();
            let drawn = spin(&mut inner.sequencer, catalog.as_ref(), rng);
            (drawn, before, inner.sequencer.working().to_vec())
        };

        let after: Vec<TuneId> = working_after.iter().map(|t| t.id).collect();
        if after != working_before {
            self.announce_working(&working_after);
        }

        let tunes = match drawn {
            Some(tunes) => tunes,
            None => return DrawOutcome::NothingToDraw,
        };

        self.state.broadcast_event(DispatchEvent::DrawStarted {
            tune_ids: tunes.iter().map(|t| t.id).collect(),
            timestamp: time::now(),
        });
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        self.state.broadcast_event(DispatchEvent::DrawSettled {
            tunes: tunes.clone(),
            timestamp: time::now(),
        });
        DrawOutcome::Drawn(tunes)
    }

    fn try_enter(&self, phase: Phase) -> Option<PhaseGuard<'_>> {
        self.phase
            .compare_exchange(
                Phase::Idle as u8,
                phase as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| PhaseGuard(&self.phase))
    }

    /// Lock the state for a sequence edit
    ///
    /// The phase is read under the lock: a draw enters its phase before
    /// taking the lock, so an Idle reading here cannot interleave with one.
    async fn lock_idle(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self.inner.lock().await;
        match self.phase() {
            Phase::Idle => Ok(inner),
            phase => {
                debug!("Edit refused while {:?}", phase);
                Err(Error::Busy)
            }
        }
    }

    async fn lookup(&self, id: TuneId) -> Result<Tune> {
        self.catalog()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("tune {}", id)))
    }

    fn database(&self) -> Result<&Pool<Sqlite>> {
        self.db
            .as_ref()
            .ok_or_else(|| Error::Config("no database attached".to_string()))
    }

    async fn persist_favorites(&self, favorites: &Favorites) {
        if let Some(pool) = &self.db {
            if let Err(e) = favorites.save(pool).await {
                warn!("Failed to persist favorites: {}", e);
            }
        }
    }

    fn announce_working(&self, working: &[Tune]) {
        self.state.broadcast_event(DispatchEvent::WorkingSequenceChanged {
            tune_ids: working.iter().map(|t| t.id).collect(),
            timestamp: time::now(),
        });
    }
}
