//! Favorites store
//!
//! Set of starred tune ids. Durable copy lives in the settings table under
//! [`FAVORITES_KEY`](tt_common::db::FAVORITES_KEY); the in-memory set is
//! authoritative while the service runs.

use crate::error::Result;
use sqlx::{Pool, Sqlite};
use std::collections::BTreeSet;
use tt_common::db::{load_favorite_ids, save_favorite_ids};
use tt_common::TuneId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Favorites {
    ids: BTreeSet<TuneId>,
}

impl Favorites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = TuneId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Read the persisted set
    pub async fn load(db: &Pool<Sqlite>) -> Result<Self> {
        Ok(Self::from_ids(load_favorite_ids(db).await?))
    }

    /// Write the set back
    pub async fn save(&self, db: &Pool<Sqlite>) -> Result<()> {
        save_favorite_ids(db, &self.ids()).await?;
        Ok(())
    }

    /// Flip membership; returns the new state
    pub fn toggle(&mut self, id: TuneId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Un-star `id`; returns true if it was starred
    pub fn remove(&mut self, id: TuneId) -> bool {
        self.ids.remove(&id)
    }

    pub fn is_favorite(&self, id: TuneId) -> bool {
        self.ids.contains(&id)
    }

    /// Starred ids in ascending order
    pub fn ids(&self) -> Vec<TuneId> {
        self.ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
