//! # Tune Terminal Common Library
//!
//! Shared code for the Tune Terminal services including:
//! - Catalog data model (tunes, saved collections)
//! - Event types (DispatchEvent enum)
//! - Configuration loading and root folder resolution
//! - SQLite persistence (settings key-value table, saved collections)

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use models::{SavedCollection, Tune, TuneId};
