//! # Tune Terminal Dispatcher (tt-dispatch)
//!
//! Recommends sets of traditional tunes from a ranked catalog.
//!
//! **Architecture:**
//! - [`catalog`]: rank-annotated catalog index and its loader
//! - [`selection`]: tiers, key relations, candidate pools and the
//!   synchronous sequencer
//! - [`engine`]: async wrapper adding the one-draw-at-a-time guard, settle
//!   delays, events and persistence
//! - [`api`]: HTTP control surface and SSE stream

pub mod api;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod favorites;
pub mod selection;
pub mod state;

pub use api::{build_router, AppContext};
pub use catalog::Catalog;
pub use engine::{DrawOutcome, EngineConfig, Phase, SetEngine};
pub use error::{Error, Result};
pub use state::SharedState;
