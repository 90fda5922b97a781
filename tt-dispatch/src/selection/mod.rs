//! Tune selection
//!
//! Tier classification, key relations, candidate pools and the sequencer
//! that turns them into draws.

pub mod candidates;
pub mod filters;
pub mod keys;
pub mod sequencer;
pub mod tiers;

pub use filters::{CohesionMode, Popularity, SelectionFilters};
pub use sequencer::{MoveDirection, Sequencer};
pub use tiers::Tier;
