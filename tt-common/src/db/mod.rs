//! Database models and queries
//!
//! SQLite stands in for the durable key-value storage the dispatcher needs:
//! a `settings` table (favorites live there) and saved collections.

pub mod collections;
pub mod init;
pub mod settings;

pub use collections::*;
pub use init::*;
pub use settings::*;
