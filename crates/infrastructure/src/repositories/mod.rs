//! Repository seams between the ranking engine and the content store.
//!
//! Each trait has a PostgreSQL implementation here; in-memory implementations
//! for tests live in the `doodling-testing` crate.

mod engagement_repository;
mod leaderboard_repository;
mod scope_catalog;

pub use engagement_repository::*;
pub use leaderboard_repository::*;
pub use scope_catalog::*;
