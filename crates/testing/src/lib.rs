//! Testing utilities for the Doodling trending engine
//!
//! This crate provides:
//! - Fixtures for engagement events and ranked items
//! - A fluent builder for engagement scenarios
//! - In-memory implementations of the repository traits, plus wrappers
//!   that inject failures and latency
//! - PostgreSQL test database setup for `#[ignore]`d integration tests
//!
//! # Examples
//!
//! ```
//! use doodling_testing::{ScenarioBuilder, InMemoryLeaderboard};
//!
//! let store = ScenarioBuilder::new()
//!     .views(1, 3)
//!     .comments(1, 1)
//!     .into_store();
//! assert_eq!(store.event_count(), 4);
//!
//! let board = InMemoryLeaderboard::new();
//! assert_eq!(board.replace_count(), 0);
//! ```

pub mod builders;
pub mod database;
pub mod fixtures;
pub mod mocks;

// Re-export commonly used types
pub use builders::*;
pub use fixtures::*;
pub use mocks::*;

// Re-export testing dependencies for convenience
pub use fake;
pub use proptest;
