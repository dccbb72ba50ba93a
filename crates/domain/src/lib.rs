//! Doodling Trending Domain Types
//!
//! Core value types of the trending engine: identifiers, engagement events,
//! ranking partitions, time windows, the per-run score tally and the ranked
//! output written to the leaderboard.
//!
//! ## Architecture
//!
//! - **identifiers**: integer-backed typed keys for posts, categories and users
//! - **engagement**: view / comment / like events read from the content store
//! - **scope**: `Scope` and `Period`, which together name a leaderboard partition
//! - **window**: inclusive time windows
//! - **tally**: the view-gated score accumulator
//! - **ranking**: ranked items, persisted rank entries, tie-breaking
//! - **errors**: parse and construction errors
//!
//! ## Usage
//!
//! ```rust
//! use doodling_domain::{ContentId, Period, Scope, ScoreTally};
//!
//! let scope: Scope = "category:5".parse().unwrap();
//! assert_eq!(scope.scope_key(), 5);
//! assert_eq!("weekly".parse::<Period>().unwrap(), Period::Weekly);
//!
//! let mut tally = ScoreTally::new();
//! tally.record(ContentId::new(1));
//! assert!(!tally.amplify(ContentId::new(2), 10));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engagement;
pub mod errors;
pub mod identifiers;
pub mod ranking;
pub mod scope;
pub mod tally;
pub mod window;

pub use engagement::{EngagementEvent, EngagementKind};
pub use errors::{DomainError, DomainResult};
pub use identifiers::*;
pub use ranking::{is_dense, RankEntry, RankedItem, TieBreak};
pub use scope::{Period, Scope, ScopeKind};
pub use tally::ScoreTally;
pub use window::TimeWindow;
