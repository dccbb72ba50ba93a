//! Strongly-typed identifier types for the trending domain.
//!
//! The content store keys every table with auto-increment integers, so each
//! identifier wraps an `i64`. Distinct types keep a category id from being
//! passed where a post id is expected.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw database key
            #[inline]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Get the raw database key
            #[inline]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

define_id!(ContentId, "Identifier of a ranked content item (a post)");

define_id!(CategoryId, "Identifier of a top-level category");

define_id!(SubCategoryId, "Identifier of a subcategory");

define_id!(UserId, "Identifier of the user who produced an engagement event");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trips_through_string() {
        let id = ContentId::new(42);
        let parsed: ContentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&CategoryId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!("abc".parse::<SubCategoryId>().is_err());
    }

    #[test]
    fn test_ids_order_by_raw_value() {
        assert!(ContentId::new(1) < ContentId::new(2));
    }
}
