//! Serialization utilities.
//!
//! Configuration files express durations as whole seconds.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serialize a Duration as seconds.
///
/// # Examples
///
/// ```
/// use serde::{Serialize, Deserialize};
/// use std::time::Duration;
///
/// #[derive(Serialize, Deserialize)]
/// struct Config {
///     #[serde(serialize_with = "doodling_common::serialization::serialize_duration_as_seconds")]
///     #[serde(deserialize_with = "doodling_common::serialization::deserialize_duration_from_seconds")]
///     timeout: Duration,
/// }
/// ```
pub fn serialize_duration_as_seconds<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}

/// Deserialize a Duration from seconds.
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(seconds))
}
