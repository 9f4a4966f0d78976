//! Records owned by the persistence API. Field names follow its camelCase JSON.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::matching::analyzer::coerce_score;

pub mod activity;
pub mod candidate;
pub mod job;
pub mod user;

/// Deserializes `null` as the type's default; the document store keeps
/// explicit nulls for fields older records never set.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a 0..=100 score written by any client: floats are rounded, numeric
/// strings parsed, out-of-range values clamped, anything else is 0.
pub(crate) fn lenient_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_score(&Value::deserialize(deserializer)?))
}
