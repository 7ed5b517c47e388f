//! Typed identifiers shared across scheduler components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque content-addressed identifier of a remotely stored shard result.
///
/// The scheduler never interprets the value; it only embeds it in result
/// URLs and local cache file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultId(
    /// Raw identifier value.
    pub String,
);

impl ResultId {
    /// Wrap any stringifiable identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
