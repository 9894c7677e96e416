//! Live connection rows.

use serde::{Deserialize, Serialize};

/// Placeholder used when a connection registered without a display name.
pub const DEFAULT_DISPLAY_NAME: &str = "Guest";

/// One live client session.
///
/// `id` is assigned by the transport at connect time and is opaque to this
/// service. `display_name` is best-effort: rows written without one are
/// still valid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Transport-assigned connection identifier.
    pub id: String,
    /// Player name shown to the opponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Connection {
    /// A connection with no display name.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    /// A connection with a display name.
    pub fn named(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(display_name.into()),
        }
    }

    /// The display name, or `fallback` when the row has none.
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.display_name.as_deref().unwrap_or(fallback)
    }
}
