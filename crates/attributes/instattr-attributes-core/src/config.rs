//! Manager configuration.

use serde::{Deserialize, Serialize};

use crate::transition::TransitionOptions;

/// Configuration for an [`AttributeManager`](crate::AttributeManager).
/// Keep this small; per-attribute settings belong in the attribute specs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix for log lines, so several managers can be told apart.
    pub id: String,
    /// Transition settings handed to a driver when one is enabled.
    pub transitions: TransitionOptions,
}

impl Config {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: "attribute-manager".to_string(),
            transitions: TransitionOptions::default(),
        }
    }
}
