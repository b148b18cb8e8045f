//! Seam to an animated-transition subsystem.
//!
//! The manager does not interpolate anything itself. A [`TransitionDriver`]
//! receives the attribute table after every update cycle and can publish
//! interpolated buffers that override the manager's own when rendering.

use hashbrown::HashMap;
use instattr_buffer_core::NumericBuffer;
use serde::{Deserialize, Serialize};

use crate::descriptor::AttributeTable;

/// Capabilities of the rendering device relevant to transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCapabilities {
    /// Transform feedback (GPU-side interpolation) is available.
    pub transform_feedback: bool,
}

/// Transition settings for one attribute or accessor name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    /// Duration in milliseconds.
    pub duration_ms: f32,
}

/// Transition settings keyed by attribute or accessor name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionOptions {
    pub entries: HashMap<String, TransitionSpec>,
}

impl TransitionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, duration_ms: f32) -> Self {
        self.entries
            .insert(name.into(), TransitionSpec { duration_ms });
        self
    }

    pub fn get(&self, name: &str) -> Option<&TransitionSpec> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Interface the manager drives once per cycle.
pub trait TransitionDriver {
    /// Whether this driver can run on `caps`.
    fn is_supported(caps: &DeviceCapabilities) -> bool
    where
        Self: Sized;

    fn set_options(&mut self, options: &TransitionOptions);

    /// Called after every update cycle with the full attribute table.
    fn update(&mut self, attributes: &AttributeTable<'_>);

    /// Advance running transitions; `true` if any output changed.
    fn run(&mut self) -> bool;

    /// Interpolated buffers that currently override attribute contents.
    fn attributes(&self) -> Vec<(&str, &NumericBuffer)>;
}
