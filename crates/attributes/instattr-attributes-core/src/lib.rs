//! instattr attributes core (engine-agnostic)
//!
//! Owns the per-attribute buffers of an instanced draw: registration,
//! invalidation by trigger name, growth-on-demand allocation, recomputation
//! through bulk updaters or per-record accessors, and external buffer
//! overrides. Rendering and interpolation live elsewhere; see
//! [`transition::TransitionDriver`] for the hand-off point.

pub mod accessor;
pub mod config;
pub mod descriptor;
pub mod error;
mod executor;
pub mod external;
mod flags;
mod invalidation;
pub mod manager;
mod planner;
pub mod registry;
pub mod stored_attributes;
pub mod transition;

// Re-exports for consumers (layers, renderers)
pub use accessor::{Accessors, Components, MAX_COMPONENTS};
pub use config::Config;
pub use descriptor::{
    AttributeSpec, AttributeTable, AttributeView, Computation, UpdateArgs, Updater, Updaters,
};
pub use error::AttributeError;
pub use external::{ExternalBuffers, Override};
pub use manager::{AttributeManager, UpdateParams, UpdateReport};
pub use registry::AttributeRegistry;
pub use stored_attributes::parse_attribute_defs_json;
pub use transition::{DeviceCapabilities, TransitionDriver, TransitionOptions, TransitionSpec};
pub use instattr_buffer_core::{ElementKind, NumericBuffer};
