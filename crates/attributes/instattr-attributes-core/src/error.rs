//! Error taxonomy for registration, invalidation, overrides and updates.

use instattr_buffer_core::ElementKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum AttributeError {
    /// A descriptor failed validation. Nothing from its batch was registered.
    #[error("invalid definition for attribute '{attribute}': {reason}")]
    Definition { attribute: String, reason: String },

    /// No attribute listens to this trigger name.
    #[error(
        "invalidating unknown trigger '{trigger}' (attributes: [{}])",
        .known.join(", ")
    )]
    UnknownTrigger { trigger: String, known: Vec<String> },

    /// The accessor an attribute reads from was not bound for this update.
    #[error("attribute '{attribute}' needs accessor '{accessor}', which was not provided")]
    MissingAccessor { attribute: String, accessor: String },

    /// An external buffer was supplied for a name that is not registered.
    #[error("unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("external buffer for '{attribute}' must be {expected}, got {actual}")]
    TypeMismatch {
        attribute: String,
        expected: ElementKind,
        actual: ElementKind,
    },

    #[error("external buffer for '{attribute}' holds {actual} elements, needs at least {required}")]
    SizeMismatch {
        attribute: String,
        required: usize,
        actual: usize,
    },

    /// The first elements of a freshly computed buffer were not finite.
    #[error("illegal values generated for attribute '{attribute}'")]
    CorruptAttribute { attribute: String },

    #[error("attribute json: {0}")]
    Json(String),
}

impl AttributeError {
    pub(crate) fn definition(attribute: &str, reason: impl Into<String>) -> Self {
        AttributeError::Definition {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}
