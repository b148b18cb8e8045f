//! instattr-buffer-core: element kinds and host-side numeric buffers
//!
//! The attribute manager sizes and fills these buffers; renderers upload them.
//! Nothing here knows about records, accessors or invalidation.

pub mod buffer;
pub mod kind;

pub use buffer::{Element, NumericBuffer};
pub use kind::{gl, resolve, resolve_gl, BufferError, ElementKind};
