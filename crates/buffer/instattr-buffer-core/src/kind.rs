//! Element kinds and the tag resolver.
//!
//! Attributes name their element type with a short tag (`"float32"`, `"uint16"`)
//! or a WebGL enum name (`"UNSIGNED_SHORT"`). [`resolve`] maps either form to an
//! [`ElementKind`]; [`resolve_gl`] does the same for the numeric enum values.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// WebGL component type enums accepted by [`resolve_gl`].
pub mod gl {
    pub const BYTE: u32 = 0x1400;
    pub const UNSIGNED_BYTE: u32 = 0x1401;
    pub const SHORT: u32 = 0x1402;
    pub const UNSIGNED_SHORT: u32 = 0x1403;
    pub const INT: u32 = 0x1404;
    pub const UNSIGNED_INT: u32 = 0x1405;
    pub const FLOAT: u32 = 0x1406;
    pub const DOUBLE: u32 = 0x140A;
}

/// Errors produced while resolving element kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("unknown element kind '{tag}'")]
    UnknownElementKind { tag: String },
}

/// Numeric element type of an attribute buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    #[default]
    Float32,
    Float64,
    Uint8,
    /// Unsigned byte that saturates instead of wrapping on write.
    Uint8Clamped,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
}

impl ElementKind {
    /// Canonical lowercase tag, accepted back by [`resolve`].
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Float32 => "float32",
            ElementKind::Float64 => "float64",
            ElementKind::Uint8 => "uint8",
            ElementKind::Uint8Clamped => "uint8clamped",
            ElementKind::Int8 => "int8",
            ElementKind::Uint16 => "uint16",
            ElementKind::Int16 => "int16",
            ElementKind::Uint32 => "uint32",
            ElementKind::Int32 => "int32",
        }
    }

    /// Size of one element in bytes.
    pub fn byte_size(self) -> usize {
        match self {
            ElementKind::Uint8 | ElementKind::Uint8Clamped | ElementKind::Int8 => 1,
            ElementKind::Uint16 | ElementKind::Int16 => 2,
            ElementKind::Float32 | ElementKind::Uint32 | ElementKind::Int32 => 4,
            ElementKind::Float64 => 8,
        }
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, ElementKind::Float32 | ElementKind::Float64)
    }

    /// Clamped variant of this kind. Only unsigned bytes have one.
    #[inline]
    pub fn clamped(self) -> Self {
        match self {
            ElementKind::Uint8 => ElementKind::Uint8Clamped,
            other => other,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve an element-kind tag. `clamped` selects [`ElementKind::Uint8Clamped`]
/// for unsigned bytes and is ignored for every other kind.
pub fn resolve(tag: &str, clamped: bool) -> Result<ElementKind, BufferError> {
    let kind = match tag {
        "float32" | "f32" | "float" | "FLOAT" => ElementKind::Float32,
        "float64" | "f64" | "double" | "DOUBLE" => ElementKind::Float64,
        "uint8" | "u8" | "UNSIGNED_BYTE" => ElementKind::Uint8,
        "uint8clamped" => ElementKind::Uint8Clamped,
        "int8" | "i8" | "BYTE" => ElementKind::Int8,
        "uint16" | "u16" | "UNSIGNED_SHORT" => ElementKind::Uint16,
        "int16" | "i16" | "SHORT" => ElementKind::Int16,
        "uint32" | "u32" | "UNSIGNED_INT" => ElementKind::Uint32,
        "int32" | "i32" | "INT" => ElementKind::Int32,
        _ => {
            return Err(BufferError::UnknownElementKind {
                tag: tag.to_string(),
            })
        }
    };
    Ok(if clamped { kind.clamped() } else { kind })
}

/// Resolve a numeric WebGL component type (see [`gl`]).
pub fn resolve_gl(code: u32, clamped: bool) -> Result<ElementKind, BufferError> {
    let kind = match code {
        gl::FLOAT => ElementKind::Float32,
        gl::DOUBLE => ElementKind::Float64,
        gl::UNSIGNED_BYTE => ElementKind::Uint8,
        gl::BYTE => ElementKind::Int8,
        gl::UNSIGNED_SHORT => ElementKind::Uint16,
        gl::SHORT => ElementKind::Int16,
        gl::UNSIGNED_INT => ElementKind::Uint32,
        gl::INT => ElementKind::Int32,
        _ => {
            return Err(BufferError::UnknownElementKind {
                tag: format!("{code:#06x}"),
            })
        }
    };
    Ok(if clamped { kind.clamped() } else { kind })
}
