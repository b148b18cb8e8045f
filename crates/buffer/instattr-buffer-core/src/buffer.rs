//! Typed host-side storage for attribute data.
//!
//! A [`NumericBuffer`] owns one `Vec` of the element type named by its
//! [`ElementKind`]. Values cross the API as `f64` and are narrowed on write
//! with typed-array semantics: floats round to the nearest representable
//! value, integers truncate and wrap, clamped bytes round and saturate.

use crate::kind::ElementKind;

/// Dispatch on every variant with the same body.
macro_rules! each_variant {
    ($buf:expr, $data:ident => $body:expr) => {
        match $buf {
            NumericBuffer::Float32($data) => $body,
            NumericBuffer::Float64($data) => $body,
            NumericBuffer::Uint8($data) => $body,
            NumericBuffer::Uint8Clamped($data) => $body,
            NumericBuffer::Int8($data) => $body,
            NumericBuffer::Uint16($data) => $body,
            NumericBuffer::Int16($data) => $body,
            NumericBuffer::Uint32($data) => $body,
            NumericBuffer::Int32($data) => $body,
        }
    };
}

#[derive(Clone, Debug, PartialEq)]
pub enum NumericBuffer {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Uint8(Vec<u8>),
    Uint8Clamped(Vec<u8>),
    Int8(Vec<i8>),
    Uint16(Vec<u16>),
    Int16(Vec<i16>),
    Uint32(Vec<u32>),
    Int32(Vec<i32>),
}

impl NumericBuffer {
    /// Allocate `len` zeroed elements of `kind`.
    pub fn zeroed(kind: ElementKind, len: usize) -> Self {
        match kind {
            ElementKind::Float32 => NumericBuffer::Float32(vec![0.0; len]),
            ElementKind::Float64 => NumericBuffer::Float64(vec![0.0; len]),
            ElementKind::Uint8 => NumericBuffer::Uint8(vec![0; len]),
            ElementKind::Uint8Clamped => NumericBuffer::Uint8Clamped(vec![0; len]),
            ElementKind::Int8 => NumericBuffer::Int8(vec![0; len]),
            ElementKind::Uint16 => NumericBuffer::Uint16(vec![0; len]),
            ElementKind::Int16 => NumericBuffer::Int16(vec![0; len]),
            ElementKind::Uint32 => NumericBuffer::Uint32(vec![0; len]),
            ElementKind::Int32 => NumericBuffer::Int32(vec![0; len]),
        }
    }

    /// Wrap existing bytes as a clamped byte buffer.
    pub fn clamped_bytes(data: Vec<u8>) -> Self {
        NumericBuffer::Uint8Clamped(data)
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            NumericBuffer::Float32(_) => ElementKind::Float32,
            NumericBuffer::Float64(_) => ElementKind::Float64,
            NumericBuffer::Uint8(_) => ElementKind::Uint8,
            NumericBuffer::Uint8Clamped(_) => ElementKind::Uint8Clamped,
            NumericBuffer::Int8(_) => ElementKind::Int8,
            NumericBuffer::Uint16(_) => ElementKind::Uint16,
            NumericBuffer::Int16(_) => ElementKind::Int16,
            NumericBuffer::Uint32(_) => ElementKind::Uint32,
            NumericBuffer::Int32(_) => ElementKind::Int32,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        each_variant!(self, data => data.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the contents in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.kind().byte_size()
    }

    /// Read one element widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        each_variant!(self, data => data.get(index).map(|v| v.to_f64()))
    }

    /// Write one element, narrowing `value` to the buffer's kind.
    /// Returns `false` when `index` is out of range.
    pub fn set(&mut self, index: usize, value: f64) -> bool {
        if index >= self.len() {
            return false;
        }
        self.write_components(index, &[value]);
        true
    }

    /// Write consecutive elements starting at `offset`.
    ///
    /// # Panics
    /// Panics if `offset + values.len()` exceeds the buffer length.
    pub fn write_components(&mut self, offset: usize, values: &[f64]) {
        match self {
            NumericBuffer::Uint8Clamped(data) => {
                for (slot, v) in data[offset..offset + values.len()].iter_mut().zip(values) {
                    *slot = clamp_u8(*v);
                }
            }
            other => each_variant!(other, data => {
                for (slot, v) in data[offset..offset + values.len()].iter_mut().zip(values) {
                    *slot = Element::from_f64(*v);
                }
            }),
        }
    }

    /// Copy the contents out as `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        each_variant!(self, data => data.iter().map(|v| v.to_f64()).collect())
    }

    /// Typed view of the contents; `None` if `T` does not match the kind.
    /// Both byte kinds are visible as `u8`.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    /// Mutable typed view, for bulk updaters that write natively.
    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }
}

/// Native element types of a [`NumericBuffer`].
pub trait Element: Copy + sealed::Sealed {
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
    fn slice(buffer: &NumericBuffer) -> Option<&[Self]>;
    fn slice_mut(buffer: &mut NumericBuffer) -> Option<&mut [Self]>;
}

mod sealed {
    pub trait Sealed {}
}

/// Truncate toward zero and reduce modulo `2^bits`; non-finite values map to 0.
#[inline]
fn modular(value: f64, bits: u32) -> u64 {
    if !value.is_finite() {
        return 0;
    }
    let modulus = (1u64 << bits) as f64;
    value.trunc().rem_euclid(modulus) as u64
}

#[inline]
fn clamp_u8(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

macro_rules! float_element {
    ($ty:ty, $variant:ident) => {
        impl sealed::Sealed for $ty {}
        impl Element for $ty {
            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn slice(buffer: &NumericBuffer) -> Option<&[Self]> {
                match buffer {
                    NumericBuffer::$variant(data) => Some(data),
                    _ => None,
                }
            }
            fn slice_mut(buffer: &mut NumericBuffer) -> Option<&mut [Self]> {
                match buffer {
                    NumericBuffer::$variant(data) => Some(data),
                    _ => None,
                }
            }
        }
        impl From<Vec<$ty>> for NumericBuffer {
            fn from(data: Vec<$ty>) -> Self {
                NumericBuffer::$variant(data)
            }
        }
    };
}

macro_rules! int_element {
    ($ty:ty, $unsigned:ty, $bits:expr, $variant:ident) => {
        impl sealed::Sealed for $ty {}
        impl Element for $ty {
            #[inline]
            fn from_f64(value: f64) -> Self {
                modular(value, $bits) as $unsigned as $ty
            }
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn slice(buffer: &NumericBuffer) -> Option<&[Self]> {
                match buffer {
                    NumericBuffer::$variant(data) => Some(data),
                    _ => None,
                }
            }
            fn slice_mut(buffer: &mut NumericBuffer) -> Option<&mut [Self]> {
                match buffer {
                    NumericBuffer::$variant(data) => Some(data),
                    _ => None,
                }
            }
        }
        impl From<Vec<$ty>> for NumericBuffer {
            fn from(data: Vec<$ty>) -> Self {
                NumericBuffer::$variant(data)
            }
        }
    };
}

float_element!(f32, Float32);
float_element!(f64, Float64);
int_element!(i8, u8, 8, Int8);
int_element!(u16, u16, 16, Uint16);
int_element!(i16, u16, 16, Int16);
int_element!(u32, u32, 32, Uint32);
int_element!(i32, u32, 32, Int32);

// u8 backs two variants, so it is spelled out.
impl sealed::Sealed for u8 {}
impl Element for u8 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        modular(value, 8) as u8
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn slice(buffer: &NumericBuffer) -> Option<&[Self]> {
        match buffer {
            NumericBuffer::Uint8(data) | NumericBuffer::Uint8Clamped(data) => Some(data),
            _ => None,
        }
    }
    fn slice_mut(buffer: &mut NumericBuffer) -> Option<&mut [Self]> {
        match buffer {
            NumericBuffer::Uint8(data) | NumericBuffer::Uint8Clamped(data) => Some(data),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for NumericBuffer {
    fn from(data: Vec<u8>) -> Self {
        NumericBuffer::Uint8(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_matches_kind_and_len() {
        let buf = NumericBuffer::zeroed(ElementKind::Uint16, 6);
        assert_eq!(buf.kind(), ElementKind::Uint16);
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.byte_len(), 12);
        assert_eq!(buf.to_f64_vec(), vec![0.0; 6]);
    }

    #[test]
    fn integer_writes_truncate_and_wrap() {
        let mut buf = NumericBuffer::zeroed(ElementKind::Uint8, 4);
        buf.write_components(0, &[256.0, -1.0, 3.9, f64::NAN]);
        assert_eq!(buf.as_slice::<u8>(), Some(&[0u8, 255, 3, 0][..]));

        let mut buf = NumericBuffer::zeroed(ElementKind::Int8, 3);
        buf.write_components(0, &[128.0, -129.0, -2.7]);
        assert_eq!(buf.as_slice::<i8>(), Some(&[-128i8, 127, -2][..]));

        let mut buf = NumericBuffer::zeroed(ElementKind::Uint32, 2);
        buf.write_components(0, &[-1.0, f64::INFINITY]);
        assert_eq!(buf.as_slice::<u32>(), Some(&[u32::MAX, 0][..]));
    }

    #[test]
    fn clamped_bytes_saturate_and_round_half_even() {
        let mut buf = NumericBuffer::zeroed(ElementKind::Uint8Clamped, 5);
        buf.write_components(0, &[300.0, -5.0, 1.5, 2.5, f64::NAN]);
        assert_eq!(buf.as_slice::<u8>(), Some(&[255u8, 0, 2, 2, 0][..]));
    }

    #[test]
    fn float_writes_keep_non_finite_values() {
        let mut buf = NumericBuffer::zeroed(ElementKind::Float32, 2);
        buf.write_components(0, &[0.5, f64::NAN]);
        assert_eq!(buf.get(0), Some(0.5));
        assert!(buf.get(1).is_some_and(f64::is_nan));
    }

    #[test]
    fn set_reports_out_of_range() {
        let mut buf = NumericBuffer::from(vec![1.0f32, 2.0]);
        assert!(buf.set(1, 7.0));
        assert!(!buf.set(2, 7.0));
        assert_eq!(buf.as_slice::<f32>(), Some(&[1.0f32, 7.0][..]));
    }

    #[test]
    fn typed_views_reject_other_kinds() {
        let mut buf = NumericBuffer::from(vec![1i32, 2, 3]);
        assert!(buf.as_slice::<f32>().is_none());
        if let Some(data) = buf.as_mut_slice::<i32>() {
            data[2] = 9;
        }
        assert_eq!(buf.get(2), Some(9.0));
        assert!(NumericBuffer::clamped_bytes(vec![1, 2])
            .as_slice::<u8>()
            .is_some());
    }
}
