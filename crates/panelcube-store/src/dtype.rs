//! Numeric element types for dense datasets.
//!
//! [`NumericType`] is the runtime tag (what a configuration names), [`Element`]
//! is the compile-time counterpart used by slab writes. The two meet in
//! [`match_each_element_type!`], which turns a tag into a concrete type.

use std::fmt;
use std::str::FromStr;

use ndarray_npy::{ViewMutElement, WritableElement};
use serde::{Deserialize, Serialize};

/// Element type of a numeric dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    Int8,
    Int16,
    #[default]
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl NumericType {
    pub const ALL: [NumericType; 10] = [
        NumericType::Int8,
        NumericType::Int16,
        NumericType::Int32,
        NumericType::Int64,
        NumericType::UInt8,
        NumericType::UInt16,
        NumericType::UInt32,
        NumericType::UInt64,
        NumericType::Float32,
        NumericType::Float64,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NumericType::Int8 => "int8",
            NumericType::Int16 => "int16",
            NumericType::Int32 => "int32",
            NumericType::Int64 => "int64",
            NumericType::UInt8 => "uint8",
            NumericType::UInt16 => "uint16",
            NumericType::UInt32 => "uint32",
            NumericType::UInt64 => "uint64",
            NumericType::Float32 => "float32",
            NumericType::Float64 => "float64",
        }
    }

    /// Width of one element in bytes.
    pub fn byte_width(&self) -> usize {
        match self {
            NumericType::Int8 | NumericType::UInt8 => 1,
            NumericType::Int16 | NumericType::UInt16 => 2,
            NumericType::Int32 | NumericType::UInt32 | NumericType::Float32 => 4,
            NumericType::Int64 | NumericType::UInt64 | NumericType::Float64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, NumericType::Float32 | NumericType::Float64)
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown numeric type `{0}` (expected one of int8..int64, uint8..uint64, float32, float64)")]
pub struct UnknownNumericType(pub String);

impl FromStr for NumericType {
    type Err = UnknownNumericType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "int8" | "i8" => NumericType::Int8,
            "int16" | "i16" => NumericType::Int16,
            // `integer32` is the spelling older pipeline configs used.
            "int32" | "i32" | "integer32" => NumericType::Int32,
            "int64" | "i64" | "integer64" => NumericType::Int64,
            "uint8" | "u8" => NumericType::UInt8,
            "uint16" | "u16" => NumericType::UInt16,
            "uint32" | "u32" => NumericType::UInt32,
            "uint64" | "u64" => NumericType::UInt64,
            "float32" | "f32" => NumericType::Float32,
            "float64" | "f64" | "float" | "double" => NumericType::Float64,
            _ => return Err(UnknownNumericType(s.to_string())),
        };
        Ok(ty)
    }
}

/// A Rust type that can live in a dense dataset.
pub trait Element:
    WritableElement + ViewMutElement + Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const NUMERIC_TYPE: NumericType;

    /// Cast a parsed cell into this type.
    ///
    /// Integers truncate toward zero and saturate at their bounds; NaN maps
    /// to zero.
    fn from_f64(value: f64) -> Self;

    /// Combine two observations of the same cell.
    fn accumulate(self, other: Self) -> Self;
}

macro_rules! impl_int_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const NUMERIC_TYPE: NumericType = NumericType::$tag;

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                #[inline]
                fn accumulate(self, other: Self) -> Self {
                    self.saturating_add(other)
                }
            }
        )*
    };
}

macro_rules! impl_float_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const NUMERIC_TYPE: NumericType = NumericType::$tag;

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                #[inline]
                fn accumulate(self, other: Self) -> Self {
                    self + other
                }
            }
        )*
    };
}

impl_int_element!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
);

impl_float_element!(f32 => Float32, f64 => Float64);

/// Bind `$tp` to the Rust type behind a [`NumericType`] and evaluate `$body`.
///
/// ```ignore
/// let width = match_each_element_type!(dtype, |T| { std::mem::size_of::<T>() });
/// ```
#[macro_export]
macro_rules! match_each_element_type {
    ($self:expr, |$tp:ident| $body:block) => {{
        match $self {
            $crate::NumericType::Int8 => {
                type $tp = i8;
                $body
            }
            $crate::NumericType::Int16 => {
                type $tp = i16;
                $body
            }
            $crate::NumericType::Int32 => {
                type $tp = i32;
                $body
            }
            $crate::NumericType::Int64 => {
                type $tp = i64;
                $body
            }
            $crate::NumericType::UInt8 => {
                type $tp = u8;
                $body
            }
            $crate::NumericType::UInt16 => {
                type $tp = u16;
                $body
            }
            $crate::NumericType::UInt32 => {
                type $tp = u32;
                $body
            }
            $crate::NumericType::UInt64 => {
                type $tp = u64;
                $body
            }
            $crate::NumericType::Float32 => {
                type $tp = f32;
                $body
            }
            $crate::NumericType::Float64 => {
                type $tp = f64;
                $body
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_short_names() {
        for ty in NumericType::ALL {
            assert_eq!(ty.name().parse::<NumericType>().unwrap(), ty);
        }
        assert_eq!("i32".parse::<NumericType>().unwrap(), NumericType::Int32);
        assert_eq!("integer32".parse::<NumericType>().unwrap(), NumericType::Int32);
        assert_eq!("F64".parse::<NumericType>().unwrap(), NumericType::Float64);
        assert!("int128".parse::<NumericType>().is_err());
    }

    #[test]
    fn default_is_int32() {
        assert_eq!(NumericType::default(), NumericType::Int32);
    }

    #[test]
    fn macro_binds_matching_element() {
        for ty in NumericType::ALL {
            let (tag, width) =
                match_each_element_type!(ty, |T| { (T::NUMERIC_TYPE, std::mem::size_of::<T>()) });
            assert_eq!(tag, ty);
            assert_eq!(width, ty.byte_width());
        }
    }

    #[test]
    fn casts_truncate_and_saturate() {
        assert_eq!(i32::from_f64(3.9), 3);
        assert_eq!(i32::from_f64(-3.9), -3);
        assert_eq!(u8::from_f64(300.0), 255);
        assert_eq!(u8::from_f64(-1.0), 0);
        assert_eq!(i16::from_f64(f64::NAN), 0);
        assert_eq!(f32::from_f64(1.5), 1.5);
    }

    #[test]
    fn accumulate_saturates_integers() {
        assert_eq!(i8::MAX.accumulate(1), i8::MAX);
        assert_eq!(2u32.accumulate(3), 5);
        assert_eq!(0.5f64.accumulate(0.25), 0.75);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&NumericType::UInt16).unwrap();
        assert_eq!(json, "\"uint16\"");
        let back: NumericType = serde_json::from_str("\"float32\"").unwrap();
        assert_eq!(back, NumericType::Float32);
    }
}
