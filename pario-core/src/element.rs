//! Element type tags
//!
//! Maps in-memory numeric element types to the I/O primitive tag used to
//! describe file regions, and to the array-file `descr` strings.

use crate::{ParioError, Result};

/// Numeric element types that can be read collectively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum ElementType {
    I8 = 0,
    I16 = 1,
    I32 = 2,
    I64 = 3,
    U8 = 4,
    U16 = 5,
    U32 = 6,
    U64 = 7,
    F32 = 8,
    F64 = 9,
}

impl ElementType {
    /// Get the size in bytes for this element type
    pub const fn size_bytes(self) -> usize {
        match self {
            ElementType::I8 | ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 => 8,
        }
    }

    const fn kind(self) -> char {
        match self {
            ElementType::I8 | ElementType::I16 | ElementType::I32 | ElementType::I64 => 'i',
            ElementType::U8 | ElementType::U16 | ElementType::U32 | ElementType::U64 => 'u',
            ElementType::F32 | ElementType::F64 => 'f',
        }
    }

    /// Parse an array-file type descriptor such as `"<f8"` or `"|u1"`
    ///
    /// Only numeric types stored in the native byte order are accepted,
    /// since regions are read with the native data representation.
    pub fn from_descr(descr: &str) -> Result<Self> {
        let bytes = descr.as_bytes();
        if bytes.len() < 3 {
            return Err(ParioError::UnsupportedElementType);
        }

        let (order, kind) = (bytes[0], bytes[1]);
        let width: usize = core::str::from_utf8(&bytes[2..])
            .ok()
            .and_then(|w| w.parse().ok())
            .ok_or(ParioError::UnsupportedElementType)?;

        let element = match (kind, width) {
            (b'i', 1) => ElementType::I8,
            (b'i', 2) => ElementType::I16,
            (b'i', 4) => ElementType::I32,
            (b'i', 8) => ElementType::I64,
            (b'u', 1) => ElementType::U8,
            (b'u', 2) => ElementType::U16,
            (b'u', 4) => ElementType::U32,
            (b'u', 8) => ElementType::U64,
            (b'f', 4) => ElementType::F32,
            (b'f', 8) => ElementType::F64,
            _ => return Err(ParioError::UnsupportedElementType),
        };

        let native = match order {
            b'|' | b'=' => true,
            b'<' => cfg!(target_endian = "little") || width == 1,
            b'>' => cfg!(target_endian = "big") || width == 1,
            _ => false,
        };
        if !native {
            return Err(ParioError::UnsupportedElementType);
        }
        Ok(element)
    }

    /// Native-order descriptor for this type
    pub fn descr(self) -> alloc::string::String {
        let order = if self.size_bytes() == 1 {
            '|'
        } else if cfg!(target_endian = "little") {
            '<'
        } else {
            '>'
        };
        alloc::format!("{order}{}{}", self.kind(), self.size_bytes())
    }
}

impl core::fmt::Display for ElementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        };
        write!(f, "{name}")
    }
}

/// Trait for types that can be stored as array elements
///
/// Elements must be plain old data so a byte buffer read from the file can
/// be reinterpreted in place.
pub trait Element: bytemuck::Pod + Send + Sync + 'static {
    /// The I/O primitive tag for this element type
    const ELEMENT_TYPE: ElementType;
}

macro_rules! impl_element {
    ($type:ty, $tag:ident) => {
        impl Element for $type {
            const ELEMENT_TYPE: ElementType = ElementType::$tag;
        }
    };
}

impl_element!(i8, I8);
impl_element!(i16, I16);
impl_element!(i32, I32);
impl_element!(i64, I64);
impl_element!(u8, U8);
impl_element!(u16, U16);
impl_element!(u32, U32);
impl_element!(u64, U64);
impl_element!(f32, F32);
impl_element!(f64, F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_descriptors_parse() {
        assert_eq!(ElementType::from_descr("|u1"), Ok(ElementType::U8));
        assert_eq!(ElementType::from_descr("|i1"), Ok(ElementType::I8));
        assert_eq!(ElementType::from_descr("=i4"), Ok(ElementType::I32));
        for element in [
            ElementType::I16,
            ElementType::I64,
            ElementType::U32,
            ElementType::F32,
            ElementType::F64,
        ] {
            assert_eq!(ElementType::from_descr(&element.descr()), Ok(element));
        }
    }

    #[test]
    fn test_non_numeric_descriptors_rejected() {
        for descr in ["|O", "<U10", "|S5", "|V8", "<M8", "|b1", "<c16", "<f16", "f8", ""] {
            assert_eq!(
                ElementType::from_descr(descr),
                Err(ParioError::UnsupportedElementType),
                "{descr}"
            );
        }
    }

    #[test]
    fn test_foreign_byte_order_rejected() {
        let foreign = if cfg!(target_endian = "little") { ">f8" } else { "<f8" };
        assert_eq!(
            ElementType::from_descr(foreign),
            Err(ParioError::UnsupportedElementType)
        );
    }

    #[test]
    fn test_element_tags_match_sizes() {
        assert_eq!(<f64 as Element>::ELEMENT_TYPE, ElementType::F64);
        assert_eq!(<u16 as Element>::ELEMENT_TYPE.size_bytes(), 2);
        assert_eq!(
            ElementType::I32.size_bytes(),
            core::mem::size_of::<i32>()
        );
    }
}
