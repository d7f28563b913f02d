//! TIFF tag value decoding.
//!
//! Values are stored either inline in the directory entry (when they fit in
//! four bytes) or at an offset in the file. Either way the raw bytes are
//! decoded here with the file's byte order, which has the same effect as
//! byte-swapping when the file order differs from the host order.

use serde::Serialize;

use super::parser::ByteOrder;
use super::tags::FieldType;

// =============================================================================
// TagValue
// =============================================================================

/// A decoded tag value, one vector per TIFF type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl TagValue {
    /// Decode `count` items of `field_type` from `bytes`.
    ///
    /// `bytes` must hold at least `count * field_type.size_in_bytes()` bytes.
    pub fn decode(bytes: &[u8], field_type: FieldType, count: usize, order: ByteOrder) -> Self {
        let size = field_type.size_in_bytes();
        let items = || bytes.chunks_exact(size).take(count);

        match field_type {
            FieldType::Byte => TagValue::Byte(bytes[..count].to_vec()),
            FieldType::Undefined => TagValue::Undefined(bytes[..count].to_vec()),
            FieldType::SByte => TagValue::SByte(bytes[..count].iter().map(|&b| b as i8).collect()),
            FieldType::Ascii => {
                let raw = &bytes[..count];
                let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                TagValue::Ascii(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
            FieldType::Short => TagValue::Short(items().map(|c| order.read_u16(c)).collect()),
            FieldType::SShort => {
                TagValue::SShort(items().map(|c| order.read_u16(c) as i16).collect())
            }
            FieldType::Long => TagValue::Long(items().map(|c| order.read_u32(c)).collect()),
            FieldType::SLong => TagValue::SLong(items().map(|c| order.read_u32(c) as i32).collect()),
            FieldType::Float => {
                TagValue::Float(items().map(|c| f32::from_bits(order.read_u32(c))).collect())
            }
            FieldType::Double => {
                TagValue::Double(items().map(|c| f64::from_bits(order.read_u64(c))).collect())
            }
            FieldType::Rational => TagValue::Rational(
                items()
                    .map(|c| (order.read_u32(&c[..4]), order.read_u32(&c[4..])))
                    .collect(),
            ),
            FieldType::SRational => TagValue::SRational(
                items()
                    .map(|c| (order.read_u32(&c[..4]) as i32, order.read_u32(&c[4..]) as i32))
                    .collect(),
            ),
        }
    }

    /// Values as unsigned integers.
    ///
    /// Only defined for the unsigned integer types; this is what offset,
    /// byte-count and dimension tags use.
    pub fn as_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            TagValue::Byte(v) => Some(v.iter().map(|&x| x as u64).collect()),
            TagValue::Short(v) => Some(v.iter().map(|&x| x as u64).collect()),
            TagValue::Long(v) => Some(v.iter().map(|&x| x as u64).collect()),
            _ => None,
        }
    }

    /// First value as an unsigned integer.
    pub fn first_u64(&self) -> Option<u64> {
        match self {
            TagValue::Byte(v) => v.first().map(|&x| x as u64),
            TagValue::Short(v) => v.first().map(|&x| x as u64),
            TagValue::Long(v) => v.first().map(|&x| x as u64),
            _ => None,
        }
    }

    /// String content of an ASCII value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(s) => Some(s),
            _ => None,
        }
    }

    /// Number of decoded items (characters for ASCII).
    pub fn len(&self) -> usize {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.len(),
            TagValue::Ascii(s) => s.len(),
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SByte(v) => v.len(),
            TagValue::SShort(v) => v.len(),
            TagValue::SLong(v) => v.len(),
            TagValue::SRational(v) => v.len(),
            TagValue::Float(v) => v.len(),
            TagValue::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Tests
// =============================================================================
