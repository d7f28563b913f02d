//! TIFF header and directory parsing.
//!
//! The parser works on whatever prefix of the file the caller fetched. The
//! preamble and the first directory must be present; tag values stored
//! further into the file are left unresolved rather than treated as errors,
//! so a small speculative probe is enough to learn the image layout.
//!
//! # Structure
//!
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Magic (42 = 0x002A)
//! Bytes 4-7: Offset to first directory
//!
//! Directory: u16 entry count, then count x 12-byte entries
//!   tag id: u16 | type: u16 | count: u32 | value or offset: u32
//! ```

use std::collections::hash_map::{Entry, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::error::FormatError;
use crate::io::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le};

use super::info::Info;
use super::tags::{lookup_tag, synthetic_tag_name, FieldType, TiffTag, UNKNOWN_TYPE_NAME};
use super::values::TagValue;

// =============================================================================
// Constants
// =============================================================================

/// Marker indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Marker indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Magic number of classic TIFF
const TIFF_MAGIC: u16 = 42;

/// Size of the fixed preamble in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of one directory entry in bytes
pub const DIRECTORY_ENTRY_SIZE: usize = 12;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    #[serde(rename = "little")]
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    #[serde(rename = "big")]
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the machine we are running on.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    /// `"little"` or `"big"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "little",
            ByteOrder::BigEndian => "big",
        }
    }

    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }
}

// =============================================================================
// Tag
// =============================================================================

/// Byte span of an out-of-line tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub offset: u64,
    pub len: u64,
}

impl Region {
    /// One past the last byte of the value.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.len)
    }

    /// The value bytes, if the whole span lies inside `buffer`.
    pub fn slice<'a>(&self, buffer: &'a [u8]) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(self.len)?;
        if end > buffer.len() as u64 {
            return None;
        }
        Some(&buffer[self.offset as usize..end as usize])
    }
}

/// One directory entry.
///
/// Inline tags carry a value and no region. Out-of-line tags carry a region,
/// and a value only when the region was inside the parsed buffer. Tags with
/// an unknown type id carry neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub name: String,
    pub id: u16,
    pub type_id: u16,
    pub field_type: Option<FieldType>,
    pub count: u32,
    pub value: Option<TagValue>,
    pub region: Option<Region>,
}

impl Tag {
    fn from_entry(entry: &[u8], order: ByteOrder, buffer: &[u8]) -> Self {
        let id = order.read_u16(&entry[0..2]);
        let type_id = order.read_u16(&entry[2..4]);
        let count = order.read_u32(&entry[4..8]);
        let field = &entry[8..12];

        let name = lookup_tag(id)
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| synthetic_tag_name(id));

        let field_type = FieldType::from_u16(type_id);
        let (value, region) = match field_type {
            None => (None, None),
            Some(ft) if ft.fits_inline(count) => {
                (Some(TagValue::decode(field, ft, count as usize, order)), None)
            }
            Some(ft) => {
                let region = Region {
                    offset: order.read_u32(field) as u64,
                    len: ft.size_in_bytes() as u64 * count as u64,
                };
                let value = region
                    .slice(buffer)
                    .map(|bytes| TagValue::decode(bytes, ft, count as usize, order));
                (value, Some(region))
            }
        };

        Tag {
            name,
            id,
            type_id,
            field_type,
            count,
            value,
            region,
        }
    }

    /// Type name from the type table, `"UNKNOWN"` for unknown type ids.
    pub fn type_name(&self) -> &'static str {
        self.field_type.map_or(UNKNOWN_TYPE_NAME, FieldType::name)
    }

    /// Catalog description, `"Unknown"` for ids outside the catalog.
    pub fn description(&self) -> &'static str {
        lookup_tag(self.id).map_or("Unknown", |(_, desc)| desc)
    }

    /// Whether the value was decoded.
    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

// =============================================================================
// Header
// =============================================================================

/// Parsed header: byte order, first directory and its projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    #[serde(rename = "byteorder")]
    pub byte_order: ByteOrder,
    pub first_ifd_offset: u64,
    pub info: Info,
    tags: Vec<Tag>,
}

impl Header {
    /// Parse the preamble and first directory from `buffer`.
    ///
    /// # Errors
    /// - `TooShort` if the buffer cannot hold the 8-byte preamble
    /// - `InvalidByteOrder` if bytes 0-1 are not II or MM
    /// - `InvalidMagic` if the magic number is not 42
    /// - `TruncatedDirectory` if the first directory does not fit in the buffer
    pub fn parse(buffer: &[u8]) -> Result<Self, FormatError> {
        if buffer.len() < TIFF_HEADER_SIZE {
            return Err(FormatError::TooShort {
                required: TIFF_HEADER_SIZE,
                actual: buffer.len(),
            });
        }

        // Checking for specific byte patterns, so the read order does not matter
        let marker = u16::from_le_bytes([buffer[0], buffer[1]]);
        let byte_order = match marker {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(FormatError::InvalidByteOrder(marker)),
        };

        let magic = byte_order.read_u16(&buffer[2..4]);
        if magic != TIFF_MAGIC {
            return Err(FormatError::InvalidMagic(magic));
        }

        let first_ifd_offset = byte_order.read_u32(&buffer[4..8]) as u64;
        let entries = directory_entries(buffer, first_ifd_offset, byte_order)?;

        let count = entries.len() / DIRECTORY_ENTRY_SIZE;
        let mut tags: Vec<Tag> = Vec::with_capacity(count);
        let mut positions: HashMap<u16, usize> = HashMap::with_capacity(count);
        for entry in entries.chunks_exact(DIRECTORY_ENTRY_SIZE) {
            let tag = Tag::from_entry(entry, byte_order, buffer);
            // Last entry wins, keeping the position of the first one
            match positions.entry(tag.id) {
                Entry::Occupied(slot) => tags[*slot.get()] = tag,
                Entry::Vacant(slot) => {
                    slot.insert(tags.len());
                    tags.push(tag);
                }
            }
        }

        debug!(
            entries = count,
            tags = tags.len(),
            offset = first_ifd_offset,
            "parsed first directory"
        );

        let info = Info::from_tags(&tags);

        Ok(Header {
            byte_order,
            first_ifd_offset,
            info,
            tags,
        })
    }

    /// All tags in directory order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Look up a tag by catalog (or synthetic) name.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Look up a tag by numeric id.
    pub fn tag_by_id(&self, id: u16) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    /// Look up one of the keys of interest.
    pub fn tag(&self, tag: TiffTag) -> Option<&Tag> {
        self.tag_by_id(tag.as_u16())
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Parse a TIFF header from a full or truncated file prefix.
pub fn parse_header(buffer: &[u8]) -> Result<Header, FormatError> {
    Header::parse(buffer)
}

/// Slice out the entry table of the directory at `offset`.
fn directory_entries(
    buffer: &[u8],
    offset: u64,
    order: ByteOrder,
) -> Result<&[u8], FormatError> {
    let truncated = |required: u64| FormatError::TruncatedDirectory {
        offset,
        required,
        actual: buffer.len(),
    };

    let count_end = offset + 2;
    if count_end > buffer.len() as u64 {
        return Err(truncated(count_end));
    }
    let start = offset as usize;
    let count = order.read_u16(&buffer[start..start + 2]) as u64;

    let end = count_end + count * DIRECTORY_ENTRY_SIZE as u64;
    if end > buffer.len() as u64 {
        return Err(truncated(end));
    }

    Ok(&buffer[start + 2..end as usize])
}

// =============================================================================
// Tests
// =============================================================================
