//! Classic TIFF header parsing from a partial file prefix.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the first two bytes. All multi-byte values are read respecting this order.
//!
//! - **Directory (IFD)**: A table of 12-byte entries describing the image. Only the
//!   first directory is parsed; cloud-optimized files put the full-resolution
//!   image there.
//!
//! - **Inline vs offset values**: Values of at most four bytes are stored inline in
//!   the entry, larger values at an absolute offset. Offsets beyond the bytes that
//!   were fetched are kept as unresolved regions.

mod info;
mod parser;
mod tags;
mod values;

pub use info::Info;
pub use parser::{
    parse_header, ByteOrder, Header, Region, Tag, DIRECTORY_ENTRY_SIZE, TIFF_HEADER_SIZE,
};
pub use tags::{
    lookup_tag, synthetic_tag_name, Compression, FieldType, TiffTag, PREDICTOR_HORIZONTAL,
    PREDICTOR_NONE, UNKNOWN_TYPE_NAME,
};
pub use values::TagValue;
