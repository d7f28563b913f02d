//! File format parsers.
//!
//! Only classic (32-bit offset) TIFF is understood, which covers
//! cloud-optimized GeoTIFF rasters written with deflate tiles.

pub mod tiff;

pub use tiff::{parse_header, ByteOrder, Header, Info, Tag, TagValue};
