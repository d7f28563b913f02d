//! Single-tile reads: probe the header, locate the tile, fetch and inflate it.
//!
//! A tile read costs exactly two range requests against the object: one for
//! the first `probe_size` bytes and one for the compressed tile.

use std::io::Read;
use std::time::Instant;

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use ndarray::Array2;
use tracing::debug;

use crate::error::TileError;
use crate::format::tiff::{parse_header, Compression, Header, TiffTag, PREDICTOR_NONE};
use crate::io::RangeFetch;

use super::{Sample, TileIndex, TileStats};

/// Number of bytes fetched to parse the header when nothing else is configured.
pub const DEFAULT_PROBE_SIZE: usize = 4096;

/// Compression code assumed when the tag is absent.
const COMPRESSION_ABSENT: u16 = 1;

/// Initial inflate buffer, as a multiple of the compressed length.
const INFLATE_RESERVE_RATIO: usize = 4;

/// A decoded tile and the header it was read through.
#[derive(Debug, Clone)]
pub struct DecodedTile<T> {
    pub header: Header,
    /// Position of the tile in the tile tables
    pub index: usize,
    /// Pixels, shape `(TileLength, TileWidth)`
    pub pixels: Array2<T>,
    pub stats: TileStats,
}

/// Inflated tile bytes, not reinterpreted.
#[derive(Debug, Clone)]
pub struct RawTile {
    pub header: Header,
    pub index: usize,
    /// `(TileLength, TileWidth)`
    pub shape: (usize, usize),
    pub data: Vec<u8>,
    pub stats: TileStats,
}

/// Where a tile lives and how big it is.
struct TileLocation {
    index: usize,
    shape: (usize, usize),
    offset: u64,
    len: u64,
}

/// Read and decode one tile as `(TileLength, TileWidth)` elements of `T`.
///
/// # Errors
/// Fails if either range read fails, the header cannot be parsed, the tile
/// is not deflate-compressed without a predictor, a tag needed to locate the
/// tile is missing or lies past `probe_size`, the index is out of range, or
/// the inflated tile does not hold exactly one `T` per pixel.
pub fn read_tile<T: Sample, R: RangeFetch + ?Sized>(
    client: &R,
    location: &str,
    tile: TileIndex,
    probe_size: usize,
) -> Result<DecodedTile<T>, TileError> {
    let raw = read_tile_bytes(client, location, tile, probe_size)?;
    let started = raw.stats.started;

    let (rows, cols) = raw.shape;
    let element = std::mem::size_of::<T>();
    let expected = tile_size(raw.shape, element)?;
    if raw.data.len() != expected {
        return Err(TileError::DecodedSizeMismatch {
            expected,
            actual: raw.data.len(),
        });
    }

    let order = raw.header.byte_order;
    let values: Vec<T> = raw
        .data
        .chunks_exact(element)
        .map(|c| T::read(c, order))
        .collect();
    let pixels = Array2::from_shape_vec((rows, cols), values).map_err(|_| {
        TileError::DecodedSizeMismatch {
            expected,
            actual: raw.data.len(),
        }
    })?;

    Ok(DecodedTile {
        header: raw.header,
        index: raw.index,
        pixels,
        stats: TileStats {
            t_total: started.elapsed(),
            ..raw.stats
        },
    })
}

/// Read one tile and return its inflated bytes.
///
/// The inflated length must match TileLength * TileWidth * bytes per sample
/// as declared by the header.
pub fn read_tile_bytes<R: RangeFetch + ?Sized>(
    client: &R,
    location: &str,
    tile: TileIndex,
    probe_size: usize,
) -> Result<RawTile, TileError> {
    let started = Instant::now();

    let probe = client.fetch_range(location, 0, probe_size as u64)?;
    let header = parse_header(&probe)?;
    let t_open = started.elapsed();

    let loc = locate_tile(&header, tile, probe_size)?;
    debug!(
        location,
        tile = loc.index,
        offset = loc.offset,
        len = loc.len,
        "fetching tile"
    );

    let expected = tile_size(loc.shape, element_size(&header))?;
    let compressed = client.fetch_range(
        location,
        loc.offset,
        loc.offset.saturating_add(loc.len),
    )?;
    let data = inflate(&compressed, expected)?;

    Ok(RawTile {
        header,
        index: loc.index,
        shape: loc.shape,
        data,
        stats: TileStats {
            t_open,
            t_total: started.elapsed(),
            chunk_size: compressed.len(),
            started,
        },
    })
}

/// Validate the encoding and find the tile's byte range.
fn locate_tile(
    header: &Header,
    tile: TileIndex,
    probe_size: usize,
) -> Result<TileLocation, TileError> {
    let info = &header.info;

    let compression = info.compression.map_or(COMPRESSION_ABSENT, |c| c as u16);
    if !Compression::from_u16(compression).is_some_and(Compression::is_supported) {
        return Err(TileError::UnsupportedCompression(compression));
    }

    let predictor = info.predictor.map_or(PREDICTOR_NONE, |p| p as u16);
    if predictor != PREDICTOR_NONE {
        return Err(TileError::UnsupportedPredictor(predictor));
    }

    let tile_width = required(header, TiffTag::TileWidth, info.tile_width, probe_size)?;
    let tile_length = required(header, TiffTag::TileLength, info.tile_length, probe_size)?;
    let offsets = required(
        header,
        TiffTag::TileOffsets,
        info.tile_offsets.as_ref(),
        probe_size,
    )?;
    let byte_counts = required(
        header,
        TiffTag::TileByteCounts,
        info.tile_byte_counts.as_ref(),
        probe_size,
    )?;

    let table_len = offsets.len().min(byte_counts.len()) as u64;
    let count = info.tile_count().map_or(table_len, |c| c.min(table_len));
    let tiles_across = match tile {
        TileIndex::Grid { .. } => {
            required(header, TiffTag::ImageWidth, info.tiles_across(), probe_size)?
        }
        TileIndex::Linear(_) => info.tiles_across().unwrap_or(0),
    };

    let index = tile.resolve(tiles_across, count)?;

    Ok(TileLocation {
        index,
        shape: (tile_length as usize, tile_width as usize),
        offset: offsets[index],
        len: byte_counts[index],
    })
}

/// A projected value, or the reason it is not available.
fn required<V>(
    header: &Header,
    tag: TiffTag,
    value: Option<V>,
    probe_size: usize,
) -> Result<V, TileError> {
    match value {
        Some(v) => Ok(v),
        None if header.tag(tag).is_some() => Err(TileError::UnresolvedTag {
            tag: tag.name(),
            probe_size,
        }),
        None => Err(TileError::MissingTag(tag.name())),
    }
}

/// Bytes per element as declared by BitsPerSample, one byte if absent.
fn element_size(header: &Header) -> usize {
    header
        .info
        .bits_per_sample
        .map_or(1, |bits| (bits as usize).div_ceil(8).max(1))
}

/// Bytes held by a tile of `shape` elements.
fn tile_size((rows, cols): (usize, usize), element_size: usize) -> Result<usize, TileError> {
    rows.checked_mul(cols)
        .and_then(|n| n.checked_mul(element_size))
        .ok_or(TileError::TileTooLarge {
            rows,
            cols,
            element_size,
        })
}

/// Zlib-inflate a compressed tile into exactly `expected` bytes.
///
/// Output is cut off one byte past `expected`, so a stream that inflates
/// further is reported with `actual = expected + 1`.
fn inflate(compressed: &Bytes, expected: usize) -> Result<Vec<u8>, TileError> {
    let reserve = expected.min(compressed.len().saturating_mul(INFLATE_RESERVE_RATIO));
    let mut out = Vec::with_capacity(reserve);
    ZlibDecoder::new(compressed.as_ref())
        .take((expected as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| TileError::Decompress(e.to_string()))?;

    if out.len() != expected {
        return Err(TileError::DecodedSizeMismatch {
            expected,
            actual: out.len(),
        });
    }
    Ok(out)
}
