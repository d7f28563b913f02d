//! Tile location and decoding.
//!
//! - [`TileIndex`]: linear or row/column tile address
//! - [`Sample`] / [`SampleType`]: pixel element types and their byte decoding
//! - [`read_tile`] / [`read_tile_bytes`]: fetch one deflate tile through a [`RangeFetch`](crate::io::RangeFetch) client
//! - [`TileStats`] / [`BatchStats`]: timings reported alongside the pixels

mod decoder;
mod index;
mod sample;
mod stats;

pub use decoder::{read_tile, read_tile_bytes, DecodedTile, RawTile, DEFAULT_PROBE_SIZE};
pub use index::TileIndex;
pub use sample::{Sample, SampleType};
pub use stats::{BatchParams, BatchStats, TileStats};
