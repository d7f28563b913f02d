//! # S3 Tile Reader
//!
//! Parallel tile reads from cloud-optimized GeoTIFFs stored in S3-compatible
//! object storage.
//!
//! This library reads the same tile from many objects at once. For each object
//! it fetches a small probe of leading bytes, parses the first image directory,
//! looks up the tile's byte range, fetches just that range and inflates it into
//! a slab of a caller-owned 3-D array. Nothing beyond the probe and the tile
//! itself is ever downloaded.
//!
//! ## Features
//!
//! - **Range-based reads**: one probe request and one tile request per object
//! - **Worker pool**: a fixed set of OS threads, each owning its storage client
//! - **Fault isolation**: a failing object leaves its slot empty; the batch goes on
//! - **Connection pooling**: pipelined byte-range fetches over pre-connected HTTP clients
//!
//! ## Architecture
//!
//! - [`io`] - Range fetch trait with S3 and plain-HTTP clients
//! - [`mod@format`] - TIFF header and first-directory parser
//! - [`tile`] - Tile addressing, sample types and deflate decoding
//! - [`pool`] - Worker pool, resource pool and staged pipeline
//! - [`reader`] - Batch header/tile reader and range fetcher
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use ndarray::Array3;
//! use s3_tile_reader::{S3ClientFactory, TileIndex, TileReader};
//!
//! let locations = ["s3://bucket/a.tif", "s3://bucket/b.tif"];
//! let reader = TileReader::with_workers(S3ClientFactory::new("ap-southeast-2"), 8, 4096)?;
//! reader.warmup()?;
//!
//! let mut pixels = Array3::<u16>::zeros((locations.len(), 512, 512));
//! let stats = reader.read_tile_batch(&locations, TileIndex::Linear(0), &mut pixels)?;
//! println!("{} of {} tiles read", stats.succeeded(), locations.len());
//! # Ok::<(), s3_tile_reader::ReaderError>(())
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod pool;
pub mod reader;
pub mod tile;

// Re-export commonly used types
pub use config::{Backend, ByteRange, Cli, Command, ReaderConfig};
pub use error::{FetchError, FormatError, PoolError, ReaderError, TileError, WorkerPanic};
pub use format::{parse_header, ByteOrder, Header, Info, Tag, TagValue};
pub use io::{
    ClientFactory, HttpClientFactory, HttpRangeClient, Location, RangeFetch, S3ClientFactory,
    S3RangeClient,
};
pub use pool::{run_staged, Checkout, ResourcePool, StreamPool};
pub use reader::{
    batch_array, FetchedRange, HttpRangeFetcher, RangeRequest, TileReader, WorkerContext,
};
pub use tile::{
    read_tile, read_tile_bytes, BatchStats, DecodedTile, RawTile, Sample, SampleType, TileIndex,
    TileStats, DEFAULT_PROBE_SIZE,
};
