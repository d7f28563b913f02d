//! Batch readers built on the worker pool.
//!
//! - [`TileReader`] reads headers and tiles from many objects, one storage
//!   client per worker
//! - [`HttpRangeFetcher`] fetches arbitrary byte ranges through a fixed set of
//!   pre-connected HTTP clients

mod context;
mod range_fetcher;
mod tile_reader;

pub use context::WorkerContext;
pub use range_fetcher::{FetchedRange, HttpRangeFetcher, RangeRequest};
pub use tile_reader::{batch_array, TileReader};
