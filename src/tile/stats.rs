//! Timing records for single tiles and whole batches.

use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use super::{SampleType, TileIndex};

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Timings for one successfully decoded tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileStats {
    /// Request start until the header was parsed
    #[serde(serialize_with = "as_secs")]
    pub t_open: Duration,
    /// Request start until the pixels were decoded
    #[serde(serialize_with = "as_secs")]
    pub t_total: Duration,
    /// Compressed bytes fetched for the tile
    pub chunk_size: usize,
    /// When the request started
    #[serde(skip)]
    pub started: Instant,
}

impl TileStats {
    /// Time spent fetching and decoding the tile itself.
    pub fn t_read(&self) -> Duration {
        self.t_total.saturating_sub(self.t_open)
    }
}

/// Parameters a batch was run with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchParams {
    pub workers: usize,
    pub probe_size: usize,
    pub tile: TileIndex,
    pub tile_shape: (usize, usize),
    pub sample_type: SampleType,
}

/// Outcome of one batch read.
///
/// `stats` has one slot per input location; failed items are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    pub params: BatchParams,
    #[serde(skip)]
    pub started: Instant,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub stats: Vec<Option<TileStats>>,
}

impl BatchStats {
    /// Number of tiles that were read and written.
    pub fn succeeded(&self) -> usize {
        self.stats.iter().filter(|s| s.is_some()).count()
    }

    /// Number of items that failed.
    pub fn failed(&self) -> usize {
        self.stats.len() - self.succeeded()
    }

    /// Total compressed bytes fetched across the batch.
    pub fn bytes_fetched(&self) -> usize {
        self.stats.iter().flatten().map(|s| s.chunk_size).sum()
    }
}
