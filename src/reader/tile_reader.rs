//! Batch reads of headers and tiles across many objects.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use ndarray::{Array3, Axis};
use tracing::{info, warn};

use crate::config::ReaderConfig;
use crate::error::{ReaderError, TileError};
use crate::format::tiff::{parse_header, Header};
use crate::io::{ClientFactory, RangeFetch};
use crate::pool::StreamPool;
use crate::tile::{
    read_tile, BatchParams, BatchStats, DecodedTile, Sample, TileIndex, TileStats,
};

use super::context::WorkerContext;

/// Reads headers and tiles from many objects in parallel.
///
/// Each worker owns one storage client made by the factory. Batch calls
/// return one slot per input location, in input order; a location that fails
/// leaves its slot empty and is logged, without affecting the others.
pub struct TileReader<F: ClientFactory> {
    pool: StreamPool<WorkerContext<F>>,
    probe_size: usize,
}

impl<F: ClientFactory> TileReader<F> {
    /// Start the worker threads. Clients are created lazily or by [`warmup`](Self::warmup).
    pub fn new(factory: F, config: &ReaderConfig) -> Result<Self, ReaderError> {
        Self::with_workers(factory, config.workers, config.probe_size)
    }

    pub fn with_workers(
        factory: F,
        workers: usize,
        probe_size: usize,
    ) -> Result<Self, ReaderError> {
        let factory = Arc::new(factory);
        let pool = StreamPool::new(workers, move |worker| {
            Ok::<_, Infallible>(WorkerContext::new(worker, Arc::clone(&factory)))
        })?;

        Ok(Self { pool, probe_size })
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    pub fn probe_size(&self) -> usize {
        self.probe_size
    }

    /// Create every worker's storage client now.
    ///
    /// Credential and connection problems surface here instead of as
    /// per-item failures in the first batch.
    pub fn warmup(&self) -> Result<(), ReaderError> {
        let results = self
            .pool
            .broadcast(|ctx: &mut WorkerContext<F>| ctx.client().map(|_| ()))?;

        for (worker, result) in results.into_iter().enumerate() {
            result.map_err(|source| ReaderError::Warmup { worker, source })?;
        }

        info!(workers = self.workers(), "storage clients ready");
        Ok(())
    }

    /// Fetch and parse the header of every location.
    pub fn read_headers<S: AsRef<str>>(
        &self,
        locations: &[S],
    ) -> Result<Vec<Option<Header>>, ReaderError> {
        let bound = self.pool.bind(
            |ctx: &mut WorkerContext<F>,
             location: String,
             probe_size: &usize|
             -> Result<Header, TileError> {
                let client = ctx.client()?;
                let probe = client.fetch_range(&location, 0, *probe_size as u64)?;
                Ok(parse_header(&probe)?)
            },
        );

        let mut headers: Vec<Option<Header>> = vec![None; locations.len()];
        bound.run(
            owned_items(locations),
            Arc::new(self.probe_size),
            |index, result| match result {
                Ok(header) => headers[index] = Some(header),
                Err(e) => {
                    let location = locations[index].as_ref();
                    warn!(location, error = %e, "header read failed");
                }
            },
        )?;

        Ok(headers)
    }

    /// Read one tile from every location into `dst[index, .., ..]`.
    ///
    /// `dst` must have one slab per location, each shaped like the tile.
    ///
    /// # Errors
    /// - `SizeMismatch` before any work if the first axis of `dst` differs
    ///   from the number of locations
    /// - `SizeMismatch` after the batch if some tile's shape differed from the
    ///   slab shape; that slab is left untouched, every other slab is written
    pub fn read_tile_batch<T: Sample, S: AsRef<str>>(
        &self,
        locations: &[S],
        tile: TileIndex,
        dst: &mut Array3<T>,
    ) -> Result<BatchStats, ReaderError> {
        let started = Instant::now();
        let (count, rows, cols) = dst.dim();
        if count != locations.len() {
            return Err(ReaderError::SizeMismatch {
                expected: vec![locations.len(), rows, cols],
                actual: dst.shape().to_vec(),
            });
        }

        let probe_size = self.probe_size;
        let bound = self.pool.bind(
            move |ctx: &mut WorkerContext<F>,
                  location: String,
                  tile: &TileIndex|
                  -> Result<DecodedTile<T>, TileError> {
                let client = ctx.client()?;
                read_tile::<T, _>(client, &location, *tile, probe_size)
            },
        );

        let mut stats: Vec<Option<TileStats>> = vec![None; count];
        let mut mismatch = None;
        bound.run(owned_items(locations), Arc::new(tile), |index, result| {
            let location = locations[index].as_ref();
            match result {
                Ok(decoded) if decoded.pixels.dim() != (rows, cols) => {
                    warn!(
                        location,
                        shape = ?decoded.pixels.shape(),
                        "tile shape differs from destination"
                    );
                    mismatch.get_or_insert_with(|| ReaderError::SizeMismatch {
                        expected: vec![rows, cols],
                        actual: decoded.pixels.shape().to_vec(),
                    });
                }
                Ok(decoded) => {
                    dst.index_axis_mut(Axis(0), index).assign(&decoded.pixels);
                    stats[index] = Some(decoded.stats);
                }
                Err(e) => warn!(location, error = %e, "tile read failed"),
            }
        })?;

        if let Some(err) = mismatch {
            return Err(err);
        }

        let batch = BatchStats {
            params: BatchParams {
                workers: self.workers(),
                probe_size,
                tile,
                tile_shape: (rows, cols),
                sample_type: T::SAMPLE_TYPE,
            },
            started,
            elapsed: started.elapsed(),
            stats,
        };
        info!(
            tiles = count,
            ok = batch.succeeded(),
            elapsed_ms = batch.elapsed.as_millis() as u64,
            "tile batch finished"
        );
        Ok(batch)
    }
}

/// Zero-filled destination for a batch of `count` tiles of `(rows, cols)`.
///
/// Allocation is fallible, so a corrupt tile shape is reported instead of
/// aborting the process.
pub fn batch_array<T: Sample>(
    count: usize,
    (rows, cols): (usize, usize),
) -> Result<Array3<T>, ReaderError> {
    let too_large = |reason: String| ReaderError::BatchTooLarge {
        count,
        rows,
        cols,
        reason,
    };

    let len = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| too_large("size overflows".to_string()))?;

    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|e| too_large(e.to_string()))?;
    values.resize(len, T::default());

    Array3::from_shape_vec((count, rows, cols), values).map_err(|e| too_large(e.to_string()))
}

/// Work items carry their own copy of the location.
fn owned_items<S: AsRef<str>>(locations: &[S]) -> impl Iterator<Item = (usize, String)> + '_ {
    locations
        .iter()
        .map(|l| l.as_ref().to_string())
        .enumerate()
}
