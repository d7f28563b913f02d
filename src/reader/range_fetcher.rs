//! Pipelined byte-range fetches over a pool of pre-connected HTTP clients.
//!
//! ```text
//!  caller thread                         workers
//!  ─────────────                         ───────
//!  checkout connection ─┐
//!  send ranged GET      ├─▶ [queue] ──▶ wait for headers (t1)
//!  (blocks when all     │               read body (t2), return connection
//!   connections busy) ──┘               check status + length ──▶ sink
//! ```
//!
//! Requests go on the wire as soon as a connection is free, so up to
//! `n_connections` are in flight while the workers drain responses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{FetchError, ReaderError};
use crate::io::{ClientFactory, HttpClientFactory, HttpRangeClient, PendingResponse};
use crate::pool::{run_staged, ResourcePool, StreamPool};

/// One half-open byte range of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeRequest {
    pub location: String,
    pub start: u64,
    pub stop: u64,
}

impl RangeRequest {
    pub fn new(location: impl Into<String>, start: u64, stop: u64) -> Self {
        Self {
            location: location.into(),
            start,
            stop,
        }
    }

    pub fn len(&self) -> u64 {
        self.stop.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A completed range read with its timings.
#[derive(Debug, Clone, Serialize)]
pub struct FetchedRange {
    pub request: RangeRequest,
    #[serde(skip)]
    pub data: Bytes,
    /// When the request was issued
    #[serde(skip)]
    pub t0: Instant,
    /// Issue until response headers arrived
    #[serde(serialize_with = "as_secs")]
    pub t1: Duration,
    /// Issue until the body was read
    #[serde(serialize_with = "as_secs")]
    pub t2: Duration,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// A request sent from the calling thread, waiting for a worker.
struct InFlight {
    request: RangeRequest,
    /// `None` for an empty range
    pending: Option<PendingResponse>,
    t0: Instant,
}

/// Fetches many byte ranges with bounded concurrency.
///
/// Holds `n_connections` HTTP clients and `n_workers` threads. At most
/// `n_connections` requests are in flight; each worker reads one response
/// at a time.
pub struct HttpRangeFetcher {
    pool: StreamPool<()>,
    connections: Arc<ResourcePool<HttpRangeClient>>,
}

impl HttpRangeFetcher {
    pub fn new(
        factory: &HttpClientFactory,
        n_connections: usize,
        n_workers: usize,
    ) -> Result<Self, ReaderError> {
        if n_connections == 0 {
            return Err(ReaderError::NoConnections);
        }

        let clients = (0..n_connections)
            .map(|connection| {
                factory
                    .connect()
                    .map_err(|source| ReaderError::Connect { connection, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pool = StreamPool::new(n_workers, |_| Ok::<_, std::convert::Infallible>(()))?;

        Ok(Self {
            pool,
            connections: Arc::new(ResourcePool::new(clients)),
        })
    }

    pub fn connections(&self) -> usize {
        self.connections.capacity()
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Open a connection on every pooled client ahead of the first fetch.
    ///
    /// Returns how many clients connected. Failures are logged, not fatal:
    /// a client that could not connect will try again on its first request.
    pub fn connect(&self) -> usize {
        // Hold every client so each one gets pinged exactly once
        let clients: Vec<_> = (0..self.connections.capacity())
            .map(|_| self.connections.checkout())
            .collect();

        let connected = clients
            .iter()
            .enumerate()
            .filter(|(i, client)| match client.ping() {
                Ok(()) => true,
                Err(e) => {
                    warn!(connection = i, error = %e, "connection warmup failed");
                    false
                }
            })
            .count();

        info!(connected, total = clients.len(), "http connections ready");
        connected
    }

    /// Fetch every `(index, request)` and hand each result to `sink`.
    ///
    /// `sink` runs on the calling thread in completion order and is called
    /// exactly once per request.
    pub fn fetch<I, S>(&self, requests: I, sink: S) -> Result<(), ReaderError>
    where
        I: IntoIterator<Item = (usize, RangeRequest)>,
        S: FnMut(usize, Result<FetchedRange, FetchError>),
    {
        run_staged(
            &self.pool,
            &self.connections,
            requests,
            |client: &mut HttpRangeClient, request: RangeRequest| {
                let t0 = Instant::now();
                let pending = client
                    .build_request(&request.location, request.start, request.stop)?
                    .map(|http| client.start(http));
                Ok(InFlight {
                    request,
                    pending,
                    t0,
                })
            },
            |_: &mut (), client: &mut HttpRangeClient, in_flight: InFlight| {
                let InFlight {
                    request,
                    pending,
                    t0,
                } = in_flight;
                let Some(pending) = pending else {
                    let elapsed = t0.elapsed();
                    return Ok(FetchedRange {
                        request,
                        data: Bytes::new(),
                        t0,
                        t1: elapsed,
                        t2: elapsed,
                    });
                };

                let response = client.wait(pending)?;
                let t1 = t0.elapsed();
                let data =
                    client.read_body(response, &request.location, request.start, request.stop)?;
                let t2 = t0.elapsed();

                debug!(
                    location = %request.location,
                    start = request.start,
                    stop = request.stop,
                    t1_ms = t1.as_millis() as u64,
                    t2_ms = t2.as_millis() as u64,
                    "range fetched"
                );

                Ok(FetchedRange {
                    request,
                    data,
                    t0,
                    t1,
                    t2,
                })
            },
            sink,
        )?;

        Ok(())
    }

    /// Fetch every request and collect the results in input order.
    pub fn fetch_all(
        &self,
        requests: Vec<RangeRequest>,
    ) -> Result<Vec<Result<FetchedRange, FetchError>>, ReaderError> {
        let mut results: Vec<Option<Result<FetchedRange, FetchError>>> =
            (0..requests.len()).map(|_| None).collect();

        self.fetch(requests.into_iter().enumerate(), |index, result| {
            results[index] = Some(result);
        })?;

        Ok(results
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(FetchError::Transport("no result".to_string()))))
            .collect())
    }
}
