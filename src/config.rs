//! Configuration for the tile reader and its command-line front end.
//!
//! This module provides:
//! - Command-line arguments via clap, one subcommand per operation
//! - Environment variables with the `S3TR_` prefix for the shared reader options
//! - Defaults for every optional setting
//!
//! # Environment Variables
//!
//! - `S3TR_WORKERS` - Worker threads (default: 8)
//! - `S3TR_REGION` - AWS region (default: ap-southeast-2)
//! - `S3TR_ENDPOINT` - Custom endpoint for S3-compatible services
//! - `S3TR_PROBE_SIZE` - Header bytes fetched per object (default: 4096)
//! - `S3TR_NO_TLS` - Use plain HTTP (default: false)
//! - `S3TR_BACKEND` - `s3` (signed SDK requests) or `http` (anonymous GETs)
//! - `S3TR_HTTP_TIMEOUT` - Per-request timeout in seconds for the http backend (default: 30)

use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::tile::{SampleType, TileIndex, DEFAULT_PROBE_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 8;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "ap-southeast-2";

/// Default per-request timeout of the http backend, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default number of pooled connections for `ranges`.
pub const DEFAULT_CONNECTIONS: usize = 16;

/// Smallest probe that can hold the TIFF preamble.
const MIN_PROBE_SIZE: usize = 8;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Parallel tile reads from cloud-optimized GeoTIFFs in S3.
#[derive(Parser, Debug, Clone)]
#[command(name = "s3-tile-reader")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Parse the header of every object and print it as JSON.
    Headers(HeadersConfig),

    /// Read the same tile from every object into one array.
    Tile(TileConfig),

    /// Fetch byte ranges through a pool of pre-connected HTTP clients.
    Ranges(RangesConfig),
}

/// Storage backend used by reader workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// aws-sdk-s3 with the default credential chain
    S3,
    /// Unsigned HTTP range requests
    Http,
}

/// Options shared by every reader subcommand.
#[derive(Args, Debug, Clone)]
pub struct ReaderConfig {
    /// Number of worker threads.
    #[arg(short = 'j', long, default_value_t = DEFAULT_WORKERS, env = "S3TR_WORKERS")]
    pub workers: usize,

    /// AWS region.
    #[arg(long, default_value = DEFAULT_REGION, env = "S3TR_REGION")]
    pub region: String,

    /// Custom endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "S3TR_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Bytes fetched from the start of each object to parse its header.
    #[arg(long, default_value_t = DEFAULT_PROBE_SIZE, env = "S3TR_PROBE_SIZE")]
    pub probe_size: usize,

    /// Use plain HTTP instead of HTTPS.
    #[arg(long, default_value_t = false, env = "S3TR_NO_TLS")]
    pub no_tls: bool,

    /// Storage backend.
    #[arg(long, value_enum, default_value_t = Backend::S3, env = "S3TR_BACKEND")]
    pub backend: Backend,

    /// Per-request timeout of the http backend, in seconds.
    #[arg(long, default_value_t = DEFAULT_HTTP_TIMEOUT_SECS, env = "S3TR_HTTP_TIMEOUT")]
    pub http_timeout: u64,
}

impl ReaderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be greater than 0".to_string());
        }

        if self.probe_size < MIN_PROBE_SIZE {
            return Err(format!(
                "probe_size must be at least {} bytes to hold the TIFF header",
                MIN_PROBE_SIZE
            ));
        }

        if self.region.is_empty() {
            return Err("region must not be empty. Set --region or S3TR_REGION".to_string());
        }

        if let Some(ref endpoint) = self.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| format!("Invalid endpoint '{}': {}", endpoint, e))?;
        }

        if self.http_timeout == 0 {
            return Err("http_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn use_tls(&self) -> bool {
        !self.no_tls
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}

/// Arguments of the `headers` subcommand.
#[derive(Args, Debug, Clone)]
pub struct HeadersConfig {
    #[command(flatten)]
    pub reader: ReaderConfig,

    /// Objects to read, as s3://bucket/key or bucket/key.
    #[arg(required = true)]
    pub locations: Vec<String>,
}

/// Arguments of the `tile` subcommand.
#[derive(Args, Debug, Clone)]
pub struct TileConfig {
    #[command(flatten)]
    pub reader: ReaderConfig,

    /// Tile to read: a linear index N or ROW,COL.
    #[arg(short, long, default_value = "0")]
    pub tile: TileIndex,

    /// Pixel type; inferred from the first object's header when omitted.
    #[arg(long, value_enum)]
    pub dtype: Option<SampleType>,

    /// Objects to read, as s3://bucket/key or bucket/key.
    #[arg(required = true)]
    pub locations: Vec<String>,
}

impl TileConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.reader.validate()
    }
}

/// Arguments of the `ranges` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RangesConfig {
    #[command(flatten)]
    pub reader: ReaderConfig,

    /// Number of pooled HTTP connections.
    #[arg(long, default_value_t = DEFAULT_CONNECTIONS, env = "S3TR_CONNECTIONS")]
    pub connections: usize,

    /// Object to read from, as s3://bucket/key or bucket/key.
    pub location: String,

    /// Byte ranges as START-STOP (STOP exclusive).
    #[arg(required = true)]
    pub ranges: Vec<ByteRange>,
}

impl RangesConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.reader.validate()?;
        if self.connections == 0 {
            return Err("connections must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Half-open byte range given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub stop: u64,
}

impl FromStr for ByteRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid range '{}': expected START-STOP", s);
        let (start, stop) = s.split_once('-').ok_or_else(invalid)?;
        let start = start.trim().parse::<u64>().map_err(|_| invalid())?;
        let stop = stop.trim().parse::<u64>().map_err(|_| invalid())?;
        if start > stop {
            return Err(format!("invalid range '{}': start is past stop", s));
        }
        Ok(Self { start, stop })
    }
}

// =============================================================================
// Tests
// =============================================================================
