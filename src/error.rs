use thiserror::Error;

/// Errors that can occur when reading a byte range from remote storage.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Location could not be split into a container and a key
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Requested range is empty or inverted
    #[error("Invalid range: start {start} is past stop {stop}")]
    InvalidRange { start: u64, stop: u64 },

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Error from S3, the HTTP layer or the network
    #[error("Transport error: {0}")]
    Transport(String),

    /// Store returned fewer (or more) bytes than requested
    #[error("Short read from {location}: expected {expected} bytes, got {actual}")]
    ShortRead {
        location: String,
        expected: u64,
        actual: u64,
    },

    /// Per-client runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Worker panicked while completing this request
    #[error(transparent)]
    Panicked(#[from] WorkerPanic),
}

/// Errors that can occur when parsing a TIFF header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Buffer is too small to contain the fixed preamble
    #[error("Buffer too small: need at least {required} bytes, got {actual}")]
    TooShort { required: usize, actual: usize },

    /// Invalid byte order marker (not II or MM)
    #[error("Invalid byte order marker: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidByteOrder(u16),

    /// Invalid TIFF magic number
    #[error("Invalid TIFF magic number: expected 42, got {0}")]
    InvalidMagic(u16),

    /// Directory starts or ends past the end of the buffer
    #[error("Truncated directory at offset {offset}: need {required} bytes, buffer has {actual}")]
    TruncatedDirectory {
        offset: u64,
        required: u64,
        actual: usize,
    },
}

/// Errors that can occur when reading a single tile.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Range read failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Header could not be parsed
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Compression other than deflate
    #[error("Unsupported compression: {0} (only deflate 8 and 32946 are supported)")]
    UnsupportedCompression(u16),

    /// Predictor other than "none"
    #[error("Unsupported predictor: {0} (only predictor 1 is supported)")]
    UnsupportedPredictor(u16),

    /// Required tag is missing from the directory
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag exists but its value lies past the probed header bytes
    #[error("Tag {tag} lies outside the first {probe_size} bytes; increase the probe size")]
    UnresolvedTag { tag: &'static str, probe_size: usize },

    /// Tile index past the end of the tile tables
    #[error("Tile index {index} out of range: image has {count} tiles")]
    TileIndexOutOfRange { index: u64, count: u64 },

    /// Inflate failed
    #[error("Decompression failed: {0}")]
    Decompress(String),

    /// TileLength * TileWidth * bytes per sample overflows
    #[error("Tile of {rows}x{cols} samples of {element_size} bytes is too large")]
    TileTooLarge {
        rows: usize,
        cols: usize,
        element_size: usize,
    },

    /// Inflated tile does not hold TileLength * TileWidth samples
    #[error("Decoded tile has {actual} bytes, expected {expected}")]
    DecodedSizeMismatch { expected: usize, actual: usize },

    /// Worker panicked while processing this tile
    #[error(transparent)]
    Panicked(#[from] WorkerPanic),
}

/// A worker panicked while running a bound function on one item.
#[derive(Debug, Clone, Error)]
#[error("Worker panicked while processing item {index}: {message}")]
pub struct WorkerPanic {
    pub index: usize,
    pub message: String,
}

/// Errors raised by the worker pool itself.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// A pool needs at least one worker
    #[error("Worker pool needs at least one worker")]
    NoWorkers,

    /// OS refused to start a worker thread
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),

    /// Per-worker context construction failed
    #[error("Worker {worker} failed to initialize: {message}")]
    WorkerInit { worker: usize, message: String },

    /// Workers went away while a batch was running
    #[error("Worker pool disconnected")]
    Disconnected,

    /// A broadcast job panicked on one worker
    #[error("Worker {} panicked: {}", .0.index, .0.message)]
    WorkerPanicked(WorkerPanic),
}

/// Errors returned by the batch reader at the call boundary.
#[derive(Debug, Clone, Error)]
pub enum ReaderError {
    /// Worker pool failure
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Creating a per-worker storage client failed
    #[error("Warmup failed on worker {worker}: {source}")]
    Warmup {
        worker: usize,
        #[source]
        source: FetchError,
    },

    /// Creating a pooled HTTP connection failed
    #[error("Failed to create connection {connection}: {source}")]
    Connect {
        connection: usize,
        #[source]
        source: FetchError,
    },

    /// A connection pool needs at least one connection
    #[error("Range fetcher needs at least one connection")]
    NoConnections,

    /// Destination array for a batch cannot be allocated
    #[error("Cannot allocate {count} tiles of {rows}x{cols} samples: {reason}")]
    BatchTooLarge {
        count: usize,
        rows: usize,
        cols: usize,
        reason: String,
    },

    /// Destination array does not match the batch or tile shape
    #[error("Size mismatch: expected shape {expected:?}, got {actual:?}")]
    SizeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}
