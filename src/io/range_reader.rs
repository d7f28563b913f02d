use bytes::Bytes;
use url::Url;

use crate::error::FetchError;

/// Blocking byte-range reads against named objects in a remote store.
///
/// A client is created once per worker thread and reused for every request
/// that worker makes, so implementations may hold connection pools,
/// credentials or a private runtime. Calls block the calling thread.
pub trait RangeFetch: Send {
    /// Read the half-open byte range `[start, stop)` of the object at `location`.
    ///
    /// Returns exactly `stop - start` bytes or an error; a range that runs
    /// past the end of the object is a [`FetchError::ShortRead`], never a
    /// truncated result.
    fn fetch_range(&self, location: &str, start: u64, stop: u64) -> Result<Bytes, FetchError>;
}

impl<T: RangeFetch + Sync + ?Sized> RangeFetch for &T {
    fn fetch_range(&self, location: &str, start: u64, stop: u64) -> Result<Bytes, FetchError> {
        (**self).fetch_range(location, start, stop)
    }
}

/// Creates per-worker [`RangeFetch`] clients.
///
/// The factory is shared by all workers; each worker calls [`connect`](Self::connect)
/// at most once and keeps the client in its own context.
pub trait ClientFactory: Send + Sync + 'static {
    type Client: RangeFetch + 'static;

    /// Build a new client. Credential and connection setup happens here.
    fn connect(&self) -> Result<Self::Client, FetchError>;
}

// =============================================================================
// Locations and Ranges
// =============================================================================

const S3_SCHEME_PREFIX: &str = "s3://";

/// An object address split into container (bucket) and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub container: String,
    pub key: String,
}

impl Location {
    /// Parse `s3://<container>/<key>` or a bare `<container>/<key>`.
    ///
    /// The key is kept exactly as written, without percent-decoding.
    pub fn parse(location: &str) -> Result<Self, FetchError> {
        let invalid = || FetchError::InvalidLocation(location.to_string());

        let url: Url;
        let (container, key) = if location.contains("://") {
            url = Url::parse(location).map_err(|_| invalid())?;
            if url.scheme() != "s3"
                || url.port().is_some()
                || !url.username().is_empty()
                || url.password().is_some()
            {
                return Err(invalid());
            }

            let container = url.host_str().unwrap_or_default();
            let prefix = S3_SCHEME_PREFIX.len();
            let key = location
                .get(..prefix)
                .filter(|scheme| scheme.eq_ignore_ascii_case(S3_SCHEME_PREFIX))
                .and_then(|_| location.get(prefix..))
                .and_then(|rest| rest.strip_prefix(container))
                .and_then(|rest| rest.strip_prefix('/'))
                .ok_or_else(invalid)?;
            (container, key)
        } else {
            location.split_once('/').ok_or_else(invalid)?
        };
        let key = key.trim_start_matches('/');

        if container.is_empty() || key.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            container: container.to_string(),
            key: key.to_string(),
        })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.container, self.key)
    }
}

/// Validate a half-open range and build its `Range` header value.
///
/// Returns `Ok(None)` for an empty range, which needs no request at all.
/// HTTP ranges are inclusive on both ends, hence `stop - 1`.
pub fn range_header(start: u64, stop: u64) -> Result<Option<String>, FetchError> {
    if start > stop {
        return Err(FetchError::InvalidRange { start, stop });
    }
    if start == stop {
        return Ok(None);
    }
    Ok(Some(format!("bytes={}-{}", start, stop - 1)))
}

/// Check that a response body covers the whole requested range.
pub fn check_body_len(
    location: &str,
    start: u64,
    stop: u64,
    body: &Bytes,
) -> Result<(), FetchError> {
    let expected = stop - start;
    let actual = body.len() as u64;
    if actual != expected {
        return Err(FetchError::ShortRead {
            location: location.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

// =============================================================================
// Endian Helper Functions
// =============================================================================
//
// TIFF files can be either little-endian or big-endian, determined by the
// marker at the start of the file. These helpers are used by the header parser.

/// Read a little-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Read a big-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a big-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Read a big-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_be(bytes: &[u8]) -> u64 {
    u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}
