use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio::runtime::Runtime;
use tracing::debug;

use super::range_reader::{check_body_len, range_header, ClientFactory, Location, RangeFetch};
use crate::error::FetchError;

/// S3-backed implementation of [`RangeFetch`].
///
/// Reads byte ranges from objects in S3 or S3-compatible storage (MinIO, etc.)
/// with ranged `GetObject` calls. The client owns a current-thread tokio
/// runtime, so every call blocks the worker thread that owns the client and
/// connections stay bound to that worker.
pub struct S3RangeClient {
    runtime: Runtime,
    client: Client,
}

impl S3RangeClient {
    /// Wrap an existing runtime and client.
    pub fn new(runtime: Runtime, client: Client) -> Self {
        Self { runtime, client }
    }

    /// Get the underlying SDK client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn get_range(&self, location: &str, start: u64, stop: u64) -> Result<Bytes, FetchError> {
        let loc = Location::parse(location)?;
        let Some(range) = range_header(start, stop)? else {
            return Ok(Bytes::new());
        };

        debug!(%loc, start, stop, "s3 range read");

        let resp = self
            .client
            .get_object()
            .bucket(&loc.container)
            .key(&loc.key)
            .range(range)
            .send()
            .await
            .map_err(|e| {
                let is_not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                let status = e.raw_response().map(|r| r.status().as_u16());

                match status {
                    _ if is_not_found => FetchError::NotFound(loc.to_string()),
                    Some(404) => FetchError::NotFound(loc.to_string()),
                    // Range starts at or past the end of the object
                    Some(416) => FetchError::ShortRead {
                        location: loc.to_string(),
                        expected: stop - start,
                        actual: 0,
                    },
                    _ => FetchError::Transport(DisplayErrorContext(&e).to_string()),
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?
            .into_bytes();

        check_body_len(location, start, stop, &data)?;
        Ok(data)
    }
}

impl RangeFetch for S3RangeClient {
    fn fetch_range(&self, location: &str, start: u64, stop: u64) -> Result<Bytes, FetchError> {
        self.runtime.block_on(self.get_range(location, start, stop))
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Creates one [`S3RangeClient`] per worker.
#[derive(Debug, Clone)]
pub struct S3ClientFactory {
    region: String,
    endpoint: Option<String>,
    use_tls: bool,
}

impl S3ClientFactory {
    /// Create a factory for the given region, using the default AWS endpoint.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
            use_tls: true,
        }
    }

    /// Use a custom endpoint (S3-compatible services such as MinIO).
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Enable or disable TLS for the default AWS endpoint.
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Endpoint handed to the SDK, if any.
    ///
    /// An explicit endpoint wins. Without one, disabling TLS points the SDK at
    /// the plain-HTTP regional endpoint.
    pub fn resolved_endpoint(&self) -> Option<String> {
        match (&self.endpoint, self.use_tls) {
            (Some(endpoint), _) => Some(endpoint.clone()),
            (None, true) => None,
            (None, false) => Some(format!("http://s3.{}.amazonaws.com", self.region)),
        }
    }
}

impl ClientFactory for S3ClientFactory {
    type Client = S3RangeClient;

    fn connect(&self) -> Result<Self::Client, FetchError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FetchError::Runtime(e.to_string()))?;

        let endpoint = self.resolved_endpoint();
        let client = runtime.block_on(create_s3_client(
            endpoint.as_deref(),
            &self.region,
            self.endpoint.is_some(),
        ));

        Ok(S3RangeClient::new(runtime, client))
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO, which also
/// need path-style addressing:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1", true).await;
/// ```
///
/// For AWS S3, pass `None` to use the default endpoint:
/// ```ignore
/// let client = create_s3_client(None, "ap-southeast-2", false).await;
/// ```
pub async fn create_s3_client(
    endpoint_url: Option<&str>,
    region: &str,
    force_path_style: bool,
) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(force_path_style)
        .build();

    Client::from_conf(s3_config)
}
