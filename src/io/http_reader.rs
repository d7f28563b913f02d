use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::header::RANGE;
use http::StatusCode;
use reqwest::{Client, Request, Response};
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

use super::range_reader::{check_body_len, range_header, ClientFactory, Location, RangeFetch};
use crate::error::FetchError;

/// Default timeout for a single HTTP range request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Threads driving the sockets of every client made by one factory.
pub const HTTP_IO_THREADS: usize = 2;

/// A request on the wire whose response has not been waited for yet.
pub type PendingResponse = JoinHandle<Result<Response, reqwest::Error>>;

/// Plain HTTP(S) implementation of [`RangeFetch`].
///
/// Issues path-style `GET <endpoint>/<container>/<key>` requests with a
/// `Range` header. Works against public buckets and any S3-compatible
/// endpoint that allows anonymous reads.
///
/// Requests run on a multi-threaded runtime shared with the other clients of
/// the same factory, so a request can be started on one thread
/// ([`start`](Self::start)) and waited for on another ([`wait`](Self::wait)).
#[derive(Debug, Clone)]
pub struct HttpRangeClient {
    client: Client,
    endpoint: Url,
    runtime: Arc<Runtime>,
}

impl HttpRangeClient {
    /// Create a client for `endpoint` with the given request timeout.
    pub fn new(
        endpoint: Url,
        timeout: Duration,
        runtime: Arc<Runtime>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            runtime,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Resolve a location to the object URL under this endpoint.
    pub fn object_url(&self, location: &Location) -> Result<Url, FetchError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidLocation(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(&location.container)
            .extend(location.key.split('/'));
        Ok(url)
    }

    /// Build the ranged GET for `[start, stop)`.
    ///
    /// Returns `Ok(None)` for an empty range.
    pub fn build_request(
        &self,
        location: &str,
        start: u64,
        stop: u64,
    ) -> Result<Option<Request>, FetchError> {
        let url = self.object_url(&Location::parse(location)?)?;
        let Some(range) = range_header(start, stop)? else {
            return Ok(None);
        };

        let request = self
            .client
            .get(url)
            .header(RANGE, range)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Some(request))
    }

    /// Put a request on the wire without waiting for the response.
    pub fn start(&self, request: Request) -> PendingResponse {
        debug!(url = %request.url(), "http request started");
        self.runtime.spawn(self.client.execute(request))
    }

    /// Wait for the response headers of a started request.
    pub fn wait(&self, pending: PendingResponse) -> Result<Response, FetchError> {
        self.runtime
            .block_on(pending)
            .map_err(|e| FetchError::Transport(e.to_string()))?
            .map_err(|e| FetchError::Transport(e.to_string()))
    }

    /// Check the status of a ranged response and read its body.
    pub fn read_body(
        &self,
        response: Response,
        location: &str,
        start: u64,
        stop: u64,
    ) -> Result<Bytes, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND => FetchError::NotFound(location.to_string()),
                StatusCode::RANGE_NOT_SATISFIABLE => FetchError::ShortRead {
                    location: location.to_string(),
                    expected: stop - start,
                    actual: 0,
                },
                _ => FetchError::Transport(format!("HTTP {} for {}", status, response.url())),
            });
        }

        let body = self
            .runtime
            .block_on(response.bytes())
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        check_body_len(location, start, stop, &body)?;
        Ok(body)
    }

    /// Open a connection to the endpoint ahead of the first real request.
    pub fn ping(&self) -> Result<(), FetchError> {
        self.runtime
            .block_on(self.client.head(self.endpoint.clone()).send())
            .map(|_| ())
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

impl RangeFetch for HttpRangeClient {
    fn fetch_range(&self, location: &str, start: u64, stop: u64) -> Result<Bytes, FetchError> {
        let Some(request) = self.build_request(location, start, stop)? else {
            return Ok(Bytes::new());
        };

        debug!(url = %request.url(), start, stop, "http range read");

        let response = self.wait(self.start(request))?;
        self.read_body(response, location, start, stop)
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Creates [`HttpRangeClient`]s that share one I/O runtime.
///
/// The runtime is started by the first [`connect`](ClientFactory::connect)
/// and lives until the factory and all of its clients are dropped.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    endpoint: Url,
    timeout: Duration,
    runtime: Arc<Mutex<Option<Arc<Runtime>>>>,
}

impl HttpClientFactory {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_HTTP_TIMEOUT,
            runtime: Arc::default(),
        }
    }

    /// Factory for the regional AWS endpoint, `https` or plain `http`.
    pub fn for_region(region: &str, use_tls: bool) -> Result<Self, FetchError> {
        let scheme = if use_tls { "https" } else { "http" };
        let endpoint = format!("{}://s3.{}.amazonaws.com", scheme, region);
        let endpoint = Url::parse(&endpoint).map_err(|e| FetchError::InvalidLocation(e.to_string()))?;
        Ok(Self::new(endpoint))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn runtime(&self) -> Result<Arc<Runtime>, FetchError> {
        let mut slot = self
            .runtime
            .lock()
            .map_err(|_| FetchError::Runtime("http runtime lock poisoned".to_string()))?;

        if let Some(runtime) = slot.as_ref() {
            return Ok(Arc::clone(runtime));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(HTTP_IO_THREADS)
            .thread_name("http-io")
            .enable_all()
            .build()
            .map_err(|e| FetchError::Runtime(e.to_string()))?;
        let runtime = Arc::new(runtime);
        *slot = Some(Arc::clone(&runtime));
        Ok(runtime)
    }
}

impl ClientFactory for HttpClientFactory {
    type Client = HttpRangeClient;

    fn connect(&self) -> Result<Self::Client, FetchError> {
        HttpRangeClient::new(self.endpoint.clone(), self.timeout, self.runtime()?)
    }
}
