use std::sync::Arc;

use tracing::debug;

use crate::error::FetchError;
use crate::io::ClientFactory;

/// Private state of one reader worker.
///
/// The storage client is created on first use and then reused for every
/// request the worker makes. It never leaves the worker's thread.
pub struct WorkerContext<F: ClientFactory> {
    worker: usize,
    factory: Arc<F>,
    client: Option<F::Client>,
}

impl<F: ClientFactory> WorkerContext<F> {
    pub fn new(worker: usize, factory: Arc<F>) -> Self {
        Self {
            worker,
            factory,
            client: None,
        }
    }

    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Whether the client has been created yet.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// This worker's client, creating it on first call.
    ///
    /// A failed creation leaves the context empty, so the next call retries.
    pub fn client(&mut self) -> Result<&F::Client, FetchError> {
        let client = match self.client.take() {
            Some(client) => client,
            None => {
                debug!(worker = self.worker, "creating storage client");
                self.factory.connect()?
            }
        };
        Ok(self.client.insert(client))
    }
}
