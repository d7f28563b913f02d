//! Fixed pool of OS threads, each owning a private context.

use std::any::Any;
use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Select, Sender};
use tracing::{debug, info};

use crate::error::{PoolError, WorkerPanic};

/// A unit of work run on one worker against its context.
type Job<C> = Box<dyn FnOnce(&mut C) + Send>;

struct Worker<C> {
    jobs: Option<Sender<Job<C>>>,
    handle: Option<JoinHandle<()>>,
}

struct Inner<C> {
    workers: Vec<Worker<C>>,
}

impl<C> Inner<C> {
    fn dispatch(&self, worker: usize, job: Job<C>) -> Result<(), PoolError> {
        self.workers[worker]
            .jobs
            .as_ref()
            .ok_or(PoolError::Disconnected)?
            .send(job)
            .map_err(|_| PoolError::Disconnected)
    }

    fn shutdown(&mut self) {
        // Closing every control channel first lets the workers exit in parallel
        for worker in &mut self.workers {
            worker.jobs.take();
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl<C> Drop for Inner<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A fixed set of worker threads with per-worker context `C`.
///
/// Each worker builds its context once at startup and keeps it until the
/// pool is dropped; every job a worker runs gets `&mut` access to it. The
/// context never leaves its thread, so it needs no synchronization.
///
/// Jobs on one worker run in submission order. Do not call back into the
/// pool from inside a job: the calling worker would wait on itself.
pub struct StreamPool<C> {
    inner: Arc<Inner<C>>,
}

impl<C: 'static> StreamPool<C> {
    /// Start `size` workers, building each context with `init(worker_id)`.
    ///
    /// # Errors
    /// Fails with `NoWorkers` if `size` is zero, `Spawn` if a thread could not
    /// be started, or `WorkerInit` if any `init` call failed or panicked.
    /// Workers that did start are shut down before returning.
    pub fn new<F, E>(size: usize, init: F) -> Result<Self, PoolError>
    where
        F: Fn(usize) -> Result<C, E> + Send + Sync + 'static,
        E: Display,
    {
        if size == 0 {
            return Err(PoolError::NoWorkers);
        }

        let init = Arc::new(init);
        let (ready_tx, ready_rx) = bounded::<Result<(), (usize, String)>>(size);
        let mut inner = Inner {
            workers: Vec::with_capacity(size),
        };

        for id in 0..size {
            let (jobs_tx, jobs_rx) = unbounded::<Job<C>>();
            let init = Arc::clone(&init);
            let ready = ready_tx.clone();

            let handle = thread::Builder::new()
                .name(format!("s3tr-worker-{}", id))
                .spawn(move || worker_main(id, init.as_ref(), ready, jobs_rx))
                .map_err(|e| PoolError::Spawn(e.to_string()))?;

            inner.workers.push(Worker {
                jobs: Some(jobs_tx),
                handle: Some(handle),
            });
        }
        drop(ready_tx);

        let mut first_error = None;
        for _ in 0..size {
            match ready_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err((worker, message))) => {
                    first_error.get_or_insert(PoolError::WorkerInit { worker, message });
                }
                Err(_) => {
                    first_error.get_or_insert(PoolError::Disconnected);
                    break;
                }
            }
        }

        if let Some(err) = first_error {
            // Dropping `inner` joins the workers that did start
            return Err(err);
        }

        info!(workers = size, "worker pool started");
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.inner.workers.len()
    }

    /// Run `f` exactly once on every worker and collect the results in
    /// worker order.
    ///
    /// # Errors
    /// Fails with `WorkerPanicked` if `f` panicked on any worker, or
    /// `Disconnected` if a worker is gone.
    pub fn broadcast<T, F>(&self, f: F) -> Result<Vec<T>, PoolError>
    where
        F: Fn(&mut C) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        let size = self.size();
        let f = Arc::new(f);
        let (tx, rx) = unbounded::<(usize, thread::Result<T>)>();

        for worker in 0..size {
            let f = Arc::clone(&f);
            let tx = tx.clone();
            self.inner.dispatch(
                worker,
                Box::new(move |ctx: &mut C| {
                    let result = catch_unwind(AssertUnwindSafe(|| f(ctx)));
                    let _ = tx.send((worker, result));
                }),
            )?;
        }
        drop(tx);

        let mut slots: Vec<Option<T>> = (0..size).map(|_| None).collect();
        for _ in 0..size {
            let (worker, result) = rx.recv().map_err(|_| PoolError::Disconnected)?;
            match result {
                Ok(value) => slots[worker] = Some(value),
                Err(payload) => {
                    return Err(PoolError::WorkerPanicked(WorkerPanic {
                        index: worker,
                        message: panic_message(payload.as_ref()),
                    }));
                }
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or(PoolError::Disconnected))
            .collect()
    }

    /// Bind a per-item function, producing a reusable batch runner.
    ///
    /// `f` runs on whichever worker pulls the item, with that worker's context.
    pub fn bind<F>(&self, f: F) -> Bound<C, F> {
        Bound {
            inner: Arc::clone(&self.inner),
            f: Arc::new(f),
            queue_capacity: 2 * self.size(),
        }
    }
}

fn worker_main<C, F, E>(
    id: usize,
    init: &F,
    ready: Sender<Result<(), (usize, String)>>,
    jobs: Receiver<Job<C>>,
) where
    F: Fn(usize) -> Result<C, E>,
    E: Display,
{
    let mut ctx = match catch_unwind(AssertUnwindSafe(|| init(id))) {
        Ok(Ok(ctx)) => ctx,
        Ok(Err(e)) => {
            let _ = ready.send(Err((id, e.to_string())));
            return;
        }
        Err(payload) => {
            let _ = ready.send(Err((id, panic_message(payload.as_ref()))));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    drop(ready);

    debug!(worker = id, "worker ready");
    for job in jobs.iter() {
        job(&mut ctx);
    }
    debug!(worker = id, "worker exiting");
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// Bound
// =============================================================================

/// What a worker reports back during a batch.
enum Event<R, E> {
    Done(usize, Result<R, E>),
    Finished,
}

/// A per-item function bound to a pool.
///
/// Cheap to clone; clones share the pool and the function.
pub struct Bound<C, F> {
    inner: Arc<Inner<C>>,
    f: Arc<F>,
    queue_capacity: usize,
}

impl<C, F> Clone for Bound<C, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            f: Arc::clone(&self.f),
            queue_capacity: self.queue_capacity,
        }
    }
}

impl<C: 'static, F> Bound<C, F> {
    /// Set how many items may wait in the work queue.
    ///
    /// Feeding blocks once the queue is full, which bounds how far input
    /// consumption can run ahead of the workers.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Process every `(index, item)` and hand each result to `sink`.
    ///
    /// Items are consumed lazily as queue space frees up. `sink` runs on the
    /// calling thread, in completion order, interleaved with feeding. A panic
    /// inside the bound function fails only that item. Returns once the
    /// input is exhausted and every worker has finished its last item.
    pub fn run<I, A, R, E, It, S>(
        &self,
        items: It,
        shared: Arc<A>,
        mut sink: S,
    ) -> Result<(), PoolError>
    where
        F: Fn(&mut C, I, &A) -> Result<R, E> + Send + Sync + 'static,
        It: IntoIterator<Item = (usize, I)>,
        S: FnMut(usize, Result<R, E>),
        I: Send + 'static,
        A: Send + Sync + 'static,
        R: Send + 'static,
        E: From<WorkerPanic> + Send + 'static,
    {
        let size = self.inner.workers.len();
        let (item_tx, item_rx) = bounded::<(usize, I)>(self.queue_capacity);
        let (event_tx, event_rx) = unbounded::<Event<R, E>>();

        for worker in 0..size {
            let items = item_rx.clone();
            let events = event_tx.clone();
            let f = Arc::clone(&self.f);
            let shared = Arc::clone(&shared);

            self.inner.dispatch(
                worker,
                Box::new(move |ctx: &mut C| {
                    for (index, item) in items.iter() {
                        let result = catch_unwind(AssertUnwindSafe(|| f(ctx, item, shared.as_ref())))
                            .unwrap_or_else(|payload| {
                                Err(E::from(WorkerPanic {
                                    index,
                                    message: panic_message(payload.as_ref()),
                                }))
                            });
                        if events.send(Event::Done(index, result)).is_err() {
                            break;
                        }
                    }
                    let _ = events.send(Event::Finished);
                }),
            )?;
        }
        drop(item_rx);
        drop(event_tx);

        let mut items = items.into_iter();
        let mut pending = items.next();
        let mut item_tx = Some(item_tx);
        let mut finished = 0;

        while finished < size {
            let Some(tx) = item_tx.as_ref() else {
                let event = event_rx.recv().map_err(|_| PoolError::Disconnected)?;
                deliver(event, &mut sink, &mut finished);
                continue;
            };
            let Some(item) = pending.take() else {
                // Input exhausted: closing the queue lets workers finish
                item_tx = None;
                continue;
            };

            let mut sel = Select::new();
            let send_op = sel.send(tx);
            let recv_op = sel.recv(&event_rx);
            let oper = sel.select();

            if oper.index() == send_op {
                oper.send(tx, item).map_err(|_| PoolError::Disconnected)?;
                pending = items.next();
            } else {
                debug_assert_eq!(oper.index(), recv_op);
                pending = Some(item);
                let event = oper.recv(&event_rx).map_err(|_| PoolError::Disconnected)?;
                deliver(event, &mut sink, &mut finished);
            }
        }

        Ok(())
    }
}

fn deliver<R, E>(
    event: Event<R, E>,
    sink: &mut impl FnMut(usize, Result<R, E>),
    finished: &mut usize,
) {
    match event {
        Event::Done(index, result) => sink(index, result),
        Event::Finished => *finished += 1,
    }
}
