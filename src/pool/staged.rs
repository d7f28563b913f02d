//! Two-stage pipeline: issue on the calling thread, complete on the workers.

use std::cell::RefCell;
use std::sync::Arc;

use crate::error::{PoolError, WorkerPanic};

use super::resources::{Checkout, ResourcePool};
use super::workers::StreamPool;

/// Run requests through an issue stage and a completion stage.
///
/// For each `(index, request)`, the calling thread checks a resource out of
/// `resources` (blocking while all are in use) and calls `issue` to start the
/// request, producing an in-flight handle. The handle and the resource then
/// travel through the pool's work queue to a worker, which calls `complete`.
/// The resource is returned as soon as `complete` returns, whatever the
/// outcome, so at most `resources.capacity()` requests are ever in flight.
///
/// Every request yields exactly one `sink(index, result)` call on the calling
/// thread. A failed `issue` is reported straight away and its resource goes
/// back to the pool before the next request is issued.
pub fn run_staged<C, T, Q, H, R, E, Is, Co, S>(
    pool: &StreamPool<C>,
    resources: &Arc<ResourcePool<T>>,
    requests: impl IntoIterator<Item = (usize, Q)>,
    mut issue: Is,
    complete: Co,
    sink: S,
) -> Result<(), PoolError>
where
    C: 'static,
    T: Send + 'static,
    H: Send + 'static,
    R: Send + 'static,
    E: From<WorkerPanic> + Send + 'static,
    Is: FnMut(&mut T, Q) -> Result<H, E>,
    Co: Fn(&mut C, &mut T, H) -> Result<R, E> + Send + Sync + 'static,
    S: FnMut(usize, Result<R, E>),
{
    // Both stages report on this thread, never at the same time
    let sink = RefCell::new(sink);

    let in_flight = requests.into_iter().filter_map(|(index, request)| {
        let mut resource = resources.checkout();
        match issue(&mut *resource, request) {
            Ok(handle) => Some((index, (resource, handle))),
            Err(e) => {
                drop(resource);
                (*sink.borrow_mut())(index, Err(e));
                None
            }
        }
    });

    let stage_two = pool
        .bind(
            move |ctx: &mut C, (mut resource, handle): (Checkout<T>, H), _: &()| {
                let result = complete(ctx, &mut *resource, handle);
                drop(resource);
                result
            },
        )
        .with_queue_capacity(resources.capacity() + pool.size());

    stage_two.run(in_flight, Arc::new(()), |index, result| {
        (*sink.borrow_mut())(index, result)
    })
}
