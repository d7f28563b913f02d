//! Worker pool integration tests.
//!
//! Tests verify:
//! - Bound functions see the context of the worker that runs them
//! - Resource checkouts block across threads until a resource is returned
//! - The staged pipeline reads real ranges through pooled clients

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;

use s3_tile_reader::error::{FetchError, PoolError};
use s3_tile_reader::io::{ClientFactory, RangeFetch};
use s3_tile_reader::{run_staged, ResourcePool, StreamPool};

use super::test_utils::{MemoryClient, MemoryStore};

#[test]
fn test_results_follow_input_index() {
    let pool = StreamPool::new(4, |id| Ok::<_, String>(id)).unwrap();
    let bound = pool.bind(|worker: &mut usize, item: u64, offset: &u64| {
        Ok::<_, FetchError>((*worker, item + offset))
    });

    let mut seen = vec![None; 200];
    bound
        .run((0..200).map(|i| (i, i as u64)), Arc::new(1000), |i, r| {
            seen[i] = Some(r.unwrap());
        })
        .unwrap();

    for (i, slot) in seen.into_iter().enumerate() {
        let (worker, value) = slot.unwrap();
        assert!(worker < 4);
        assert_eq!(value, 1000 + i as u64);
    }
}

#[test]
fn test_broadcast_reaches_every_context() {
    let pool = StreamPool::new(5, |id| Ok::<_, String>(vec![id])).unwrap();

    pool.broadcast(|ctx: &mut Vec<usize>| ctx.push(99)).unwrap();
    let contexts = pool.broadcast(|ctx: &mut Vec<usize>| ctx.clone()).unwrap();

    for (id, ctx) in contexts.iter().enumerate() {
        assert_eq!(ctx, &vec![id, 99]);
    }
}

#[test]
fn test_init_failure_names_worker() {
    let result = StreamPool::new(3, |id| {
        if id == 2 {
            Err(format!("no credentials on worker {}", id))
        } else {
            Ok(())
        }
    });

    match result {
        Err(PoolError::WorkerInit { worker, message }) => {
            assert_eq!(worker, 2);
            assert!(message.contains("no credentials"));
        }
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("pool should not start"),
    }
}

#[test]
fn test_checkout_blocks_until_returned() {
    let resources = Arc::new(ResourcePool::new(["only"]));
    let held = resources.checkout();
    assert!(resources.try_checkout().is_none());

    let released = Arc::new(AtomicBool::new(false));
    let waiter = {
        let resources = Arc::clone(&resources);
        let released = Arc::clone(&released);
        thread::spawn(move || {
            let got = resources.checkout();
            assert!(released.load(Ordering::SeqCst));
            *got
        })
    };

    thread::sleep(Duration::from_millis(20));
    released.store(true, Ordering::SeqCst);
    drop(held);

    assert_eq!(waiter.join().unwrap(), "only");
    assert_eq!(resources.available(), 1);
}

#[test]
fn test_staged_reads_through_pooled_clients() {
    let data: Vec<u8> = (0..=255).collect();
    let factory = MemoryStore::new()
        .with_object("s3://b/bytes.bin", data.clone())
        .into_factory();
    let clients: Vec<MemoryClient> = (0..3).map(|_| factory.connect().unwrap()).collect();
    let resources = Arc::new(ResourcePool::new(clients));
    let pool = StreamPool::new(2, |_| Ok::<_, String>(())).unwrap();

    let ranges: Vec<(u64, u64)> = (0..32).map(|i| (i * 8, i * 8 + 8)).collect();
    let mut results: Vec<Option<Result<Bytes, FetchError>>> = vec![None; ranges.len()];

    run_staged(
        &pool,
        &resources,
        ranges.iter().copied().enumerate(),
        |_: &mut MemoryClient, (start, stop): (u64, u64)| {
            if start == 64 {
                Err(FetchError::Transport("refused at issue".to_string()))
            } else {
                Ok((start, stop))
            }
        },
        |_: &mut (), client: &mut MemoryClient, (start, stop): (u64, u64)| {
            client.fetch_range("s3://b/bytes.bin", start, stop)
        },
        |i, r| results[i] = Some(r),
    )
    .unwrap();

    for (i, result) in results.into_iter().enumerate() {
        let result = result.unwrap();
        if i == 8 {
            assert!(matches!(result, Err(FetchError::Transport(_))));
        } else {
            assert_eq!(result.unwrap().as_ref(), &data[i * 8..i * 8 + 8]);
        }
    }
    assert_eq!(resources.available(), 3);
    assert_eq!(factory.store().connect_count(), 3);
}
