//! Batch reader integration tests.
//!
//! Tests verify:
//! - Results land in the slot matching their input index, for any worker count
//! - A failing or panicking object leaves only its own slot untouched
//! - Shape checks on the destination array
//! - Warmup creates one client per worker and surfaces connect failures

use ndarray::{s, Array3};

use s3_tile_reader::error::ReaderError;
use s3_tile_reader::{batch_array, SampleType, TileIndex, TileReader};

use super::test_utils::{expected_u16_tile, MemoryFactory, MemoryStore, TiffSpec};

/// Sentinel written into destination arrays before a batch.
const UNTOUCHED: u16 = 0xBEEF;

fn spec() -> TiffSpec {
    TiffSpec::u16(40, 24, 16)
}

fn location(i: usize) -> String {
    format!("s3://rasters/scene_{:03}.tif", i)
}

/// `count` objects with the pattern tiles.
fn scenes(count: usize) -> (MemoryStore, Vec<String>) {
    let file = spec().build_pattern();
    let locations: Vec<String> = (0..count).map(location).collect();
    let store = locations
        .iter()
        .fold(MemoryStore::new(), |store, loc| store.with_object(loc, file.clone()));
    (store, locations)
}

fn reader(factory: MemoryFactory, workers: usize) -> TileReader<MemoryFactory> {
    TileReader::with_workers(factory, workers, spec().header_len()).unwrap()
}

fn destination(count: usize) -> Array3<u16> {
    Array3::from_elem((count, 16, 16), UNTOUCHED)
}

fn is_untouched(dst: &Array3<u16>, index: usize) -> bool {
    dst.slice(s![index, .., ..]).iter().all(|&v| v == UNTOUCHED)
}

// =============================================================================
// Tile Batches
// =============================================================================

#[test]
fn test_batch_fills_every_slab() {
    let (store, locations) = scenes(20);
    let reader = reader(store.into_factory(), 4);
    let mut dst = destination(locations.len());

    let stats = reader
        .read_tile_batch(&locations, TileIndex::Grid { row: 1, col: 1 }, &mut dst)
        .unwrap();

    for i in 0..locations.len() {
        assert_eq!(dst.slice(s![i, .., ..]), expected_u16_tile(4, 16, 16));
    }
    assert_eq!(stats.succeeded(), 20);
    assert_eq!(stats.failed(), 0);
    assert_eq!(stats.params.workers, 4);
    assert_eq!(stats.params.tile_shape, (16, 16));
    assert_eq!(stats.params.sample_type, SampleType::U16);
    assert!(stats.bytes_fetched() > 0);
}

#[test]
fn test_worker_count_does_not_change_output() {
    let (store, locations) = scenes(13);
    let factory = store.into_factory();

    let mut single = destination(locations.len());
    reader(factory.clone(), 1)
        .read_tile_batch(&locations, TileIndex::Linear(2), &mut single)
        .unwrap();

    let mut many = destination(locations.len());
    reader(factory.clone(), 6)
        .read_tile_batch(&locations, TileIndex::Linear(2), &mut many)
        .unwrap();

    assert_eq!(single, many);
    // Two range requests per object per batch
    assert_eq!(factory.store().request_count(), 2 * 2 * 13);
}

#[test]
fn test_failures_isolated() {
    let (store, mut locations) = scenes(6);
    let store = store
        .with_object("s3://rasters/garbage.tif", vec![0u8; 512])
        .with_panic("s3://rasters/cursed.tif");
    locations.insert(1, "s3://rasters/missing.tif".to_string());
    locations.insert(3, "s3://rasters/garbage.tif".to_string());
    locations.insert(5, "s3://rasters/cursed.tif".to_string());

    let reader = reader(store.into_factory(), 3);
    let mut dst = destination(locations.len());
    let stats = reader
        .read_tile_batch(&locations, TileIndex::Linear(0), &mut dst)
        .unwrap();

    for (i, slot) in stats.stats.iter().enumerate() {
        if [1, 3, 5].contains(&i) {
            assert!(slot.is_none(), "slot {} should have failed", i);
            assert!(is_untouched(&dst, i));
        } else {
            assert!(slot.is_some(), "slot {} should have succeeded", i);
            assert_eq!(dst.slice(s![i, .., ..]), expected_u16_tile(0, 16, 16));
        }
    }
    assert_eq!(stats.failed(), 3);

    // The pool survives the panic
    let mut again = destination(1);
    reader
        .read_tile_batch(&locations[..1], TileIndex::Linear(0), &mut again)
        .unwrap();
    assert_eq!(again.slice(s![0, .., ..]), expected_u16_tile(0, 16, 16));
}

#[test]
fn test_unsupported_predictor_writes_nothing() {
    let file = spec().with_predictor(2).build_pattern();
    let locations: Vec<String> = (0..4).map(location).collect();
    let store = locations
        .iter()
        .fold(MemoryStore::new(), |store, loc| store.with_object(loc, file.clone()));

    let reader = reader(store.into_factory(), 2);
    let mut dst = destination(4);
    let stats = reader
        .read_tile_batch(&locations, TileIndex::Linear(0), &mut dst)
        .unwrap();

    assert_eq!(stats.succeeded(), 0);
    assert!(dst.iter().all(|&v| v == UNTOUCHED));
}

#[test]
fn test_batch_count_mismatch_checked_first() {
    let (store, locations) = scenes(3);
    let factory = store.into_factory();
    let reader = reader(factory.clone(), 2);

    let mut dst = destination(2);
    let err = reader
        .read_tile_batch(&locations, TileIndex::Linear(0), &mut dst)
        .unwrap_err();

    match err {
        ReaderError::SizeMismatch { expected, actual } => {
            assert_eq!(expected, vec![3, 16, 16]);
            assert_eq!(actual, vec![2, 16, 16]);
        }
        other => panic!("expected size mismatch, got {:?}", other),
    }
    assert_eq!(factory.store().request_count(), 0);
}

#[test]
fn test_tile_shape_mismatch_reported_after_batch() {
    let (store, mut locations) = scenes(3);
    let small = TiffSpec::u16(16, 16, 8);
    // Every object must be at least as long as the probe
    let store = store.with_object("s3://rasters/small.tif", {
        let mut file = small.build_pattern();
        file.resize(file.len().max(spec().header_len()), 0);
        file
    });
    locations.push("s3://rasters/small.tif".to_string());

    let reader = reader(store.into_factory(), 2);
    let mut dst = destination(locations.len());
    let err = reader
        .read_tile_batch(&locations, TileIndex::Linear(0), &mut dst)
        .unwrap_err();

    assert!(matches!(err, ReaderError::SizeMismatch { .. }));
    for i in 0..3 {
        assert_eq!(dst.slice(s![i, .., ..]), expected_u16_tile(0, 16, 16));
    }
    assert!(is_untouched(&dst, 3));
}

#[test]
fn test_empty_batch() {
    let reader = reader(MemoryStore::new().into_factory(), 2);
    let mut dst = destination(0);
    let locations: Vec<String> = Vec::new();

    let stats = reader
        .read_tile_batch(&locations, TileIndex::Linear(0), &mut dst)
        .unwrap();
    assert!(stats.stats.is_empty());
}

#[test]
fn test_batch_array_allocation() {
    let dst = batch_array::<f32>(3, (4, 5)).unwrap();
    assert_eq!(dst.shape(), &[3, 4, 5]);
    assert!(dst.iter().all(|&v| v == 0.0));

    // Element count overflows
    let err = batch_array::<u16>(usize::MAX, (2, 2)).unwrap_err();
    assert!(matches!(err, ReaderError::BatchTooLarge { .. }));

    // Element count fits, byte size does not
    let err = batch_array::<u64>(1, (1 << 31, 1 << 31)).unwrap_err();
    assert!(matches!(
        err,
        ReaderError::BatchTooLarge {
            count: 1,
            rows: 2147483648,
            ..
        }
    ));
}

// =============================================================================
// Headers
// =============================================================================

#[test]
fn test_read_headers_in_input_order() {
    let (store, mut locations) = scenes(5);
    locations.insert(2, "rasters/nowhere.tif".to_string());
    let reader = reader(store.into_factory(), 3);

    let headers = reader.read_headers(&locations).unwrap();

    assert_eq!(headers.len(), 6);
    assert!(headers[2].is_none());
    for (i, header) in headers.iter().enumerate() {
        if i != 2 {
            let info = &header.as_ref().unwrap().info;
            assert_eq!(info.tile_count(), Some(6));
        }
    }
}

// =============================================================================
// Warmup
// =============================================================================

#[test]
fn test_warmup_connects_each_worker_once() {
    let (store, locations) = scenes(8);
    let factory = store.into_factory();
    let reader = reader(factory.clone(), 4);

    reader.warmup().unwrap();
    assert_eq!(factory.store().connect_count(), 4);

    let mut dst = destination(locations.len());
    reader
        .read_tile_batch(&locations, TileIndex::Linear(0), &mut dst)
        .unwrap();
    reader.warmup().unwrap();
    assert_eq!(factory.store().connect_count(), 4);
}

#[test]
fn test_clients_created_lazily() {
    let (store, locations) = scenes(1);
    let factory = store.into_factory();
    let reader = reader(factory.clone(), 3);
    assert_eq!(factory.store().connect_count(), 0);

    reader.read_headers(&locations).unwrap();
    assert_eq!(factory.store().connect_count(), 1);
}

#[test]
fn test_warmup_failure() {
    let reader = reader(MemoryStore::new().failing_connect().into_factory(), 2);

    let err = reader.warmup().unwrap_err();
    assert!(matches!(err, ReaderError::Warmup { .. }));
}

#[test]
fn test_connect_failure_is_per_item_without_warmup() {
    let (store, locations) = scenes(3);
    let reader = reader(store.failing_connect().into_factory(), 2);

    let mut dst = destination(3);
    let stats = reader
        .read_tile_batch(&locations, TileIndex::Linear(0), &mut dst)
        .unwrap();
    assert_eq!(stats.failed(), 3);
}

#[test]
fn test_zero_workers_rejected() {
    let result = TileReader::with_workers(MemoryStore::new().into_factory(), 0, 64);
    assert!(matches!(result, Err(ReaderError::Pool(_))));
}
