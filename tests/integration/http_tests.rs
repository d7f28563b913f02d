//! HTTP backend integration tests against a local object server.
//!
//! Tests verify:
//! - Ranged GETs return exactly `stop - start` bytes
//! - 404, 416, short bodies and other statuses map to the right fetch errors
//! - The range fetcher keeps a request on every connection while workers read

use std::time::Duration;

use s3_tile_reader::error::FetchError;
use s3_tile_reader::io::{ClientFactory, RangeFetch};
use s3_tile_reader::{read_tile, HttpClientFactory, HttpRangeFetcher, RangeRequest, TileIndex};

use super::test_utils::{expected_u16_tile, HttpObjectServer, HttpObjects, TiffSpec};

const OBJECT: &str = "rasters/bytes.bin";

fn object() -> Vec<u8> {
    (0..=255).collect()
}

fn server() -> HttpObjectServer {
    HttpObjects::new()
        .with_object(OBJECT, object())
        .with_status("rasters/down.bin", 503)
        .serve()
}

fn factory(server: &HttpObjectServer) -> HttpClientFactory {
    HttpClientFactory::new(server.url()).with_timeout(Duration::from_secs(10))
}

// =============================================================================
// Range Reads
// =============================================================================

#[test]
fn test_exact_ranges() {
    let server = server();
    let client = factory(&server).connect().unwrap();

    let data = client.fetch_range("s3://rasters/bytes.bin", 10, 74).unwrap();
    assert_eq!(data.as_ref(), &object()[10..74]);

    let data = client.fetch_range(OBJECT, 250, 256).unwrap();
    assert_eq!(data.as_ref(), &object()[250..]);
    assert_eq!(server.get_count(), 2);
}

#[test]
fn test_range_running_past_end() {
    let server = server();
    let client = factory(&server).connect().unwrap();

    // Server answers 206 with the 56 bytes that exist
    let err = client.fetch_range(OBJECT, 200, 300).unwrap_err();
    assert!(matches!(
        err,
        FetchError::ShortRead {
            expected: 100,
            actual: 56,
            ..
        }
    ));
}

#[test]
fn test_range_starting_past_end() {
    let server = server();
    let client = factory(&server).connect().unwrap();

    let err = client.fetch_range(OBJECT, 300, 400).unwrap_err();
    assert!(matches!(
        err,
        FetchError::ShortRead {
            expected: 100,
            actual: 0,
            ..
        }
    ));
}

#[test]
fn test_missing_object() {
    let server = server();
    let client = factory(&server).connect().unwrap();

    let err = client.fetch_range("rasters/nowhere.bin", 0, 16).unwrap_err();
    assert!(matches!(err, FetchError::NotFound(ref loc) if loc == "rasters/nowhere.bin"));
}

#[test]
fn test_other_status_is_transport_error() {
    let server = server();
    let client = factory(&server).connect().unwrap();

    match client.fetch_range("rasters/down.bin", 0, 16) {
        Err(FetchError::Transport(message)) => assert!(message.contains("503"), "{}", message),
        other => panic!("expected a transport error, got {:?}", other),
    }
}

#[test]
fn test_tile_over_http() {
    let spec = TiffSpec::u16(40, 24, 16);
    let server = HttpObjects::new()
        .with_object("rasters/scene.tif", spec.build_pattern())
        .serve();
    let client = factory(&server).connect().unwrap();

    let tile = read_tile::<u16, _>(
        &client,
        "s3://rasters/scene.tif",
        TileIndex::Linear(4),
        spec.header_len(),
    )
    .unwrap();
    assert_eq!(tile.pixels, expected_u16_tile(4, 16, 16));
    assert_eq!(server.get_count(), 2);
}

// =============================================================================
// Range Fetcher
// =============================================================================

#[test]
fn test_fetcher_results_in_input_order() {
    let server = server();
    let fetcher = HttpRangeFetcher::new(&factory(&server), 2, 2).unwrap();
    assert_eq!(fetcher.connect(), 2);

    let results = fetcher
        .fetch_all(vec![
            RangeRequest::new(OBJECT, 0, 16),
            RangeRequest::new("rasters/nowhere.bin", 0, 16),
            RangeRequest::new(OBJECT, 128, 256),
            RangeRequest::new(OBJECT, 200, 300),
            RangeRequest::new(OBJECT, 7, 7),
        ])
        .unwrap();

    let first = results[0].as_ref().unwrap();
    assert_eq!(first.request, RangeRequest::new(OBJECT, 0, 16));
    assert_eq!(first.data.as_ref(), &object()[..16]);
    assert!(first.t2 >= first.t1);

    assert!(matches!(results[1], Err(FetchError::NotFound(_))));
    assert_eq!(results[2].as_ref().unwrap().data.as_ref(), &object()[128..]);
    assert!(matches!(results[3], Err(FetchError::ShortRead { .. })));
    assert!(results[4].as_ref().unwrap().data.is_empty());

    // The empty range never reaches the server
    assert_eq!(server.get_count(), 4);
}

#[test]
fn test_every_connection_busy_with_one_worker() {
    let server = HttpObjects::new()
        .with_object(OBJECT, object())
        .with_delay(Duration::from_millis(150))
        .serve();
    let fetcher = HttpRangeFetcher::new(&factory(&server), 3, 1).unwrap();

    let requests: Vec<RangeRequest> = (0..9)
        .map(|i| RangeRequest::new(OBJECT, i * 16, i * 16 + 16))
        .collect();
    let results = fetcher.fetch_all(requests).unwrap();

    for (i, result) in results.iter().enumerate() {
        let fetched = result.as_ref().unwrap();
        assert_eq!(fetched.data.as_ref(), &object()[i * 16..i * 16 + 16]);
    }
    assert_eq!(server.get_count(), 9);
    // More requests on the wire than workers, never more than connections
    assert_eq!(server.max_active(), 3);
}
