//! Single-tile read integration tests.
//!
//! Tests verify:
//! - Linear and grid addressing pick the right tile in either byte order
//! - Each tile read costs exactly two range requests
//! - Unsupported encodings, missing tags and bad indexes fail cleanly
//! - Fetch failures surface as tile errors

use ndarray::Array2;

use s3_tile_reader::error::{FetchError, TileError};
use s3_tile_reader::{read_tile, read_tile_bytes, ByteOrder, TileIndex};

use super::test_utils::{encode_pixels, expected_u16_tile, MemoryStore, TiffSpec, GOLDEN_HEADER};

const LOCATION: &str = "s3://rasters/scene.tif";

fn store_with(spec: &TiffSpec) -> MemoryStore {
    MemoryStore::new().with_object(LOCATION, spec.build_pattern())
}

// =============================================================================
// Successful Reads
// =============================================================================

#[test]
fn test_read_every_tile_linear() {
    let spec = TiffSpec::u16(40, 24, 16);
    let store = store_with(&spec);

    for n in 0..spec.tile_count() {
        let tile = read_tile::<u16, _>(
            &store,
            LOCATION,
            TileIndex::Linear(n as u64),
            spec.header_len(),
        )
        .unwrap();

        assert_eq!(tile.index, n);
        assert_eq!(tile.pixels, expected_u16_tile(n, 16, 16));
    }
}

#[test]
fn test_grid_index_matches_linear() {
    let spec = TiffSpec::u16(40, 24, 16);
    let store = store_with(&spec);

    // Three tiles across, so (1, 2) is tile 5
    let tile = read_tile::<u16, _>(
        &store,
        LOCATION,
        TileIndex::Grid { row: 1, col: 2 },
        spec.header_len(),
    )
    .unwrap();
    assert_eq!(tile.index, 5);
    assert_eq!(tile.pixels, expected_u16_tile(5, 16, 16));
}

#[test]
fn test_big_endian_tile() {
    let spec = TiffSpec::u16(32, 32, 16).with_order(ByteOrder::BigEndian);
    let store = store_with(&spec);

    let tile = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(3), spec.header_len())
        .unwrap();
    assert_eq!(tile.header.byte_order, ByteOrder::BigEndian);
    assert_eq!(tile.pixels, expected_u16_tile(3, 16, 16));
}

#[test]
fn test_two_requests_per_tile() {
    let spec = TiffSpec::u16(40, 24, 16);
    let store = store_with(&spec);

    let err = read_tile::<u16, _>(&store, "rasters/scene.tif", TileIndex::Linear(1), 64)
        .unwrap_err();
    // A probe too small to hold the directory still costs one request
    assert!(matches!(err, TileError::Format(_)));
    assert_eq!(store.request_count(), 1);

    read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(1), spec.header_len()).unwrap();
    assert_eq!(store.request_count(), 3);
}

#[test]
fn test_float_and_signed_tiles() {
    let spec = TiffSpec::u16(4, 2, 2).with_sample(32, Some(3));
    let tiles: Vec<Vec<u8>> = vec![
        encode_pixels(spec.order, &[0.5f32, -1.0, 2.25, 1e6]),
        encode_pixels(spec.order, &[f32::MIN, 0.0, -0.0, f32::MAX]),
    ];
    let store = MemoryStore::new().with_object(LOCATION, spec.build(&tiles));

    let tile = read_tile::<f32, _>(&store, LOCATION, TileIndex::Linear(0), spec.header_len())
        .unwrap();
    assert_eq!(
        tile.pixels,
        Array2::from_shape_vec((2, 2), vec![0.5f32, -1.0, 2.25, 1e6]).unwrap()
    );

    let spec = TiffSpec::u16(2, 2, 2)
        .with_order(ByteOrder::BigEndian)
        .with_sample(16, Some(2));
    let tiles = vec![encode_pixels(spec.order, &[-3i16, 7, i16::MIN, i16::MAX])];
    let store = MemoryStore::new().with_object(LOCATION, spec.build(&tiles));

    let tile = read_tile::<i16, _>(&store, LOCATION, TileIndex::Linear(0), spec.header_len())
        .unwrap();
    assert_eq!(tile.pixels.as_slice().unwrap(), &[-3, 7, i16::MIN, i16::MAX]);
}

#[test]
fn test_raw_bytes_and_stats() {
    let spec = TiffSpec::u16(32, 16, 16);
    let store = store_with(&spec);

    let raw = read_tile_bytes(&store, LOCATION, TileIndex::Linear(1), spec.header_len()).unwrap();
    assert_eq!(raw.shape, (16, 16));
    assert_eq!(raw.data.len(), 16 * 16 * 2);
    assert_eq!(&raw.data[..4], &[0xE8, 0x03, 0xE9, 0x03]);

    let compressed = raw.header.info.tile_byte_counts.unwrap()[1] as usize;
    assert_eq!(raw.stats.chunk_size, compressed);
    assert!(raw.stats.t_total >= raw.stats.t_open);
}

#[test]
fn test_adobe_deflate_accepted() {
    let spec = TiffSpec::u16(16, 16, 16).with_compression(32946);
    let store = store_with(&spec);

    let tile = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(0), spec.header_len())
        .unwrap();
    assert_eq!(tile.pixels, expected_u16_tile(0, 16, 16));
}

#[test]
fn test_predictor_one_accepted() {
    let spec = TiffSpec::u16(16, 16, 16).with_predictor(1);
    let store = store_with(&spec);

    let tile = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(0), spec.header_len());
    assert!(tile.is_ok());
}

// =============================================================================
// Unsupported Files
// =============================================================================

#[test]
fn test_horizontal_predictor_rejected() {
    let spec = TiffSpec::u16(16, 16, 16).with_predictor(2);
    let store = store_with(&spec);

    let err = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(0), spec.header_len())
        .unwrap_err();
    assert!(matches!(err, TileError::UnsupportedPredictor(2)));
    // Rejected from the header alone
    assert_eq!(store.request_count(), 1);
}

#[test]
fn test_golden_prefix_rejected_for_predictor() {
    let store = MemoryStore::new().with_object(LOCATION, GOLDEN_HEADER.to_vec());

    let err = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(0), GOLDEN_HEADER.len())
        .unwrap_err();
    assert!(matches!(err, TileError::UnsupportedPredictor(2)));
}

#[test]
fn test_other_compressions_rejected() {
    for code in [1u16, 5, 7] {
        let spec = TiffSpec::u16(16, 16, 16).with_compression(code);
        let store = store_with(&spec);

        let err = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(0), spec.header_len())
            .unwrap_err();
        assert!(
            matches!(err, TileError::UnsupportedCompression(c) if c == code),
            "compression {} gave {:?}",
            code,
            err
        );
    }
}

#[test]
fn test_tables_past_probe() {
    let spec = TiffSpec::u16(40, 24, 16);
    let store = store_with(&spec);

    let err = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(0), spec.directory_end())
        .unwrap_err();
    assert!(matches!(
        err,
        TileError::UnresolvedTag {
            tag: "TileOffsets",
            ..
        }
    ));
}

#[test]
fn test_missing_tile_tags() {
    // ImageWidth and Compression only
    let mut data = b"II".to_vec();
    data.extend_from_slice(&42u16.to_le_bytes());
    data.extend_from_slice(&8u32.to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(&[0x00, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00]);
    data.extend_from_slice(&[0x03, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00]);
    data.extend_from_slice(&0u32.to_le_bytes());
    let len = data.len();
    let store = MemoryStore::new().with_object(LOCATION, data);

    let err = read_tile::<u8, _>(&store, LOCATION, TileIndex::Linear(0), len).unwrap_err();
    assert!(matches!(err, TileError::MissingTag("TileWidth")));
}

#[test]
fn test_index_out_of_range() {
    let spec = TiffSpec::u16(40, 24, 16);
    let store = store_with(&spec);

    let err = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(6), spec.header_len())
        .unwrap_err();
    assert!(matches!(
        err,
        TileError::TileIndexOutOfRange { index: 6, count: 6 }
    ));

    let err = read_tile::<u16, _>(
        &store,
        LOCATION,
        TileIndex::Grid { row: 0, col: 3 },
        spec.header_len(),
    )
    .unwrap_err();
    assert!(matches!(err, TileError::TileIndexOutOfRange { .. }));
}

#[test]
fn test_wrong_sample_type() {
    let spec = TiffSpec::u16(16, 16, 16);
    let store = store_with(&spec);

    let err = read_tile::<u32, _>(&store, LOCATION, TileIndex::Linear(0), spec.header_len())
        .unwrap_err();
    assert!(matches!(
        err,
        TileError::DecodedSizeMismatch {
            expected: 1024,
            actual: 512
        }
    ));
}

// =============================================================================
// Fetch Failures
// =============================================================================

#[test]
fn test_missing_object() {
    let store = MemoryStore::new();

    let err = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(0), 64).unwrap_err();
    assert!(matches!(err, TileError::Fetch(FetchError::NotFound(_))));
}

#[test]
fn test_object_smaller_than_probe() {
    let spec = TiffSpec::u16(16, 16, 16);
    let file = spec.build_pattern();
    let len = file.len() as u64;
    let store = MemoryStore::new().with_object(LOCATION, file);

    let err = read_tile::<u16, _>(&store, LOCATION, TileIndex::Linear(0), 4096).unwrap_err();
    match err {
        TileError::Fetch(FetchError::ShortRead {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 4096);
            assert_eq!(actual, len);
        }
        other => panic!("expected a short read, got {:?}", other),
    }
}

#[test]
fn test_invalid_location() {
    let store = MemoryStore::new();

    let err = read_tile::<u16, _>(&store, "gs://rasters/scene.tif", TileIndex::Linear(0), 64)
        .unwrap_err();
    assert!(matches!(err, TileError::Fetch(FetchError::InvalidLocation(_))));
}
