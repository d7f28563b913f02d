//! s3-tile-reader - parallel tile reads from cloud-optimized GeoTIFFs.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use s3_tile_reader::{
    config::{Backend, Cli, Command, HeadersConfig, RangesConfig, ReaderConfig, TileConfig},
    batch_array, BatchStats, ClientFactory, HttpClientFactory, HttpRangeFetcher, RangeRequest, ReaderError,
    S3ClientFactory, Sample, SampleType, TileIndex, TileReader,
};

type CliResult = Result<(), Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Headers(config) => run_headers(config),
        Command::Tile(config) => run_tile(config),
        Command::Ranges(config) => run_ranges(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "s3_tile_reader=debug"
    } else {
        "s3_tile_reader=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn s3_factory(config: &ReaderConfig) -> S3ClientFactory {
    S3ClientFactory::new(config.region.clone())
        .with_endpoint(config.endpoint.clone())
        .with_tls(config.use_tls())
}

fn http_factory(config: &ReaderConfig) -> Result<HttpClientFactory, Box<dyn Error>> {
    let factory = match config.endpoint {
        Some(ref endpoint) => HttpClientFactory::new(Url::parse(endpoint)?),
        None => HttpClientFactory::for_region(&config.region, config.use_tls())?,
    };
    Ok(factory.with_timeout(config.http_timeout()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Headers Command
// =============================================================================

fn run_headers(config: HeadersConfig) -> CliResult {
    config.reader.validate()?;

    match config.reader.backend {
        Backend::S3 => headers_with(s3_factory(&config.reader), &config),
        Backend::Http => headers_with(http_factory(&config.reader)?, &config),
    }
}

fn headers_with<F: ClientFactory>(factory: F, config: &HeadersConfig) -> CliResult {
    let reader = TileReader::new(factory, &config.reader)?;
    let headers = reader.read_headers(&config.locations)?;

    let parsed = headers.iter().filter(|h| h.is_some()).count();
    info!(parsed, total = headers.len(), "headers read");

    print_json(&headers)
}

// =============================================================================
// Tile Command
// =============================================================================

fn run_tile(config: TileConfig) -> CliResult {
    config.validate()?;

    match config.reader.backend {
        Backend::S3 => tile_with(s3_factory(&config.reader), &config),
        Backend::Http => tile_with(http_factory(&config.reader)?, &config),
    }
}

fn tile_with<F: ClientFactory>(factory: F, config: &TileConfig) -> CliResult {
    let reader = TileReader::new(factory, &config.reader)?;
    reader.warmup()?;

    // Tile shape and sample type come from the first object
    let first = reader
        .read_headers(&config.locations[..1])?
        .pop()
        .flatten()
        .ok_or_else(|| format!("could not read the header of {}", config.locations[0]))?;

    let shape = first
        .info
        .tile_shape()
        .ok_or_else(|| format!("{} is not tiled", config.locations[0]))?;
    let dtype = match config.dtype {
        Some(dtype) => dtype,
        None => SampleType::from_info(&first.info).ok_or_else(|| {
            format!(
                "cannot infer the sample type of {}; pass --dtype",
                config.locations[0]
            )
        })?,
    };
    info!(?dtype, rows = shape.0, cols = shape.1, "reading tile {}", config.tile);

    let locations = &config.locations;
    let stats = match dtype {
        SampleType::U8 => read_batch::<u8, F>(&reader, locations, config.tile, shape)?,
        SampleType::I8 => read_batch::<i8, F>(&reader, locations, config.tile, shape)?,
        SampleType::U16 => read_batch::<u16, F>(&reader, locations, config.tile, shape)?,
        SampleType::I16 => read_batch::<i16, F>(&reader, locations, config.tile, shape)?,
        SampleType::U32 => read_batch::<u32, F>(&reader, locations, config.tile, shape)?,
        SampleType::I32 => read_batch::<i32, F>(&reader, locations, config.tile, shape)?,
        SampleType::U64 => read_batch::<u64, F>(&reader, locations, config.tile, shape)?,
        SampleType::I64 => read_batch::<i64, F>(&reader, locations, config.tile, shape)?,
        SampleType::F32 => read_batch::<f32, F>(&reader, locations, config.tile, shape)?,
        SampleType::F64 => read_batch::<f64, F>(&reader, locations, config.tile, shape)?,
    };

    print_json(&stats)
}

fn read_batch<T: Sample, F: ClientFactory>(
    reader: &TileReader<F>,
    locations: &[String],
    tile: TileIndex,
    (rows, cols): (usize, usize),
) -> Result<BatchStats, ReaderError> {
    let mut pixels = batch_array::<T>(locations.len(), (rows, cols))?;
    reader.read_tile_batch(locations, tile, &mut pixels)
}

// =============================================================================
// Ranges Command
// =============================================================================

fn run_ranges(config: RangesConfig) -> CliResult {
    config.validate()?;

    let factory = http_factory(&config.reader)?;
    let fetcher = HttpRangeFetcher::new(&factory, config.connections, config.reader.workers)?;
    fetcher.connect();

    let requests: Vec<RangeRequest> = config
        .ranges
        .iter()
        .map(|r| RangeRequest::new(config.location.clone(), r.start, r.stop))
        .collect();

    let results = fetcher.fetch_all(requests)?;
    let report: Vec<serde_json::Value> = results
        .iter()
        .map(|result| match result {
            Ok(fetched) => serde_json::json!({
                "range": fetched.request,
                "bytes": fetched.data.len(),
                "t1": fetched.t1.as_secs_f64(),
                "t2": fetched.t2.as_secs_f64(),
            }),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        })
        .collect();

    print_json(&report)
}
