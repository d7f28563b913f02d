mod http_reader;
mod range_reader;
mod s3_reader;

pub use http_reader::{
    HttpClientFactory, HttpRangeClient, PendingResponse, DEFAULT_HTTP_TIMEOUT, HTTP_IO_THREADS,
};
pub use range_reader::{
    check_body_len, range_header, read_u16_be, read_u16_le, read_u32_be, read_u32_le,
    read_u64_be, read_u64_le, ClientFactory, Location, RangeFetch,
};
pub use s3_reader::{create_s3_client, S3ClientFactory, S3RangeClient};
