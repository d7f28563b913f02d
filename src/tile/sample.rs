//! Pixel element types.

use std::fmt::Debug;

use clap::ValueEnum;
use serde::Serialize;

use crate::format::tiff::{ByteOrder, Info};

/// Numeric element type of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum SampleType {
    #[value(name = "uint8")]
    #[serde(rename = "uint8")]
    U8,
    #[value(name = "int8")]
    #[serde(rename = "int8")]
    I8,
    #[value(name = "uint16")]
    #[serde(rename = "uint16")]
    U16,
    #[value(name = "int16")]
    #[serde(rename = "int16")]
    I16,
    #[value(name = "uint32")]
    #[serde(rename = "uint32")]
    U32,
    #[value(name = "int32")]
    #[serde(rename = "int32")]
    I32,
    #[value(name = "uint64")]
    #[serde(rename = "uint64")]
    U64,
    #[value(name = "int64")]
    #[serde(rename = "int64")]
    I64,
    #[value(name = "float32")]
    #[serde(rename = "float32")]
    F32,
    #[value(name = "float64")]
    #[serde(rename = "float64")]
    F64,
}

/// SampleFormat values
const SAMPLE_FORMAT_UINT: u64 = 1;
const SAMPLE_FORMAT_INT: u64 = 2;
const SAMPLE_FORMAT_FLOAT: u64 = 3;

impl SampleType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::U64 | SampleType::I64 | SampleType::F64 => 8,
        }
    }

    /// Infer the element type from `BitsPerSample` and `SampleFormat`.
    ///
    /// A missing SampleFormat means unsigned integer. Returns `None` when
    /// BitsPerSample is unknown or the combination has no matching type.
    pub fn from_info(info: &Info) -> Option<Self> {
        let bits = info.bits_per_sample?;
        let format = info.sample_format.unwrap_or(SAMPLE_FORMAT_UINT);

        let ty = match (format, bits) {
            (SAMPLE_FORMAT_UINT, 8) => SampleType::U8,
            (SAMPLE_FORMAT_UINT, 16) => SampleType::U16,
            (SAMPLE_FORMAT_UINT, 32) => SampleType::U32,
            (SAMPLE_FORMAT_UINT, 64) => SampleType::U64,
            (SAMPLE_FORMAT_INT, 8) => SampleType::I8,
            (SAMPLE_FORMAT_INT, 16) => SampleType::I16,
            (SAMPLE_FORMAT_INT, 32) => SampleType::I32,
            (SAMPLE_FORMAT_INT, 64) => SampleType::I64,
            (SAMPLE_FORMAT_FLOAT, 32) => SampleType::F32,
            (SAMPLE_FORMAT_FLOAT, 64) => SampleType::F64,
            _ => return None,
        };
        Some(ty)
    }
}

/// A fixed-size numeric element that can be read from tile bytes.
pub trait Sample: Copy + Default + Debug + Send + Sync + 'static {
    const SAMPLE_TYPE: SampleType;

    /// Read one element from the start of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes` is shorter than `size_of::<Self>()`.
    fn read(bytes: &[u8], order: ByteOrder) -> Self;
}

macro_rules! impl_sample {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Sample for $ty {
                const SAMPLE_TYPE: SampleType = SampleType::$variant;

                #[inline]
                fn read(bytes: &[u8], order: ByteOrder) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                    match order {
                        ByteOrder::LittleEndian => <$ty>::from_le_bytes(buf),
                        ByteOrder::BigEndian => <$ty>::from_be_bytes(buf),
                    }
                }
            }
        )*
    };
}

impl_sample! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}
