//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for header parsing:
//! - Field types that determine how values are encoded
//! - The tag catalog mapping numeric ids to names and descriptions
//! - Compression and predictor codes relevant to tile decoding

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
///
/// Each field type has a fixed item size, which decides whether a value fits
/// inline in the 4-byte value field of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,
    /// 8-bit ASCII character, NUL terminated
    Ascii = 2,
    /// Unsigned 16-bit integer
    Short = 3,
    /// Unsigned 32-bit integer
    Long = 4,
    /// Two Longs: numerator, denominator
    Rational = 5,
    /// Signed 8-bit integer
    SByte = 6,
    /// Opaque byte
    Undefined = 7,
    /// Signed 16-bit integer
    SShort = 8,
    /// Signed 32-bit integer
    SLong = 9,
    /// Two SLongs: numerator, denominator
    SRational = 10,
    /// IEEE single precision
    Float = 11,
    /// IEEE double precision
    Double = 12,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }

    /// Human-readable type name.
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Byte => "uint8",
            FieldType::Ascii => "ASCII (8 bits)",
            FieldType::Short => "uint16",
            FieldType::Long => "uint32",
            FieldType::Rational => "RATIONAL (2x LONG, 64 bits)",
            FieldType::SByte => "int8",
            FieldType::Undefined => "UNDEFINED (8 bits)",
            FieldType::SShort => "int16",
            FieldType::SLong => "int32",
            FieldType::SRational => "SRATIONAL (2x SLONG, 64 bits)",
            FieldType::Float => "float32",
            FieldType::Double => "float64",
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for unknown type values.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            _ => None,
        }
    }

    /// Maximum bytes that can be stored inline in a classic TIFF entry.
    pub const INLINE_THRESHOLD: u64 = 4;

    /// Check if `count` values of this type fit in the entry's value field.
    #[inline]
    pub fn fits_inline(self, count: u32) -> bool {
        self.size_in_bytes() as u64 * count as u64 <= Self::INLINE_THRESHOLD
    }
}

/// Type name reported for entries whose type id is not in the table.
pub const UNKNOWN_TYPE_NAME: &str = "UNKNOWN";

// =============================================================================
// Keys of Interest
// =============================================================================

/// Tags projected into [`Info`](super::Info).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    ImageWidth = 0x0100,
    ImageLength = 0x0101,
    BitsPerSample = 0x0102,
    Compression = 0x0103,
    PhotometricInterpretation = 0x0106,
    StripOffsets = 0x0111,
    SamplesPerPixel = 0x0115,
    RowsPerStrip = 0x0116,
    StripByteCounts = 0x0117,
    PlanarConfiguration = 0x011C,
    Predictor = 0x013D,
    TileWidth = 0x0142,
    TileLength = 0x0143,
    TileOffsets = 0x0144,
    TileByteCounts = 0x0145,
    SampleFormat = 0x0153,
}

impl TiffTag {
    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Catalog name of the tag.
    pub fn name(self) -> &'static str {
        match self {
            TiffTag::ImageWidth => "ImageWidth",
            TiffTag::ImageLength => "ImageLength",
            TiffTag::BitsPerSample => "BitsPerSample",
            TiffTag::Compression => "Compression",
            TiffTag::PhotometricInterpretation => "PhotometricInterpretation",
            TiffTag::StripOffsets => "StripOffsets",
            TiffTag::SamplesPerPixel => "SamplesPerPixel",
            TiffTag::RowsPerStrip => "RowsPerStrip",
            TiffTag::StripByteCounts => "StripByteCounts",
            TiffTag::PlanarConfiguration => "PlanarConfiguration",
            TiffTag::Predictor => "Predictor",
            TiffTag::TileWidth => "TileWidth",
            TiffTag::TileLength => "TileLength",
            TiffTag::TileOffsets => "TileOffsets",
            TiffTag::TileByteCounts => "TileByteCounts",
            TiffTag::SampleFormat => "SampleFormat",
        }
    }
}

// =============================================================================
// Tag Catalog
// =============================================================================

/// Look up the catalog name and description for a tag id.
///
/// Covers baseline and extension TIFF tags, the JPEG family and the
/// GeoTIFF/GDAL tags found in cloud-optimized GeoTIFFs.
pub fn lookup_tag(id: u16) -> Option<(&'static str, &'static str)> {
    let entry = match id {
        // image data structure
        0x0100 => ("ImageWidth", "Image width"),
        0x0101 => ("ImageLength", "Image height"),
        0x0102 => ("BitsPerSample", "Number of bits per component"),
        0x0103 => ("Compression", "Compression scheme"),
        0x0106 => ("PhotometricInterpretation", "Pixel composition"),
        0x0112 => ("Orientation", "Orientation of image"),
        0x0115 => ("SamplesPerPixel", "Number of components"),
        0x011C => ("PlanarConfiguration", "Image data arrangement"),
        0x0212 => ("YCbCrSubSampling", "Subsampling ratio of Y to C"),
        0x0213 => ("YCbCrPositioning", "Y and C positioning"),
        0x011A => ("XResolution", "Image resolution in width direction"),
        0x011B => ("YResolution", "Image resolution in height direction"),
        0x0128 => ("ResolutionUnit", "Unit of X and Y resolution"),
        // recording offset
        0x0111 => ("StripOffsets", "Image data location"),
        0x0116 => ("RowsPerStrip", "Number of rows per strip"),
        0x0117 => ("StripByteCounts", "Bytes per compressed strip"),
        0x0201 => ("JPEGInterchangeFormat", "Offset to JPEG SOI"),
        0x0202 => ("JPEGInterchangeFormatLength", "Bytes of JPEG data"),
        // image data characteristics
        0x012D => ("TransferFunction", "Transfer function"),
        0x013E => ("WhitePoint", "White point chromaticity"),
        0x013F => ("PrimaryChromaticities", "Chromaticities of primaries"),
        0x0211 => ("YCbCrCoefficients", "Color space transformation matrix coefficients"),
        0x0214 => ("ReferenceBlackWhite", "Pair of black and white reference values"),
        // other tags
        0x0132 => ("DateTime", "File change date and time"),
        0x010E => ("ImageDescription", "Image title"),
        0x010F => ("Make", "Image input equipment manufacturer"),
        0x0110 => ("Model", "Image input equipment model"),
        0x0131 => ("Software", "Software used"),
        0x013B => ("Artist", "Person who created the image"),
        0x8298 => ("Copyright", "Copyright holder"),
        0x02BC => ("XMPPacket", "XMP Packet"),
        // extension tags
        0x00FE => ("NewSubfileType", "NewSubfileType"),
        0x00FF => ("SubfileType", "SubfileType"),
        0x0107 => ("Threshholding", "Threshholding"),
        0x0108 => ("CellWidth", "CellWidth"),
        0x0109 => ("CellLength", "CellLength"),
        0x010A => ("FillOrder", "FillOrder"),
        0x010D => ("DocumentName", "DocumentName"),
        0x0118 => ("MinSampleValue", "MinSampleValue"),
        0x0119 => ("MaxSampleValue", "MaxSampleValue"),
        0x011D => ("PageName", "PageName"),
        0x011E => ("XPosition", "XPosition"),
        0x011F => ("YPosition", "YPosition"),
        0x0120 => ("FreeOffsets", "FreeOffsets"),
        0x0121 => ("FreeByteCounts", "FreeByteCounts"),
        0x0122 => ("GrayResponseUnit", "GrayResponseUnit"),
        0x0123 => ("GrayResponseCurve", "GrayResponseCurve"),
        0x0124 => ("T4Options", "T4Options"),
        0x0125 => ("T6Options", "T6Options"),
        0x0129 => ("PageNumber", "PageNumber"),
        0x013C => ("HostComputer", "HostComputer"),
        0x013D => ("Predictor", "Predictor"),
        0x0140 => ("ColorMap", "ColorMap"),
        0x0141 => ("HalftoneHints", "HalftoneHints"),
        0x0142 => ("TileWidth", "TileWidth"),
        0x0143 => ("TileLength", "TileLength"),
        0x0144 => ("TileOffsets", "TileOffsets"),
        0x0145 => ("TileByteCounts", "TileByteCounts"),
        0x014A => ("SubIFDs", "SubIFDs"),
        0x014C => ("InkSet", "InkSet"),
        0x014D => ("InkNames", "InkNames"),
        0x014E => ("NumberOfInks", "NumberOfInks"),
        0x0150 => ("DotRange", "DotRange"),
        0x0151 => ("TargetPrinter", "TargetPrinter"),
        0x0152 => ("ExtraSamples", "ExtraSamples"),
        0x0153 => ("SampleFormat", "SampleFormat"),
        0x0154 => ("SMinSampleValue", "SMinSampleValue"),
        0x0155 => ("SMaxSampleValue", "SMaxSampleValue"),
        0x0156 => ("TransferRange", "TransferRange"),
        // JPEG
        0x0200 => ("JPEGProc", "JPEGProc"),
        0x0203 => ("JPEGRestartInterval", "JPEGRestartInterval"),
        0x0205 => ("JPEGLosslessPredictors", "JPEGLosslessPredictors"),
        0x0206 => ("JPEGPointTransforms", "JPEGPointTransforms"),
        0x0207 => ("JPEGQTables", "JPEGQTables"),
        0x0208 => ("JPEGDCTables", "JPEGDCTables"),
        0x0209 => ("JPEGACTables", "JPEGACTables"),
        0x015B => ("JPEGTables", "JPEGTables"),
        // GeoTIFF
        0x830E => ("ModelPixelScale", "Model pixel scale"),
        0x8482 => ("ModelTiePoint", "Model tie points"),
        0x85D8 => ("ModelTransformation", "Model transformation matrix"),
        0x87AF => ("GeoKeyDirectory", "GeoKey directory"),
        0x87B0 => ("GeoDoubleParams", "GeoKey double parameters"),
        0x87B1 => ("GeoAsciiParams", "GeoKey ASCII parameters"),
        0xA480 => ("GDAL_METADATA", "GDAL metadata XML"),
        0xA481 => ("GDAL_NODATA", "GDAL nodata value"),
        _ => return None,
    };
    Some(entry)
}

/// Name used for tag ids missing from the catalog.
pub fn synthetic_tag_name(id: u16) -> String {
    format!("Tag_{}", id)
}

// =============================================================================
// Compression and Predictor Values
// =============================================================================

/// TIFF compression scheme identifiers.
///
/// Only the deflate family is decoded. Anything else is reported as an
/// unsupported format naming the raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    /// No compression
    None = 1,
    /// LZW compression (not supported)
    Lzw = 5,
    /// "Old-style" JPEG (not supported)
    OldJpeg = 6,
    /// JPEG compression (not supported)
    Jpeg = 7,
    /// Deflate/zlib compression (supported)
    Deflate = 8,
    /// PackBits (not supported)
    PackBits = 32773,
    /// Adobe Deflate, same stream as Deflate (supported)
    AdobeDeflate = 32946,
    /// LZMA (not supported)
    Lzma = 34925,
    /// Zstandard (not supported)
    Zstd = 50000,
}

impl Compression {
    /// Create a Compression from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            5 => Some(Compression::Lzw),
            6 => Some(Compression::OldJpeg),
            7 => Some(Compression::Jpeg),
            8 => Some(Compression::Deflate),
            32773 => Some(Compression::PackBits),
            32946 => Some(Compression::AdobeDeflate),
            34925 => Some(Compression::Lzma),
            50000 => Some(Compression::Zstd),
            _ => None,
        }
    }

    /// Check if this compression scheme can be decoded.
    #[inline]
    pub const fn is_supported(self) -> bool {
        matches!(self, Compression::Deflate | Compression::AdobeDeflate)
    }

    /// Get a human-readable name for the compression scheme.
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "Old JPEG",
            Compression::Jpeg => "JPEG",
            Compression::Deflate => "Deflate",
            Compression::PackBits => "PackBits",
            Compression::AdobeDeflate => "Adobe Deflate",
            Compression::Lzma => "LZMA",
            Compression::Zstd => "Zstandard",
        }
    }
}

/// Predictor value meaning "no prediction applied".
pub const PREDICTOR_NONE: u16 = 1;

/// Horizontal differencing predictor.
pub const PREDICTOR_HORIZONTAL: u16 = 2;

// =============================================================================
// Tests
// =============================================================================
