//! Fixed projection of the directory onto the tags tile reading needs.

use serde::Serialize;

use super::parser::Tag;
use super::tags::TiffTag;

/// Image layout extracted from the first directory.
///
/// A field is `None` when its tag is absent or when the value could not be
/// resolved from the bytes that were read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Info {
    pub image_width: Option<u64>,
    pub image_length: Option<u64>,
    pub compression: Option<u64>,
    pub predictor: Option<u64>,
    pub sample_format: Option<u64>,
    pub bits_per_sample: Option<u64>,
    pub samples_per_pixel: Option<u64>,
    pub planar_configuration: Option<u64>,
    pub photometric_interpretation: Option<u64>,
    pub rows_per_strip: Option<u64>,
    pub strip_offsets: Option<Vec<u64>>,
    pub strip_byte_counts: Option<Vec<u64>>,
    pub tile_width: Option<u64>,
    pub tile_length: Option<u64>,
    pub tile_offsets: Option<Vec<u64>>,
    pub tile_byte_counts: Option<Vec<u64>>,
}

impl Info {
    /// Build the projection from parsed tags.
    pub fn from_tags(tags: &[Tag]) -> Self {
        let find = |key: TiffTag| {
            tags.iter()
                .find(|t| t.id == key.as_u16())
                .and_then(|t| t.value.as_ref())
        };
        let scalar = |key| find(key).and_then(|v| v.first_u64());
        let table = |key| find(key).and_then(|v| v.as_u64_vec());

        Info {
            image_width: scalar(TiffTag::ImageWidth),
            image_length: scalar(TiffTag::ImageLength),
            compression: scalar(TiffTag::Compression),
            predictor: scalar(TiffTag::Predictor),
            sample_format: scalar(TiffTag::SampleFormat),
            bits_per_sample: scalar(TiffTag::BitsPerSample),
            samples_per_pixel: scalar(TiffTag::SamplesPerPixel),
            planar_configuration: scalar(TiffTag::PlanarConfiguration),
            photometric_interpretation: scalar(TiffTag::PhotometricInterpretation),
            rows_per_strip: scalar(TiffTag::RowsPerStrip),
            strip_offsets: table(TiffTag::StripOffsets),
            strip_byte_counts: table(TiffTag::StripByteCounts),
            tile_width: scalar(TiffTag::TileWidth),
            tile_length: scalar(TiffTag::TileLength),
            tile_offsets: table(TiffTag::TileOffsets),
            tile_byte_counts: table(TiffTag::TileByteCounts),
        }
    }

    /// Number of tiles in one row of tiles, `ceil(ImageWidth / TileWidth)`.
    pub fn tiles_across(&self) -> Option<u64> {
        match (self.image_width, self.tile_width) {
            (Some(w), Some(tw)) if tw > 0 => Some(w.div_ceil(tw)),
            _ => None,
        }
    }

    /// Number of rows of tiles, `ceil(ImageLength / TileLength)`.
    pub fn tiles_down(&self) -> Option<u64> {
        match (self.image_length, self.tile_length) {
            (Some(h), Some(th)) if th > 0 => Some(h.div_ceil(th)),
            _ => None,
        }
    }

    /// Total tiles in the image.
    pub fn tile_count(&self) -> Option<u64> {
        self.tiles_across()?.checked_mul(self.tiles_down()?)
    }

    /// `(TileLength, TileWidth)`, if both are known.
    pub fn tile_shape(&self) -> Option<(usize, usize)> {
        Some((self.tile_length? as usize, self.tile_width? as usize))
    }
}
