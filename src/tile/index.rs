use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::TileError;

/// Which tile of the first image to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileIndex {
    /// Position in the tile offset table, row-major.
    Linear(u64),
    /// Tile row and column.
    Grid { row: u64, col: u64 },
}

impl TileIndex {
    /// Resolve to a position in the tile tables.
    ///
    /// `tiles_across` is `ceil(ImageWidth / TileWidth)`; `count` is the number
    /// of tiles the tables can address. Columns past the end of a row are
    /// rejected rather than wrapped onto the next row.
    pub fn resolve(self, tiles_across: u64, count: u64) -> Result<usize, TileError> {
        let index = match self {
            TileIndex::Linear(n) => n,
            TileIndex::Grid { row, col } => {
                if col >= tiles_across {
                    return Err(TileError::TileIndexOutOfRange {
                        index: row.saturating_mul(tiles_across).saturating_add(col),
                        count,
                    });
                }
                row.saturating_mul(tiles_across).saturating_add(col)
            }
        };

        if index >= count {
            return Err(TileError::TileIndexOutOfRange { index, count });
        }
        Ok(index as usize)
    }
}

impl Default for TileIndex {
    fn default() -> Self {
        TileIndex::Linear(0)
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileIndex::Linear(n) => write!(f, "{}", n),
            TileIndex::Grid { row, col } => write!(f, "{},{}", row, col),
        }
    }
}

/// Parses `"<n>"` as a linear index and `"<row>,<col>"` as a grid position.
impl FromStr for TileIndex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u64>()
                .map_err(|_| format!("invalid tile index '{}': expected N or ROW,COL", s))
        };

        match s.split_once(',') {
            Some((row, col)) => Ok(TileIndex::Grid {
                row: parse(row)?,
                col: parse(col)?,
            }),
            None => Ok(TileIndex::Linear(parse(s)?)),
        }
    }
}
