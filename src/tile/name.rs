//! Quadtree tile names.
//!
//! Every tile has a name made of the root digit `0` followed by one quadrant
//! digit per zoom level, so that a child's name is always its parent's name
//! plus one digit:
//!
//! ```text
//! 0.png
//! 00.png 01.png 02.png 03.png
//! 000.png 001.png ... 033.png
//! ```
//!
//! The quadrant digit is `2 * (y % 2) + (x % 2)`: `0` top-left, `1`
//! top-right, `2` bottom-left, `3` bottom-right.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TileNameError;

/// File suffix of every tile name. Tiles are always stored as PNG.
pub const TILE_SUFFIX: &str = ".png";

/// Leading digit of every tile name.
pub const ROOT_DIGIT: char = '0';

/// Deepest zoom any tile name may have.
///
/// A 256px tile over the default root already reaches single-ulp pixels
/// near zoom 45. Individual maps may stop earlier, see
/// [`TileIndex::max_zoom`](super::TileIndex::max_zoom).
pub const MAX_ZOOM: u32 = 45;

// =============================================================================
// Coordinates and quadrants
// =============================================================================

/// Tile column and row at some zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
}

impl TileCoord {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// One step of quadtree descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// Quadrant for the low bits of a tile coordinate.
    pub fn from_parity(x_odd: bool, y_odd: bool) -> Self {
        match (x_odd, y_odd) {
            (false, false) => Quadrant::TopLeft,
            (true, false) => Quadrant::TopRight,
            (false, true) => Quadrant::BottomLeft,
            (true, true) => Quadrant::BottomRight,
        }
    }

    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(Quadrant::TopLeft),
            '1' => Some(Quadrant::TopRight),
            '2' => Some(Quadrant::BottomLeft),
            '3' => Some(Quadrant::BottomRight),
            _ => None,
        }
    }

    pub fn digit(self) -> char {
        (b'0' + self as u8) as char
    }

    /// Right half (bit 0).
    pub fn is_right(self) -> bool {
        (self as u8) & 1 == 1
    }

    /// Bottom half (bit 1).
    pub fn is_bottom(self) -> bool {
        (self as u8) >= 2
    }
}

// =============================================================================
// Tile Name
// =============================================================================

/// Canonical quadtree name of a tile, e.g. `013.png`.
///
/// Stored without the suffix; [`fmt::Display`] adds it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileName {
    quadkey: String,
}

impl TileName {
    /// The root tile, `0.png`.
    pub fn root() -> Self {
        Self {
            quadkey: ROOT_DIGIT.to_string(),
        }
    }

    /// Name of the tile at `coord` and `zoom`.
    ///
    /// Returns `None` when either coordinate is negative or `>= 2^zoom`, or
    /// when `zoom` exceeds [`MAX_ZOOM`].
    pub fn from_coord(coord: TileCoord, zoom: u32) -> Option<Self> {
        if zoom > MAX_ZOOM {
            return None;
        }
        let size = 1i64 << zoom;
        if coord.x < 0 || coord.y < 0 || coord.x >= size || coord.y >= size {
            return None;
        }

        let mut digits = vec![' '; zoom as usize];
        let (mut x, mut y) = (coord.x, coord.y);
        for slot in digits.iter_mut().rev() {
            *slot = Quadrant::from_parity(x % 2 == 1, y % 2 == 1).digit();
            x /= 2;
            y /= 2;
        }

        let mut quadkey = String::with_capacity(zoom as usize + 1);
        quadkey.push(ROOT_DIGIT);
        quadkey.extend(digits);
        Some(Self { quadkey })
    }

    /// Parse a name, with or without the `.png` suffix.
    pub fn parse(name: &str) -> Result<Self, TileNameError> {
        let quadkey = name.strip_suffix(TILE_SUFFIX).unwrap_or(name);

        let mut chars = quadkey.chars();
        match chars.next() {
            None => return Err(TileNameError::Empty),
            Some(ROOT_DIGIT) => {}
            Some(other) => return Err(TileNameError::InvalidRoot(other)),
        }
        for (i, digit) in chars.enumerate() {
            if Quadrant::from_digit(digit).is_none() {
                return Err(TileNameError::InvalidDigit {
                    digit,
                    position: i + 1,
                });
            }
        }

        let depth = (quadkey.len() - 1) as u32;
        if depth > MAX_ZOOM {
            return Err(TileNameError::TooDeep {
                depth,
                max: MAX_ZOOM,
            });
        }

        Ok(Self {
            quadkey: quadkey.to_string(),
        })
    }

    /// The name without its suffix, e.g. `013`.
    pub fn quadkey(&self) -> &str {
        &self.quadkey
    }

    /// Zoom level of the tile (0 for the root).
    pub fn depth(&self) -> u32 {
        (self.quadkey.len() - 1) as u32
    }

    pub fn is_root(&self) -> bool {
        self.quadkey.len() == 1
    }

    /// Quadrant digits from the root downward (the root digit excluded).
    pub fn quadrants(&self) -> impl Iterator<Item = Quadrant> + '_ {
        self.quadkey[1..].chars().filter_map(Quadrant::from_digit)
    }

    pub fn parent(&self) -> Option<TileName> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            quadkey: self.quadkey[..self.quadkey.len() - 1].to_string(),
        })
    }

    pub fn child(&self, quadrant: Quadrant) -> TileName {
        let mut quadkey = self.quadkey.clone();
        quadkey.push(quadrant.digit());
        Self { quadkey }
    }

    /// Strict ancestors, nearest first, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = TileName> + '_ {
        (1..self.quadkey.len()).rev().map(|len| Self {
            quadkey: self.quadkey[..len].to_string(),
        })
    }

    /// Tile coordinate at [`Self::depth`]; the inverse of [`Self::from_coord`].
    pub fn coord(&self) -> TileCoord {
        self.quadrants()
            .fold(TileCoord::new(0, 0), |coord, quadrant| {
                TileCoord::new(
                    coord.x * 2 + quadrant.is_right() as i64,
                    coord.y * 2 + quadrant.is_bottom() as i64,
                )
            })
    }

    /// Whether the tile lies in the bottom half of the root.
    pub fn is_southern(&self) -> bool {
        self.quadrants().next().is_some_and(Quadrant::is_bottom)
    }

    /// Hierarchical tags used to cluster stored tiles: one `p<level>:<prefix>`
    /// tag per ancestor, nearest first, at most `max_depth` of them.
    ///
    /// `013` yields `p1:01`, `p2:0`.
    pub fn ancestor_tags(&self, max_depth: usize) -> Vec<String> {
        let mut tags = Vec::new();
        let mut prefix = self.quadkey.as_str();
        for level in 1..=max_depth {
            prefix = &prefix[..prefix.len() - 1];
            if prefix.is_empty() {
                break;
            }
            tags.push(format!("p{}:{}", level, prefix));
        }
        tags
    }
}

impl fmt::Display for TileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.quadkey, TILE_SUFFIX)
    }
}

impl FromStr for TileName {
    type Err = TileNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TileName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TileName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================
