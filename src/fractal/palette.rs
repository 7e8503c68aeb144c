//! Level-to-color codec.
//!
//! Iteration levels map to RGBA colors through a small table of control
//! points with linear interpolation between neighbours. The inverse mapping
//! (color to level) is computed on first use by evaluating every level once.

use std::collections::HashMap;
use std::sync::OnceLock;

use image::Rgba;

use crate::error::PaletteError;

/// One `(level, color)` anchor of the color ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPoint {
    pub level: u32,
    pub color: Rgba<u8>,
}

impl ControlPoint {
    pub const fn new(level: u32, rgba: [u8; 4]) -> Self {
        Self {
            level,
            color: Rgba(rgba),
        }
    }
}

/// The standard ramp: transparent outside, blue background, then yellow,
/// red, green, cyan, white and gray down to black inside the set.
const STANDARD_POINTS: [ControlPoint; 10] = [
    ControlPoint::new(0, [255, 255, 255, 0]),
    ControlPoint::new(1, [0, 8, 107, 255]),
    ControlPoint::new(2, [0, 16, 214, 255]),
    ControlPoint::new(100, [255, 255, 0, 255]),
    ControlPoint::new(200, [255, 0, 0, 255]),
    ControlPoint::new(400, [0, 255, 0, 255]),
    ControlPoint::new(600, [0, 255, 255, 255]),
    ControlPoint::new(800, [254, 254, 254, 255]),
    ControlPoint::new(900, [128, 128, 128, 255]),
    ControlPoint::new(1000, [0, 0, 0, 255]),
];

/// Sorted, immutable table of control points.
#[derive(Debug)]
pub struct LevelColors {
    points: Vec<ControlPoint>,
    inverse: OnceLock<HashMap<[u8; 4], u32>>,
}

impl LevelColors {
    /// Build a table from control points.
    ///
    /// The first point must be at level 0 and levels must be strictly
    /// increasing. The last level is the maximum iteration count the table
    /// can color.
    pub fn new(points: Vec<ControlPoint>) -> Result<Self, PaletteError> {
        if points.len() < 2 {
            return Err(PaletteError::TooFewPoints(points.len()));
        }
        if points[0].level != 0 {
            return Err(PaletteError::FirstLevelNotZero(points[0].level));
        }
        for pair in points.windows(2) {
            if pair[1].level <= pair[0].level {
                return Err(PaletteError::NotIncreasing {
                    previous: pair[0].level,
                    level: pair[1].level,
                });
            }
        }

        Ok(Self {
            points,
            inverse: OnceLock::new(),
        })
    }

    /// The standard 1000-level ramp.
    pub fn standard() -> Self {
        Self {
            points: STANDARD_POINTS.to_vec(),
            inverse: OnceLock::new(),
        }
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Highest level covered by the table.
    pub fn max_level(&self) -> u32 {
        self.points[self.points.len() - 1].level
    }

    /// Color for an iteration level.
    ///
    /// Callers must pass `level <= max_level()`; larger levels are clamped.
    pub fn color_from_level(&self, level: u32) -> Rgba<u8> {
        debug_assert!(level <= self.max_level(), "level {} out of range", level);
        let level = level.min(self.max_level());

        let mut lo = 0;
        let mut hi = self.points.len();
        while lo < hi - 1 {
            let mid = (lo + hi) / 2;
            let mid_level = self.points[mid].level;
            if mid_level == level {
                return self.points[mid].color;
            }
            if mid_level < level {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        // `lo` is the last point at or below `level`; only level 0 can land
        // here as an exact match.
        let min = self.points[lo];
        if min.level == level {
            return min.color;
        }
        let max = self.points[hi];

        let p = (level - min.level) as f64 / (max.level - min.level) as f64;
        let mut channels = [0u8; 4];
        for (i, channel) in channels.iter_mut().enumerate() {
            let c_min = min.color.0[i] as f64;
            let c_max = max.color.0[i] as f64;
            *channel = (c_min + p * (c_max - c_min)).floor() as u8;
        }
        Rgba(channels)
    }

    /// Level that produces `color`, if any.
    ///
    /// The inverse table is built on the first call. When several levels
    /// share a color the highest one wins; control-point colors always map
    /// back to their own level.
    pub fn level_from_color(&self, color: Rgba<u8>) -> Option<u32> {
        let inverse = self.inverse.get_or_init(|| {
            let mut table = HashMap::with_capacity(self.max_level() as usize + 1);
            for level in 0..=self.max_level() {
                table.insert(self.color_from_level(level).0, level);
            }
            table
        });
        inverse.get(&color.0).copied()
    }

    /// Whether the inverse table has been built.
    pub fn has_inverse(&self) -> bool {
        self.inverse.get().is_some()
    }

    /// Drop the cached inverse table; it is rebuilt on the next lookup.
    pub fn reset_inverse(&mut self) {
        self.inverse = OnceLock::new();
    }
}

impl Default for LevelColors {
    fn default() -> Self {
        Self::standard()
    }
}
