//! Quadtree tile geometry.
//!
//! Converts between tile names and plane rectangles, and expresses one
//! tile's rectangle in another tile's pixel space. This is what lets an
//! ancestor's image stand in for a descendant that has not rendered yet:
//! the ancestor is drawn scaled up and offset so that the descendant's
//! region fills the tile.

use crate::geometry::{PixelRect, Rect};

use super::name::{TileCoord, TileName, MAX_ZOOM};

/// Default plane rectangle covered by the root tile.
pub const DEFAULT_ROOT_RECT: Rect = Rect::new(-2.0, -2.0, 2.0, 2.0);

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Geometry of a quadtree of tiles over a root rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileIndex {
    root: Rect,
    tile_width: u32,
    tile_height: u32,
    max_zoom: u32,
}

impl TileIndex {
    pub fn new(root: Rect, tile_width: u32, tile_height: u32) -> Self {
        Self {
            root,
            tile_width,
            tile_height,
            max_zoom: precise_zoom_limit(root, tile_width, tile_height),
        }
    }

    pub fn root_rect(&self) -> Rect {
        self.root
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Deepest zoom at which a pixel still spans more than one `f64` step
    /// anywhere in the root rectangle. Never above [`MAX_ZOOM`].
    pub fn max_zoom(&self) -> u32 {
        self.max_zoom
    }

    /// Name of the tile at `coord` and `zoom`, or `None` when off the map
    /// or deeper than [`max_zoom`](Self::max_zoom).
    pub fn tile_name(&self, coord: TileCoord, zoom: u32) -> Option<TileName> {
        if zoom > self.max_zoom {
            return None;
        }
        TileName::from_coord(coord, zoom)
    }

    /// Plane rectangle covered by a tile.
    pub fn rect_from_tile_name(&self, name: &TileName) -> Rect {
        let mut x = self.root.x0;
        let mut y = self.root.y0;
        let mut dx = self.root.width();
        let mut dy = self.root.height();

        for quadrant in name.quadrants() {
            dx /= 2.0;
            dy /= 2.0;
            if quadrant.is_right() {
                x += dx;
            }
            if quadrant.is_bottom() {
                y += dy;
            }
        }

        Rect::new(x, y, x + dx, y + dy)
    }

    /// Express a plane rectangle in the pixel space of tile `name`.
    ///
    /// Coordinates are rounded half up to whole pixels.
    pub fn pixel_rect(&self, name: &TileName, other: Rect) -> PixelRect {
        let rc = self.rect_from_tile_name(name);
        let scale_x = self.tile_width as f64 / rc.width();
        let scale_y = self.tile_height as f64 / rc.height();

        // `as` saturates, so far away rectangles pin to the i64 range
        let to_pixel =
            |v: f64, origin: f64, scale: f64| ((v - origin) * scale + 0.5).floor() as i64;

        PixelRect::new(
            to_pixel(other.x0, rc.x0, scale_x),
            to_pixel(other.y0, rc.y0, scale_y),
            to_pixel(other.x1, rc.x0, scale_x),
            to_pixel(other.y1, rc.y0, scale_y),
        )
    }

    /// Pixel position of tile `other` relative to tile `name`.
    pub fn relative_rect(&self, name: &TileName, other: &TileName) -> PixelRect {
        self.pixel_rect(name, self.rect_from_tile_name(other))
    }

    /// Nearest ancestor of `name` for which `exists` holds.
    ///
    /// The root is always assumed to exist, so the walk ends there even if
    /// `exists` rejects it. The root's own parent is the root.
    pub fn find_parent<F>(&self, name: &TileName, exists: F) -> TileName
    where
        F: Fn(&TileName) -> bool,
    {
        name.ancestors()
            .find(|ancestor| ancestor.is_root() || exists(ancestor))
            .unwrap_or_else(TileName::root)
    }
}

/// Halve the pixel size of a root tile until it reaches the spacing of
/// `f64` values at the root's largest coordinate.
fn precise_zoom_limit(root: Rect, tile_width: u32, tile_height: u32) -> u32 {
    let extent = [root.x0, root.y0, root.x1, root.y1]
        .into_iter()
        .fold(f64::MIN_POSITIVE, |acc, v| acc.max(v.abs()));
    let step = extent * f64::EPSILON;

    let pixel_width = root.width().abs() / f64::from(tile_width.max(1));
    let pixel_height = root.height().abs() / f64::from(tile_height.max(1));
    let mut pixel = pixel_width.min(pixel_height);

    let mut zoom = 0;
    while zoom < MAX_ZOOM && pixel / 2.0 > step {
        pixel /= 2.0;
        zoom += 1;
    }
    zoom
}

impl Default for TileIndex {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_RECT, DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE)
    }
}
