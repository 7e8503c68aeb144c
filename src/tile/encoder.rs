//! PNG tile encoder and preview compositor.
//!
//! Rendered tiles are stored and served as PNG. While a tile is pending, the
//! map shows a preview cut from the nearest ancestor that already has an
//! image: the ancestor's placement in the tile's pixel space tells which part
//! of the ancestor to crop, and that part is scaled up to the tile size.
//!
//! ```text
//!   ancestor image (placement [-256, 0, 256, 512])
//!   +-----------+-----------+
//!   |           |  visible  |      crop the visible quarter,
//!   |           |  region   |  ->  resize to 256 x 256,
//!   +-----------+-----------+      flip vertically for mirrors
//!   |           |           |
//!   +-----------+-----------+
//! ```

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};

use crate::error::TileError;
use crate::geometry::PixelRect;

// =============================================================================
// PNG Encoder
// =============================================================================

/// Encodes rendered tiles to PNG and builds previews from ancestor images.
#[derive(Debug, Clone, Default)]
pub struct PngTileEncoder {}

impl PngTileEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Encode an RGBA image as PNG.
    pub fn encode(&self, image: &RgbaImage) -> Result<Bytes, TileError> {
        let mut output = Vec::new();
        PngEncoder::new(&mut output)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| TileError::EncodeError {
                message: e.to_string(),
            })?;
        Ok(Bytes::from(output))
    }

    /// Decode PNG bytes into an RGBA image.
    pub fn decode(&self, data: &[u8]) -> Result<RgbaImage, TileError> {
        let img = image::load_from_memory_with_format(data, ImageFormat::Png).map_err(|e| {
            TileError::DecodeError {
                message: e.to_string(),
            }
        })?;
        Ok(img.to_rgba8())
    }

    /// Fully transparent tile.
    pub fn blank(&self, width: u32, height: u32) -> RgbaImage {
        RgbaImage::new(width, height)
    }

    /// Draw `source` stretched over `placement` on a `width` x `height`
    /// transparent canvas.
    ///
    /// Only the part of the placement that falls inside the canvas is
    /// cropped from the source and resized.
    pub fn preview(
        &self,
        source: &RgbaImage,
        placement: PixelRect,
        width: u32,
        height: u32,
    ) -> RgbaImage {
        if placement == PixelRect::full(width, height) && source.dimensions() == (width, height) {
            return source.clone();
        }

        let left = placement.left.max(0);
        let top = placement.top.max(0);
        let right = placement.right.min(width as i64);
        let bottom = placement.bottom.min(height as i64);
        if right <= left || bottom <= top || source.width() == 0 || source.height() == 0 {
            return self.blank(width, height);
        }

        let scale_x = source.width() as f64 / placement.width() as f64;
        let scale_y = source.height() as f64 / placement.height() as f64;
        let (sx, sw) = source_span(
            left.saturating_sub(placement.left),
            right.saturating_sub(placement.left),
            scale_x,
            source.width(),
        );
        let (sy, sh) = source_span(
            top.saturating_sub(placement.top),
            bottom.saturating_sub(placement.top),
            scale_y,
            source.height(),
        );

        let crop = imageops::crop_imm(source, sx, sy, sw, sh).to_image();
        let scaled = imageops::resize(
            &crop,
            (right - left) as u32,
            (bottom - top) as u32,
            FilterType::Triangle,
        );

        if scaled.dimensions() == (width, height) {
            return scaled;
        }
        let mut canvas = self.blank(width, height);
        imageops::overlay(&mut canvas, &scaled, left, top);
        canvas
    }

    /// Build the PNG shown for a tile from the PNG of its view source.
    ///
    /// A tile showing its own image unmirrored is passed through untouched.
    pub fn compose(
        &self,
        source: &Bytes,
        placement: PixelRect,
        mirrored: bool,
        width: u32,
        height: u32,
    ) -> Result<Bytes, TileError> {
        if !mirrored && placement == PixelRect::full(width, height) {
            return Ok(source.clone());
        }

        let decoded = self.decode(source)?;
        let mut tile = self.preview(&decoded, placement, width, height);
        if mirrored {
            imageops::flip_vertical_in_place(&mut tile);
        }
        self.encode(&tile)
    }
}

/// Source pixel span `(start, len)` covering destination offsets
/// `from..to`, at least one pixel wide and inside `limit`.
fn source_span(from: i64, to: i64, scale: f64, limit: u32) -> (u32, u32) {
    let start = ((from as f64 * scale).floor() as i64).clamp(0, limit as i64 - 1);
    let end = ((to as f64 * scale).ceil() as i64).clamp(start + 1, limit as i64);
    (start as u32, (end - start) as u32)
}

// =============================================================================
// Tests
// =============================================================================
