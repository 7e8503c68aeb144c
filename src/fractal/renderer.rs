//! Rasterize a rectangle of the complex plane into RGBA pixels.

use image::RgbaImage;

use crate::geometry::Rect;

use super::engine::Mandelbrot;
use super::palette::LevelColors;

/// Renders plane rectangles using an iteration engine and a color table.
///
/// `Renderer` holds no mutable state and is shared with the background
/// worker through an `Arc`.
#[derive(Debug)]
pub struct Renderer {
    fractal: Mandelbrot,
    colors: LevelColors,
}

impl Renderer {
    /// Create a renderer whose iteration cap is the color table's last level.
    pub fn new(colors: LevelColors) -> Self {
        Self {
            fractal: Mandelbrot::new(colors.max_level()),
            colors,
        }
    }

    pub fn fractal(&self) -> &Mandelbrot {
        &self.fractal
    }

    pub fn colors(&self) -> &LevelColors {
        &self.colors
    }

    /// Render `rect` into a `width` x `height` image.
    ///
    /// Each pixel samples the plane at its center, so tiles that touch the
    /// real axis stay exactly mirror-symmetric.
    pub fn render(&self, rect: &Rect, width: u32, height: u32) -> RgbaImage {
        let dx = rect.width() / width as f64;
        let dy = rect.height() / height as f64;

        RgbaImage::from_fn(width, height, |ix, iy| {
            let x = rect.x0 + dx * (ix as f64 + 0.5);
            let y = rect.y0 + dy * (iy as f64 + 0.5);
            let level = self.fractal.iterations(x, y);
            self.colors.color_from_level(level)
        })
    }

    /// Render the color key: one column per level, from 0 on the left to the
    /// maximum on the right.
    pub fn render_key(&self, width: u32, height: u32) -> RgbaImage {
        let max = self.colors.max_level() as u64;
        let span = width.saturating_sub(1).max(1) as u64;

        RgbaImage::from_fn(width, height, |x, _| {
            let level = (max * x as u64 / span).min(max) as u32;
            self.colors.color_from_level(level)
        })
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(LevelColors::standard())
    }
}
