//! Fractal computation.
//!
//! - [`Mandelbrot`]: escape-time iteration count for a point
//! - [`LevelColors`]: iteration level to RGBA color, and back
//! - [`Renderer`]: rasterizes a plane rectangle into an RGBA image

mod engine;
mod palette;
mod renderer;

pub use engine::{Mandelbrot, DEFAULT_MAX_ITERATIONS};
pub use palette::{ControlPoint, LevelColors};
pub use renderer::Renderer;
