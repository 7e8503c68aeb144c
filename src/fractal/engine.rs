//! Escape-time iteration for the Mandelbrot set.

/// Default iteration cap; matches the last level of the standard color table.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// The Mandelbrot set: `z_{n+1} = z_n² + c`, starting from `z₀ = c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mandelbrot {
    max_iterations: u32,
}

impl Mandelbrot {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Number of iterations before `(x0, y0)` escapes the radius-2 disk, or
    /// `max_iterations` if it never does.
    ///
    /// The set is symmetric about the real axis, so `y0` is folded to
    /// `|y0|` before anything else. This makes `iterations(x, y)` and
    /// `iterations(x, -y)` bit-for-bit identical.
    pub fn iterations(&self, x0: f64, y0: f64) -> u32 {
        let y0 = y0.abs();
        let mut x = x0;
        let mut y = y0;
        let y2 = y * y;

        if in_cardioid(x, y, y2) || in_period2_bulb(x, y, y2) {
            return self.max_iterations;
        }

        for i in 0..self.max_iterations {
            if x * x + y * y > 4.0 {
                return i;
            }
            let x_next = x * x - y * y + x0;
            y = 2.0 * x * y + y0;
            x = x_next;
        }

        self.max_iterations
    }
}

impl Default for Mandelbrot {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

/// Closed-form test for the main cardioid (`y` already non-negative).
#[inline]
fn in_cardioid(x: f64, y: f64, y2: f64) -> bool {
    if !(-0.75 < x && x < 0.38 && y < 0.66) {
        return false;
    }
    let q = (x - 0.25) * (x - 0.25) + y2;
    q * (q + x - 0.25) < 0.25 * y2
}

/// Disk of radius 1/4 around -1, the period-2 bulb.
#[inline]
fn in_period2_bulb(x: f64, y: f64, y2: f64) -> bool {
    if !(-1.25 < x && x < -0.75 && y < 0.25) {
        return false;
    }
    (x + 1.0) * (x + 1.0) + y2 < 1.0 / 16.0
}
