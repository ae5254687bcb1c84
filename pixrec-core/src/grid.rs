//! In-memory pixel grids.
//!
//! [`PixelSource`] is what the encoder reads from; image decoders outside
//! this crate implement it. [`RgbGrid`] is the owned grid the reconstructor
//! builds on the receiving side.

use crate::record::Rgb;

// ── PixelSource ──────────────────────────────────────────────────

/// Read access to a raster image.
pub trait PixelSource {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (usize, usize);

    /// Color at `(x, y)`, or `None` if the source has no color there.
    fn pixel_at(&self, x: usize, y: usize) -> Option<Rgb>;
}

// ── RgbGrid ──────────────────────────────────────────────────────

/// A tightly packed, row-major grid of [`Rgb`] pixels.
///
/// Freshly allocated grids are black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbGrid {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl RgbGrid {
    /// Allocate a black `width` × `height` grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width as usize * height as usize],
        }
    }

    /// Build a grid by evaluating `f` at every coordinate.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgb) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Whether `(x, y)` lies inside the grid.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Color at `(x, y)`, or `None` when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Write `rgb` at `(x, y)`.
    ///
    /// Returns `false` and leaves the grid untouched when out of bounds.
    pub fn set(&mut self, x: u32, y: u32, rgb: Rgb) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.pixels[i] = rgb;
                true
            }
            None => false,
        }
    }

    /// Row-major view of all pixels.
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Packed `RGBRGB…` bytes, row-major.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_array()).collect()
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        self.contains(x, y)
            .then(|| y as usize * self.width as usize + x as usize)
    }
}

impl PixelSource for RgbGrid {
    fn dimensions(&self) -> (usize, usize) {
        (self.width as usize, self.height as usize)
    }

    fn pixel_at(&self, x: usize, y: usize) -> Option<Rgb> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        self.get(x, y)
    }
}

// ── Tests ────────────────────────────────────────────────────────
