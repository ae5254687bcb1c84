//! Image file I/O via the `image` crate.
//!
//! Whatever the file's color type, pixels are converted to 8-bit RGB
//! before encoding; alpha is dropped.

use std::path::Path;

use image::RgbImage;

use pixrec_core::{PixelSource, Rgb, RgbGrid};

/// A decoded image file exposed as a [`PixelSource`].
pub struct ImageSource {
    image: RgbImage,
}

impl ImageSource {
    /// Decode the image at `path`.
    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        let image = image::open(path)?.into_rgb8();
        Ok(Self { image })
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        Self { image }
    }
}

impl PixelSource for ImageSource {
    fn dimensions(&self) -> (usize, usize) {
        let (w, h) = self.image.dimensions();
        (w as usize, h as usize)
    }

    fn pixel_at(&self, x: usize, y: usize) -> Option<Rgb> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        self.image.get_pixel_checked(x, y).map(|p| Rgb::from(p.0))
    }
}

/// Convert a reconstructed grid into an `image` buffer.
pub fn to_rgb_image(grid: &RgbGrid) -> RgbImage {
    RgbImage::from_fn(grid.width(), grid.height(), |x, y| {
        image::Rgb(grid.get(x, y).unwrap_or_default().to_array())
    })
}

/// Encode `grid` to `path`; the format follows the file extension.
pub fn save(grid: &RgbGrid, path: &Path) -> Result<(), image::ImageError> {
    to_rgb_image(grid).save(path)
}
