//! Pixel sources handed to the rasterizer.
//!
//! The engine never decodes image files; it samples an already-decoded
//! RGBA raster through [`PixelSource`].

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use rasterkit_core::{ConfigurationError, Result};

/// Read-only access to a decoded RGBA raster.
pub trait PixelSource {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// RGBA bytes of the pixel at `(x, y)`, origin top-left.
    ///
    /// Callers only pass coordinates inside [`PixelSource::dimensions`].
    fn rgba(&self, x: u32, y: u32) -> [u8; 4];

    /// The whole raster as an owned image, ready for `imageops`.
    fn to_rgba_image(&self) -> RgbaImage {
        let (width, height) = self.dimensions();
        RgbaImage::from_fn(width, height, |x, y| Rgba(self.rgba(x, y)))
    }
}

impl PixelSource for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        self.get_pixel(x, y).0
    }

    fn to_rgba_image(&self) -> RgbaImage {
        self.clone()
    }
}

impl PixelSource for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        self.get_pixel(x, y).0
    }

    fn to_rgba_image(&self) -> RgbaImage {
        self.to_rgba8()
    }
}

/// An owned, tightly packed RGBA byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    image: RgbaImage,
}

impl RgbaBuffer {
    /// Wrap raw RGBA bytes; `data` must hold exactly `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        let actual = data.len();
        let image = (actual == expected)
            .then(|| RgbaImage::from_raw(width, height, data))
            .flatten()
            .ok_or_else(|| {
                ConfigurationError::invalid(
                    "source",
                    format!(
                        "{}x{} RGBA buffer needs {} bytes, got {}",
                        width, height, expected, actual
                    ),
                )
            })?;
        Ok(Self { image })
    }

    /// A buffer where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(rgba)),
        }
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        Self {
            image: RgbaImage::from_fn(width, height, |x, y| Rgba(f(x, y))),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }
}

impl PixelSource for RgbaBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    fn to_rgba_image(&self) -> RgbaImage {
        self.image.clone()
    }
}
