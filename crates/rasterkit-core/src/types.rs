//! Geometry types shared by the tile store, scan generators and emitter.

use serde::{Deserialize, Serialize};

/// A boxed iterator for dynamic dispatch.
///
/// Used where the traversal direction is chosen at runtime.
///
/// # Example
/// ```rust
/// use rasterkit_core::BoxedIterator;
///
/// let ascending = false;
/// let iter: BoxedIterator<'_, u32> = if ascending {
///     Box::new(0..3)
/// } else {
///     Box::new((0..3).rev())
/// };
/// assert_eq!(iter.collect::<Vec<_>>(), vec![2, 1, 0]);
/// ```
pub type BoxedIterator<'a, T> = Box<dyn Iterator<Item = T> + 'a>;

/// A pixel position in scan space.
///
/// `y = 0` is the bottom row of the engraving (machine origin is bottom-left);
/// the tile store flips it back to image rows when sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelCoord {
    pub x: u32,
    pub y: u32,
}

impl PixelCoord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for PixelCoord {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for PixelCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An ordered run of pixels processed as one motion pass.
pub type Line = Vec<PixelCoord>;

/// Pixel dimensions of the scaled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, coord: PixelCoord) -> bool {
        coord.x < self.width && coord.y < self.height
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Position of a tile in the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

/// Number of tiles per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridSize {
    pub x: u32,
    pub y: u32,
}

impl GridSize {
    /// Grid covering `image` with tiles of at most `buffer_size` pixels per edge.
    pub fn for_image(image: ImageSize, buffer_size: u32) -> Self {
        Self {
            x: image.width.div_ceil(buffer_size),
            y: image.height.div_ceil(buffer_size),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.x as usize * self.y as usize
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.x < self.x && coord.y < self.y
    }

    /// Row-major iteration over every tile position.
    pub fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..self.y).flat_map(move |y| (0..self.x).map(move |x| TileCoord { x, y }))
    }
}

/// Edge length of the tile at `index` along an axis of `total` pixels.
///
/// Every tile is `buffer_size` long except the last one, which holds the
/// remainder. When `total` is an exact multiple of `buffer_size` the last
/// tile is a full tile.
pub fn tile_extent(index: u32, total: u32, buffer_size: u32) -> u32 {
    let start = index.saturating_mul(buffer_size);
    buffer_size.min(total.saturating_sub(start))
}
