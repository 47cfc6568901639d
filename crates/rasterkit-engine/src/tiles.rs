//! Tiled pixel storage
//!
//! The scaled image is held as a grid of tiles no larger than the buffer
//! size on either axis. [`TileGrid`] builds the tiles on the producer side;
//! [`TileStore`] receives them inside the engine and answers power queries.

use crate::source::PixelSource;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rasterkit_core::{
    tile_extent, GridSize, ImageSize, PixelCoord, ProtocolError, RangeError, Result, TileCoord,
};
use tracing::debug;

/// Raw burn intensity lookup (0 = no burn, 255 = full burn).
pub trait PowerSource {
    fn raw_power(&self, coord: PixelCoord) -> Result<f64>;
}

/// One rectangular RGBA chunk of the scaled image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    coord: TileCoord,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Tile {
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Give up the tile's bytes, e.g. to move them into an engine message.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// RGBA bytes at tile-local `(x, y)`, origin top-left.
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

/// The scaled image split into tiles, ready to be handed to the engine.
#[derive(Debug, Clone)]
pub struct TileGrid {
    image_size: ImageSize,
    grid_size: GridSize,
    buffer_size: u32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Scale `source` to `image_size` and cut it into tiles.
    ///
    /// The scaled image is composited over opaque white, so transparent
    /// pixels never burn. Smoothing selects a linear filter instead of
    /// nearest neighbour. Tiles are stored row-major.
    pub fn build<S: PixelSource + ?Sized>(
        source: &S,
        image_size: ImageSize,
        buffer_size: u32,
        smoothing: bool,
    ) -> Self {
        let canvas = compose(source, image_size, smoothing);
        let grid_size = GridSize::for_image(image_size, buffer_size);

        let tiles = grid_size
            .coords()
            .map(|coord| {
                let width = tile_extent(coord.x, image_size.width, buffer_size);
                let height = tile_extent(coord.y, image_size.height, buffer_size);
                let data = imageops::crop_imm(
                    &canvas,
                    coord.x * buffer_size,
                    coord.y * buffer_size,
                    width,
                    height,
                )
                .to_image()
                .into_raw();

                debug!(x = coord.x, y = coord.y, width, height, "Tile built");
                Tile {
                    coord,
                    width,
                    height,
                    data,
                }
            })
            .collect();

        Self {
            image_size,
            grid_size,
            buffer_size,
            tiles,
        }
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    pub fn grid_size(&self) -> GridSize {
        self.grid_size
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile at grid position `(x, y)`.
    pub fn tile(&self, x: u32, y: u32) -> Option<&Tile> {
        let coord = TileCoord { x, y };
        self.grid_size
            .contains(coord)
            .then(|| &self.tiles[(y * self.grid_size.x + x) as usize])
    }

    pub fn into_tiles(self) -> Vec<Tile> {
        self.tiles
    }
}

/// White canvas of `size` with the scaled source laid over it.
fn compose<S: PixelSource + ?Sized>(source: &S, size: ImageSize, smoothing: bool) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(size.width, size.height, Rgba([255; 4]));
    let (width, height) = source.dimensions();
    if size.is_empty() || width == 0 || height == 0 {
        return canvas;
    }

    let raster = source.to_rgba_image();
    let scaled = if (width, height) == (size.width, size.height) {
        raster
    } else {
        let filter = if smoothing {
            FilterType::Triangle
        } else {
            FilterType::Nearest
        };
        imageops::resize(&raster, size.width, size.height, filter)
    };

    imageops::overlay(&mut canvas, &scaled, 0, 0);
    canvas
}

/// Engine-side tile storage answering power queries.
#[derive(Debug)]
pub struct TileStore {
    image_size: ImageSize,
    grid_size: GridSize,
    buffer_size: u32,
    cells: Vec<Option<Tile>>,
}

impl TileStore {
    /// Empty store for an image of `image_size` split into `grid_size` tiles.
    ///
    /// Fails when the grid does not match the image and buffer size.
    pub fn new(image_size: ImageSize, grid_size: GridSize, buffer_size: u32) -> Result<Self> {
        if buffer_size == 0 || GridSize::for_image(image_size, buffer_size) != grid_size {
            return Err(ProtocolError::GridMismatch {
                x: grid_size.x,
                y: grid_size.y,
                width: image_size.width,
                height: image_size.height,
                buffer_size,
            }
            .into());
        }

        Ok(Self {
            image_size,
            grid_size,
            buffer_size,
            cells: (0..grid_size.tile_count()).map(|_| None).collect(),
        })
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    pub fn grid_size(&self) -> GridSize {
        self.grid_size
    }

    /// Store the bytes of tile `coord`; a repeated tile replaces the earlier one.
    pub fn insert(&mut self, coord: TileCoord, data: Vec<u8>) -> Result<()> {
        if !self.grid_size.contains(coord) {
            return Err(ProtocolError::TileOutOfGrid {
                x: coord.x,
                y: coord.y,
                grid_x: self.grid_size.x,
                grid_y: self.grid_size.y,
            }
            .into());
        }

        let width = tile_extent(coord.x, self.image_size.width, self.buffer_size);
        let height = tile_extent(coord.y, self.image_size.height, self.buffer_size);
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ProtocolError::TileSizeMismatch {
                x: coord.x,
                y: coord.y,
                expected,
                actual: data.len(),
            }
            .into());
        }

        let index = self.index(coord);
        self.cells[index] = Some(Tile {
            coord,
            width,
            height,
            data,
        });
        Ok(())
    }

    /// First grid cell that has not been received yet.
    pub fn first_missing(&self) -> Option<TileCoord> {
        self.grid_size
            .coords()
            .find(|&coord| self.cells[self.index(coord)].is_none())
    }

    fn index(&self, coord: TileCoord) -> usize {
        (coord.y * self.grid_size.x + coord.x) as usize
    }
}

impl PowerSource for TileStore {
    /// Inverted gray level at scan position `coord`.
    ///
    /// Scan rows count from the bottom of the image, tiles from the top.
    fn raw_power(&self, coord: PixelCoord) -> Result<f64> {
        let ImageSize { width, height } = self.image_size;
        if coord.x >= width {
            return Err(RangeError::X { x: coord.x, width }.into());
        }
        if coord.y >= height {
            return Err(RangeError::Y { y: coord.y, height }.into());
        }

        let x = coord.x;
        let y = height - coord.y - 1;
        let tile_coord = TileCoord {
            x: x / self.buffer_size,
            y: y / self.buffer_size,
        };
        let tile = self.cells[self.index(tile_coord)]
            .as_ref()
            .ok_or(ProtocolError::MissingTile {
                x: tile_coord.x,
                y: tile_coord.y,
            })?;

        let [r, g, b, _] = tile.rgba(
            x - tile_coord.x * self.buffer_size,
            y - tile_coord.y * self.buffer_size,
        );
        Ok(255.0 - (r as f64 + g as f64 + b as f64) / 3.0)
    }
}
