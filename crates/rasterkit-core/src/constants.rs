//! Workspace-wide constants.

/// Maximum tile edge length in pixels.
///
/// Larger images are split into a grid of tiles no bigger than this on
/// either axis.
pub const DEFAULT_BUFFER_SIZE: u32 = 2048;

/// Largest number of decimals accepted for an emitted coordinate or power value.
pub const MAX_PRECISION: u8 = 10;
