//! Engine-wide constants.

/// Highest zoom level any tile source may advertise.
pub const MAX_ZOOM: u8 = 24;

/// Lowest zoom level any tile source may advertise.
pub const MIN_ZOOM: u8 = 0;

/// Default edge length of a square tile in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default number of tiles held by the in-memory cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Pixel margin beyond the screen edge within which a wrapped marker copy
/// is still drawn; allows markers up to ~30 px wide to scroll off
/// gracefully instead of popping at the boundary.
pub const MARKER_OVERSCAN: i32 = 15;
