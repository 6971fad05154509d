//! Spherical-Mercator projection scaled to the power-of-two world pixel
//! space used by slippy-tile maps.
//!
//! At zoom `z` the world is a square of `tile_size * 2^z` pixels per axis.
//! Tile sources delegate their default `to_pixel` / `to_coordinate`
//! implementations to these functions.

use std::f64::consts::PI;

use crate::core::geo::{Coordinate, PixelPoint};

/// World edge length in pixels at the given zoom.
pub fn world_size(tile_size: u32, zoom: u8) -> i64 {
    (tile_size as i64) << zoom
}

/// Highest zoom level at which world pixel coordinates still fit an `i32`.
///
/// `log2(tile_size)` bits are consumed by the tile size, leaving
/// `31 - log2(tile_size)` for the tile grid: 23 for 256-pixel tiles,
/// 22 for 512-pixel tiles.
pub fn zoom_cap(tile_size: u32) -> u8 {
    (31 - tile_size.ilog2()) as u8
}

/// Forward projection: geographic degrees to world pixels.
pub fn to_pixel(coord: Coordinate, tile_size: u32, zoom: u8) -> PixelPoint {
    let size = world_size(tile_size, zoom) as f64;
    let x = (coord.lon + 180.0) / 360.0 * size;
    let lat_rad = coord.lat.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * size;
    PixelPoint::new(x.floor() as i32, y.floor() as i32)
}

/// Inverse projection: world pixels back to geographic degrees.
pub fn to_coordinate(pixel: PixelPoint, tile_size: u32, zoom: u8) -> Coordinate {
    let size = world_size(tile_size, zoom) as f64;
    let lon = pixel.x as f64 / size * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * pixel.y as f64 / size)).sinh().atan().to_degrees();
    Coordinate::new(lat, lon)
}
