use serde::{Deserialize, Serialize};

/// A geographical coordinate in plain floating-point degrees.
///
/// No range clamp is applied; callers feeding coordinates outside the
/// Mercator domain get whatever the projection math produces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A point in world or screen pixel space.
///
/// Valid world-space domain is `[0, tile_size * 2^zoom)` per axis; the
/// engine caps usable zoom (see [`crate::core::projection::zoom_cap`]) so
/// that these values always fit an `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn translated(&self, dx: i32, dy: i32) -> PixelPoint {
        PixelPoint::new(self.x + dx, self.y + dy)
    }
}

impl Default for PixelPoint {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// An axis-aligned bounding box of geographical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// South-west corner (minimum latitude / longitude).
    pub min: Coordinate,
    /// North-east corner (maximum latitude / longitude).
    pub max: Coordinate,
}

impl GeoBounds {
    pub fn new(min: Coordinate, max: Coordinate) -> Self {
        Self { min, max }
    }

    /// Whether this box and `other` overlap in both axes.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        !(other.max.lat < self.min.lat
            || other.min.lat > self.max.lat
            || other.max.lon < self.min.lon
            || other.min.lon > self.max.lon)
    }
}
