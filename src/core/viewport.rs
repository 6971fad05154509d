//! Viewport state: the world-pixel point under the screen center, the
//! zoom level, and the screen dimensions.

use crate::core::geo::{Coordinate, PixelPoint};
use crate::tiles::source::TileSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// World-pixel coordinate shown at the screen center.
    pub center: PixelPoint,
    pub zoom: u8,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            center: PixelPoint::new(0, 0),
            zoom: 0,
            width,
            height,
        }
    }

    /// World-pixel position of the viewport's top-left corner.
    pub fn top_left(&self) -> PixelPoint {
        PixelPoint::new(
            self.center.x - self.width / 2,
            self.center.y - self.height / 2,
        )
    }

    /// Convert a screen point to a world-pixel point.
    pub fn screen_to_world(&self, screen: PixelPoint) -> PixelPoint {
        let top_left = self.top_left();
        screen.translated(top_left.x, top_left.y)
    }

    /// Geographic coordinate under a screen point.
    pub fn position(&self, source: &dyn TileSource, screen: PixelPoint) -> Coordinate {
        source.to_coordinate(self.screen_to_world(screen), self.zoom)
    }

    /// Project a coordinate to screen space.
    ///
    /// With `check_outside`, returns `None` when the projected point
    /// falls outside the viewport.
    pub fn map_position(
        &self,
        source: &dyn TileSource,
        coord: Coordinate,
        check_outside: bool,
    ) -> Option<PixelPoint> {
        let world = source.to_pixel(coord, self.zoom);
        let top_left = self.top_left();
        let screen = PixelPoint::new(world.x - top_left.x, world.y - top_left.y);
        if check_outside && !self.contains_screen(screen) {
            return None;
        }
        Some(screen)
    }

    /// Both upper bounds are inclusive: a point projected exactly onto
    /// the right or bottom edge still counts as visible.
    pub fn contains_screen(&self, screen: PixelPoint) -> bool {
        screen.x >= 0 && screen.y >= 0 && screen.x <= self.width && screen.y <= self.height
    }
}
