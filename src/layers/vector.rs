use crate::core::geo::Coordinate;
use crate::layers::{Color, ShapeStyle};

/// An axis-aligned rectangle overlay spanning two geographic corners.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRectangle {
    pub top_left: Coordinate,
    pub bottom_right: Coordinate,
    pub visible: bool,
    pub paint: ShapeStyle,
}

impl MapRectangle {
    pub fn new(top_left: Coordinate, bottom_right: Coordinate) -> Self {
        Self {
            top_left,
            bottom_right,
            visible: true,
            paint: ShapeStyle::stroked(Color::BLUE),
        }
    }

    pub fn with_paint(mut self, paint: ShapeStyle) -> Self {
        self.paint = paint;
        self
    }
}

/// A closed polygon overlay. Needs at least three points to be painted;
/// a polygon with fewer points (or any unprojectable point) is skipped
/// for the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPolygon {
    pub points: Vec<Coordinate>,
    pub visible: bool,
    pub paint: ShapeStyle,
}

impl MapPolygon {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self {
            points,
            visible: true,
            paint: ShapeStyle::filled(Color::BLACK, Color::rgba(0, 0, 255, 64)),
        }
    }

    pub fn with_paint(mut self, paint: ShapeStyle) -> Self {
        self.paint = paint;
        self
    }
}
