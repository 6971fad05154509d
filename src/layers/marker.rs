use crate::core::geo::Coordinate;
use crate::layers::{Color, ShapeStyle};

/// How a marker's radius is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStyle {
    /// Radius is a fixed number of screen pixels, independent of zoom.
    Fixed,
    /// Radius is measured in degrees of latitude and rescales with zoom.
    Variable,
}

/// A point overlay anchored at a geographic coordinate, painted as a dot.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub coord: Coordinate,
    pub radius: f64,
    pub style: MarkerStyle,
    pub visible: bool,
    pub paint: ShapeStyle,
}

impl MapMarker {
    pub fn new(coord: Coordinate) -> Self {
        Self {
            coord,
            radius: 5.0,
            style: MarkerStyle::Fixed,
            visible: true,
            paint: ShapeStyle::filled(Color::BLACK, Color::RED),
        }
    }

    pub fn with_radius(mut self, radius: f64, style: MarkerStyle) -> Self {
        self.radius = radius;
        self.style = style;
        self
    }

    pub fn with_paint(mut self, paint: ShapeStyle) -> Self {
        self.paint = paint;
        self
    }
}
