pub mod painter;
pub mod surface;

pub use painter::{spiral_placements, TilePlacement};
pub use surface::DrawSurface;
