use std::sync::Arc;

use crate::core::geo::PixelPoint;
use crate::layers::ShapeStyle;

/// Abstract drawing surface the painter issues calls against.
///
/// The engine performs no pixel output of its own; a frame is exactly the
/// ordered sequence of calls made on this trait. Tile image bytes are
/// passed through undecoded.
pub trait DrawSurface {
    /// Blit a tile image into the rectangle at (`x`, `y`) sized `w` x `h`.
    fn draw_tile_image(&mut self, image: &Arc<Vec<u8>>, x: i32, y: i32, w: i32, h: i32);

    fn draw_line(&mut self, from: PixelPoint, to: PixelPoint, style: &ShapeStyle);

    /// Outline or fill the rectangle spanned by two corners.
    fn draw_rect(&mut self, top_left: PixelPoint, bottom_right: PixelPoint, style: &ShapeStyle);

    fn draw_polygon(&mut self, points: &[PixelPoint], style: &ShapeStyle);

    /// Marker dot centered at `center`.
    fn draw_circle(&mut self, center: PixelPoint, radius: i32, style: &ShapeStyle);

    fn draw_text(&mut self, text: &str, anchor: PixelPoint);
}
