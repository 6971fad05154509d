//! Pure per-frame geometry: the spiral visible-tile enumeration and the
//! horizontal wrap-duplication solvers for overlay shapes.
//!
//! Everything here is plain arithmetic over screen pixels so it can be
//! exercised without a tile source, a cache, or a runtime; the [`Map`]
//! facade feeds the results to a [`DrawSurface`].
//!
//! [`Map`]: crate::core::map::Map
//! [`DrawSurface`]: crate::render::surface::DrawSurface

use crate::core::constants::MARKER_OVERSCAN;
use crate::core::geo::PixelPoint;

/// Clock-wise moves for spiral tile painting: right, down, left, up.
const MOVES: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// One tile slot produced by the spiral enumeration.
///
/// `tile_x` / `tile_y` are raw grid indices and may lie outside
/// `[0, 2^zoom)`; wrapping (or clipping) happens at lookup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePlacement {
    pub tile_x: i32,
    pub tile_y: i32,
    /// Screen position of the tile's top-left corner.
    pub pos: PixelPoint,
}

/// Enumerate visible tiles in a clockwise expanding spiral starting at the
/// tile under the screen center.
///
/// The initial direction is chosen so the first two legs of the spiral
/// face the nearer screen edges. Leg length grows by one every two
/// direction changes; enumeration stops after the first full sweep that
/// places no tile inside the visibility rectangle
/// `[-tile_size, width] x [-tile_size, height]`.
pub fn spiral_placements(
    center: PixelPoint,
    tile_size: i32,
    width: i32,
    height: i32,
) -> Vec<TilePlacement> {
    // Java-style truncating division and remainder, matching how the
    // center pixel is carried when it goes negative under scroll wrap.
    let mut tile_x = center.x / tile_size;
    let mut tile_y = center.y / tile_size;
    let offs_x = center.x % tile_size;
    let offs_y = center.y % tile_size;

    let w2 = width / 2;
    let h2 = height / 2;
    let mut pos_x = w2 - offs_x;
    let mut pos_y = h2 - offs_y;

    let start_left = offs_x < tile_size - offs_x;
    let start_top = offs_y < tile_size - offs_y;
    let mut i_move = match (start_top, start_left) {
        (true, true) => 2,
        (true, false) => 3,
        (false, true) => 1,
        (false, false) => 0,
    };

    let x_min = -tile_size;
    let y_min = -tile_size;
    let x_max = width;
    let y_max = height;

    let mut placements = Vec::new();
    let mut painted = true;
    let mut leg = 0;
    while painted {
        painted = false;
        for i in 0..4 {
            if i % 2 == 0 {
                leg += 1;
            }
            for _ in 0..leg {
                if x_min <= pos_x && pos_x <= x_max && y_min <= pos_y && pos_y <= y_max {
                    placements.push(TilePlacement {
                        tile_x,
                        tile_y,
                        pos: PixelPoint::new(pos_x, pos_y),
                    });
                    painted = true;
                }
                let (dx, dy) = MOVES[i_move];
                pos_x += dx * tile_size;
                pos_y += dy * tile_size;
                tile_x += dx;
                tile_y += dy;
            }
            i_move = (i_move + 1) % MOVES.len();
        }
    }
    placements
}

/// Screen x positions at which a wrapped marker is drawn: the base
/// position first, then leftward copies while `x >= -overscan`, then
/// rightward copies while `x <= width + overscan`.
pub fn marker_wrap_positions(x: i32, map_size: i32, width: i32) -> Vec<i32> {
    let mut positions = vec![x];
    let mut wrapped = x;
    loop {
        wrapped -= map_size;
        if wrapped < -MARKER_OVERSCAN {
            break;
        }
        positions.push(wrapped);
    }
    wrapped = x;
    loop {
        wrapped += map_size;
        if wrapped > width + MARKER_OVERSCAN {
            break;
        }
        positions.push(wrapped);
    }
    positions
}

/// Horizontal offsets (base offset 0 first) at which a wrapped rectangle
/// is drawn: leftward while the shifted right edge stays >= 0, rightward
/// while the shifted left edge stays <= width.
pub fn rect_wrap_offsets(left: i32, right: i32, map_size: i32, width: i32) -> Vec<i32> {
    let mut offsets = vec![0];
    let mut off = 0;
    loop {
        off -= map_size;
        if right + off < 0 {
            break;
        }
        offsets.push(off);
    }
    off = 0;
    loop {
        off += map_size;
        if left + off > width {
            break;
        }
        offsets.push(off);
    }
    offsets
}

/// Wrapped copies of a projected polygon, base copy first.
///
/// Copies are shifted whole-point-set by `map_size` per step; the copy
/// that first crosses the screen edge is still emitted (draw before
/// check), so each direction produces at least one copy.
pub fn polygon_wrap_copies(
    points: &[PixelPoint],
    map_size: i32,
    width: i32,
) -> Vec<Vec<PixelPoint>> {
    let mut copies = vec![points.to_vec()];

    let mut shifted = points.to_vec();
    loop {
        let mut crossed = false;
        for p in &mut shifted {
            p.x -= map_size;
            if p.x < 0 {
                crossed = true;
            }
        }
        copies.push(shifted.clone());
        if crossed {
            break;
        }
    }

    let mut shifted = points.to_vec();
    loop {
        let mut crossed = false;
        for p in &mut shifted {
            p.x += map_size;
            if p.x > width {
                crossed = true;
            }
        }
        copies.push(shifted.clone());
        if crossed {
            break;
        }
    }

    copies
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Brute-force set of tile indices whose screen rectangle intersects
    /// the visibility rectangle, using the same inclusive bounds as the
    /// spiral.
    fn brute_force_tiles(
        center: PixelPoint,
        tile_size: i32,
        width: i32,
        height: i32,
    ) -> HashSet<(i32, i32)> {
        let origin_x = center.x - width / 2;
        let origin_y = center.y - height / 2;
        let mut expected = HashSet::new();
        for tx in -20..40 {
            for ty in -20..40 {
                let pos_x = tx * tile_size - origin_x;
                let pos_y = ty * tile_size - origin_y;
                if -tile_size <= pos_x && pos_x <= width && -tile_size <= pos_y && pos_y <= height
                {
                    expected.insert((tx, ty));
                }
            }
        }
        expected
    }

    #[test]
    fn test_spiral_completeness_and_uniqueness() {
        let center = PixelPoint::new(1000, 1100);
        let placements = spiral_placements(center, 256, 512, 512);

        let mut seen = HashSet::new();
        for p in &placements {
            assert!(
                seen.insert((p.tile_x, p.tile_y)),
                "duplicate tile {:?}",
                (p.tile_x, p.tile_y)
            );
        }
        assert_eq!(seen, brute_force_tiles(center, 256, 512, 512));
    }

    #[test]
    fn test_spiral_positions_are_consistent() {
        let center = PixelPoint::new(700, 900);
        for p in spiral_placements(center, 256, 512, 512) {
            assert_eq!(p.pos.x, p.tile_x * 256 - (center.x - 256));
            assert_eq!(p.pos.y, p.tile_y * 256 - (center.y - 256));
        }
    }

    #[test]
    fn test_spiral_starts_at_center_tile() {
        let center = PixelPoint::new(1000, 1100);
        let placements = spiral_placements(center, 256, 512, 512);
        assert_eq!(placements[0].tile_x, center.x / 256);
        assert_eq!(placements[0].tile_y, center.y / 256);
    }

    #[test]
    fn test_marker_wrap_single_copy() {
        // a 2048-pixel world on a 400-pixel screen: both wrapped copies
        // fall outside the overscan band
        assert_eq!(marker_wrap_positions(100, 2048, 400), vec![100]);
    }

    #[test]
    fn test_marker_wrap_wide_screen() {
        // widening the screen to 5000 keeps the rightward copies at
        // 100+2048 and 100+4096 while still rejecting 100-2048
        assert_eq!(marker_wrap_positions(100, 2048, 5000), vec![100, 2148, 4196]);
    }

    #[test]
    fn test_marker_wrap_overscan_boundary() {
        // a copy landing exactly at -15 is still drawn
        assert_eq!(marker_wrap_positions(2033, 2048, 400), vec![2033, -15]);
    }

    #[test]
    fn test_rect_wrap_offsets() {
        // right edge at 300: one leftward copy at offset -256 keeps its
        // right edge at 44 >= 0, the next falls off; the first rightward
        // copy already pushes the left edge past the screen
        assert_eq!(rect_wrap_offsets(200, 300, 256, 400), vec![0, -256]);
        // narrow world, wide screen: rightward copies run until the left
        // edge passes the width
        assert_eq!(rect_wrap_offsets(10, 20, 100, 250), vec![0, 100, 200]);
    }

    #[test]
    fn test_polygon_wrap_draws_crossing_copy() {
        let base = vec![
            PixelPoint::new(100, 10),
            PixelPoint::new(150, 10),
            PixelPoint::new(125, 40),
        ];
        let copies = polygon_wrap_copies(&base, 2048, 400);
        // base, one leftward crossing copy, one rightward crossing copy
        assert_eq!(copies.len(), 3);
        assert_eq!(copies[0], base);
        assert_eq!(copies[1][0], PixelPoint::new(100 - 2048, 10));
        assert_eq!(copies[2][0], PixelPoint::new(100 + 2048, 10));
    }
}
