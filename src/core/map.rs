//! The map facade: viewport state, overlay collections, and the
//! per-frame paint pass that turns all of it into [`DrawSurface`] calls.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::core::constants::MAX_ZOOM;
use crate::core::geo::{Coordinate, PixelPoint};
use crate::core::projection;
use crate::core::viewport::Viewport;
use crate::events::{EventBus, MapEvent};
use crate::layers::marker::{MapMarker, MarkerStyle};
use crate::layers::vector::{MapPolygon, MapRectangle};
use crate::layers::{Color, ShapeStyle};
use crate::render::painter::{
    marker_wrap_positions, polygon_wrap_copies, rect_wrap_offsets, spiral_placements,
};
use crate::render::surface::DrawSurface;
use crate::tiles::cache::TileCache;
use crate::tiles::controller::TileController;
use crate::tiles::source::{SlippyTileSource, TileSource};
use crate::tiles::{Fetcher, HttpFetcher};
use crate::{MapError, Result};

pub struct Map {
    viewport: Viewport,
    controller: TileController,
    events: EventBus,

    markers: Vec<MapMarker>,
    rectangles: Vec<MapRectangle>,
    polygons: Vec<MapPolygon>,

    markers_visible: bool,
    rectangles_visible: bool,
    polygons_visible: bool,
    tile_grid_visible: bool,
    scroll_wrap_enabled: bool,

    border_paint: ShapeStyle,
}

impl Map {
    /// A map over the standard OpenStreetMap layer with the default HTTP
    /// transport.
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_source(
            width,
            height,
            Arc::new(SlippyTileSource::openstreetmap()),
            Arc::new(HttpFetcher),
        )
    }

    pub fn with_source(
        width: i32,
        height: i32,
        source: Arc<dyn TileSource>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let events = EventBus::new();
        let cache = TileCache::new(crate::core::constants::DEFAULT_CACHE_CAPACITY);
        let controller = TileController::new(source, cache, fetcher, events.clone());
        Self {
            viewport: Viewport::new(width, height),
            controller,
            events,
            markers: Vec::new(),
            rectangles: Vec::new(),
            polygons: Vec::new(),
            markers_visible: true,
            rectangles_visible: true,
            polygons_visible: true,
            tile_grid_visible: false,
            scroll_wrap_enabled: false,
            border_paint: ShapeStyle::stroked(Color::BLACK),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn zoom(&self) -> u8 {
        self.viewport.zoom
    }

    pub fn source(&self) -> &Arc<dyn TileSource> {
        self.controller.source()
    }

    pub fn controller(&self) -> &TileController {
        &self.controller
    }

    /// Receive map events (pans, zooms, redraw requests from finished
    /// tile fetches).
    pub fn subscribe(&self) -> Receiver<MapEvent> {
        self.events.subscribe()
    }

    /// Highest zoom this map can actually display: the source's limit,
    /// further capped so world pixel coordinates fit an `i32`.
    pub fn max_usable_zoom(&self) -> u8 {
        let source = self.controller.source();
        source.max_zoom().min(projection::zoom_cap(source.tile_size()))
    }

    // ------------------------------------------------------------------
    // position and zoom

    /// Geographic coordinate at the screen center.
    pub fn position(&self) -> Coordinate {
        self.get_position(PixelPoint::new(
            self.viewport.width / 2,
            self.viewport.height / 2,
        ))
    }

    /// Geographic coordinate under an arbitrary screen point.
    pub fn get_position(&self, screen: PixelPoint) -> Coordinate {
        self.viewport.position(self.controller.source().as_ref(), screen)
    }

    /// Put `coord` under the screen center at the given zoom.
    pub fn set_display_position(&mut self, coord: Coordinate, zoom: u8) -> Result<()> {
        let screen = PixelPoint::new(self.viewport.width / 2, self.viewport.height / 2);
        self.set_display_position_at(screen, coord, zoom)
    }

    /// Put `coord` under the screen point `screen` at the given zoom.
    ///
    /// The single mutator for the viewport: every pan, zoom and fit
    /// operation funnels through here.
    pub fn set_display_position_at(
        &mut self,
        screen: PixelPoint,
        coord: Coordinate,
        zoom: u8,
    ) -> Result<()> {
        let source = self.controller.source();
        if zoom < source.min_zoom() || zoom > self.max_usable_zoom() {
            return Err(MapError::Configuration(format!(
                "zoom {} outside displayable range {}..={}",
                zoom,
                source.min_zoom(),
                self.max_usable_zoom()
            )));
        }
        let world = source.to_pixel(coord, zoom);
        self.set_display_position_world(screen, world, zoom);
        Ok(())
    }

    fn set_display_position_world(&mut self, screen: PixelPoint, world: PixelPoint, zoom: u8) {
        self.viewport.center = PixelPoint::new(
            world.x - screen.x + self.viewport.width / 2,
            world.y - screen.y + self.viewport.height / 2,
        );
        self.viewport.zoom = zoom;
    }

    /// Pan the viewport by a pixel delta.
    pub fn move_map(&mut self, dx: i32, dy: i32) {
        self.controller.cancel_outstanding();
        self.viewport.center.x += dx;
        self.viewport.center.y += dy;
        self.events.publish(MapEvent::Moved);
    }

    /// Change zoom, keeping the screen center anchored. Out-of-range or
    /// unchanged zoom levels are ignored.
    pub fn set_zoom(&mut self, zoom: u8) {
        let anchor = PixelPoint::new(self.viewport.width / 2, self.viewport.height / 2);
        self.set_zoom_at(zoom, anchor);
    }

    /// Change zoom, keeping the geographic point under `anchor` fixed on
    /// screen (the mouse-wheel case).
    pub fn set_zoom_at(&mut self, zoom: u8, anchor: PixelPoint) {
        let source = self.controller.source();
        if zoom < source.min_zoom() || zoom > self.max_usable_zoom() || zoom == self.viewport.zoom {
            return;
        }
        let old = self.viewport.zoom;
        let anchor_coord = self.get_position(anchor);
        self.controller.cancel_outstanding();
        // range was checked above, the anchored reposition cannot fail
        let _ = self.set_display_position_at(anchor, anchor_coord, zoom);
        self.events.publish(MapEvent::ZoomChanged { old, new: zoom });
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.viewport.zoom.saturating_add(1));
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.viewport.zoom.saturating_sub(1));
    }

    pub fn zoom_in_at(&mut self, anchor: PixelPoint) {
        self.set_zoom_at(self.viewport.zoom.saturating_add(1), anchor);
    }

    pub fn zoom_out_at(&mut self, anchor: PixelPoint) {
        self.set_zoom_at(self.viewport.zoom.saturating_sub(1), anchor);
    }

    /// Move and zoom so every selected overlay element is visible, as
    /// zoomed-in as the viewport allows.
    ///
    /// Elements are projected once at the highest displayable zoom; the
    /// bounding box is then halved per zoom step until it fits.
    pub fn fit_to_elements(&mut self, markers: bool, rectangles: bool, polygons: bool) {
        let cap = self.max_usable_zoom();
        let source = self.controller.source();

        let mut x_min = i32::MAX;
        let mut y_min = i32::MAX;
        let mut x_max = i32::MIN;
        let mut y_max = i32::MIN;
        let mut extend = |p: PixelPoint| {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.y);
        };

        if markers {
            for marker in self.markers.iter().filter(|m| m.visible) {
                extend(source.to_pixel(marker.coord, cap));
            }
        }
        if rectangles {
            for rect in self.rectangles.iter().filter(|r| r.visible) {
                extend(source.to_pixel(rect.top_left, cap));
                extend(source.to_pixel(rect.bottom_right, cap));
            }
        }
        if polygons {
            for polygon in self.polygons.iter().filter(|p| p.visible) {
                for &point in &polygon.points {
                    extend(source.to_pixel(point, cap));
                }
            }
        }
        if x_min > x_max {
            return;
        }

        let width = self.viewport.width.max(0);
        let height = self.viewport.height.max(0);
        let mut new_zoom = cap;
        let mut x = x_max - x_min;
        let mut y = y_max - y_min;
        while x > width || y > height {
            if new_zoom == 0 {
                break;
            }
            new_zoom -= 1;
            x >>= 1;
            y >>= 1;
        }
        let scale = 1 << (cap - new_zoom);
        let center = PixelPoint::new(
            (x_min + (x_max - x_min) / 2) / scale,
            (y_min + (y_max - y_min) / 2) / scale,
        );
        let screen = PixelPoint::new(self.viewport.width / 2, self.viewport.height / 2);
        self.controller.cancel_outstanding();
        self.set_display_position_world(screen, center, new_zoom);
        self.events.publish(MapEvent::Moved);
    }

    /// Swap the tile source, preserving the displayed position.
    ///
    /// Sources whose zoom range falls outside the engine's supported
    /// `0..=24` window are rejected.
    pub fn set_tile_source(&mut self, source: Arc<dyn TileSource>) -> Result<()> {
        if source.max_zoom() > MAX_ZOOM {
            return Err(MapError::Configuration(format!(
                "tile source '{}' max zoom {} exceeds the supported maximum {}",
                source.id(),
                source.max_zoom(),
                MAX_ZOOM
            )));
        }
        // an unsigned min_zoom can never undershoot MIN_ZOOM, but it can
        // leave no displayable zoom at all once the i32 pixel cap is
        // applied to max_zoom
        let usable_max = source
            .max_zoom()
            .min(projection::zoom_cap(source.tile_size()));
        if source.min_zoom() > usable_max {
            return Err(MapError::Configuration(format!(
                "tile source '{}' min zoom {} exceeds its displayable maximum {}",
                source.id(),
                source.min_zoom(),
                usable_max
            )));
        }

        let position = self.position();
        self.controller.set_source(source);

        // clamp the current zoom into the new source's range, keeping the
        // screen center on the same coordinate
        let min = self.controller.source().min_zoom();
        let max = self.max_usable_zoom();
        let zoom = self.viewport.zoom.clamp(min, max);
        let _ = self.set_display_position(position, zoom);

        self.events.publish(MapEvent::SourceChanged);
        Ok(())
    }

    // ------------------------------------------------------------------
    // overlays

    pub fn add_marker(&mut self, marker: MapMarker) {
        self.markers.push(marker);
    }

    pub fn remove_marker(&mut self, marker: &MapMarker) {
        self.markers.retain(|m| m != marker);
    }

    pub fn clear_markers(&mut self) {
        self.markers.clear();
    }

    pub fn markers(&self) -> &[MapMarker] {
        &self.markers
    }

    pub fn add_rectangle(&mut self, rectangle: MapRectangle) {
        self.rectangles.push(rectangle);
    }

    pub fn remove_rectangle(&mut self, rectangle: &MapRectangle) {
        self.rectangles.retain(|r| r != rectangle);
    }

    pub fn clear_rectangles(&mut self) {
        self.rectangles.clear();
    }

    pub fn rectangles(&self) -> &[MapRectangle] {
        &self.rectangles
    }

    pub fn add_polygon(&mut self, polygon: MapPolygon) {
        self.polygons.push(polygon);
    }

    pub fn remove_polygon(&mut self, polygon: &MapPolygon) {
        self.polygons.retain(|p| p != polygon);
    }

    pub fn clear_polygons(&mut self) {
        self.polygons.clear();
    }

    pub fn polygons(&self) -> &[MapPolygon] {
        &self.polygons
    }

    pub fn set_markers_visible(&mut self, visible: bool) {
        self.markers_visible = visible;
    }

    pub fn set_rectangles_visible(&mut self, visible: bool) {
        self.rectangles_visible = visible;
    }

    pub fn set_polygons_visible(&mut self, visible: bool) {
        self.polygons_visible = visible;
    }

    pub fn set_tile_grid_visible(&mut self, visible: bool) {
        self.tile_grid_visible = visible;
    }

    pub fn is_scroll_wrap_enabled(&self) -> bool {
        self.scroll_wrap_enabled
    }

    /// With scroll wrap on, the map repeats horizontally: tiles wrap
    /// modulo the grid and overlays are re-drawn once per world copy
    /// crossing the viewport.
    pub fn set_scroll_wrap_enabled(&mut self, enabled: bool) {
        self.scroll_wrap_enabled = enabled;
    }

    // ------------------------------------------------------------------
    // painting

    /// Paint one frame: tiles in spiral order, the world border, then
    /// polygons, rectangles and markers, then attribution.
    pub fn paint(&mut self, surface: &mut dyn DrawSurface) {
        let source = Arc::clone(self.controller.source());
        let tile_size = source.tile_size() as i32;
        let zoom = self.viewport.zoom;
        let grid = 1i32 << zoom;
        let map_size64 = self.controller.world_size(zoom);

        for placement in spiral_placements(
            self.viewport.center,
            tile_size,
            self.viewport.width,
            self.viewport.height,
        ) {
            let tile_x = if self.scroll_wrap_enabled {
                placement.tile_x.rem_euclid(grid)
            } else if placement.tile_x < 0 || placement.tile_x >= grid {
                continue;
            } else {
                placement.tile_x
            };
            if placement.tile_y < 0 || placement.tile_y >= grid {
                continue;
            }
            if let Some(tile) = self.controller.get_tile(tile_x as u32, placement.tile_y as u32, zoom)
            {
                if let Some(image) = tile.image() {
                    surface.draw_tile_image(&image, placement.pos.x, placement.pos.y, tile_size, tile_size);
                }
                if self.tile_grid_visible {
                    surface.draw_rect(
                        placement.pos,
                        placement.pos.translated(tile_size, tile_size),
                        &self.border_paint,
                    );
                }
            }
        }

        self.paint_world_border(surface, map_size64);

        // wrap copies only exist while a whole world fits pixel space
        let wrap_size = if self.scroll_wrap_enabled {
            i32::try_from(map_size64).ok()
        } else {
            None
        };
        if let Some(map_size) = wrap_size {
            // keep the center pixel bounded; tile indices re-wrap anyway
            self.viewport.center.x %= map_size;
        }

        if self.polygons_visible {
            for polygon in &self.polygons {
                paint_polygon(&self.viewport, source.as_ref(), polygon, wrap_size, surface);
            }
        }
        if self.rectangles_visible {
            for rectangle in &self.rectangles {
                paint_rectangle(&self.viewport, source.as_ref(), rectangle, wrap_size, surface);
            }
        }
        if self.markers_visible {
            for marker in &self.markers {
                paint_marker(&self.viewport, source.as_ref(), marker, wrap_size, surface);
            }
        }

        let top_left = self.get_position(PixelPoint::new(0, 0));
        let bottom_right =
            self.get_position(PixelPoint::new(self.viewport.width, self.viewport.height));
        if let Some(text) = source.attribution_text(zoom, top_left, bottom_right) {
            surface.draw_text(&text, PixelPoint::new(10, self.viewport.height - 10));
        }
    }

    fn paint_world_border(&self, surface: &mut dyn DrawSurface, map_size64: i64) {
        let top_left = self.viewport.top_left();
        let top = -top_left.y;
        if self.scroll_wrap_enabled {
            // the map repeats horizontally; only the poles are edges
            let bottom = top.saturating_add(i64::min(map_size64, i32::MAX as i64) as i32);
            surface.draw_line(
                PixelPoint::new(0, top),
                PixelPoint::new(self.viewport.width, top),
                &self.border_paint,
            );
            surface.draw_line(
                PixelPoint::new(0, bottom),
                PixelPoint::new(self.viewport.width, bottom),
                &self.border_paint,
            );
        } else if let Ok(map_size) = i32::try_from(map_size64) {
            let left = -top_left.x;
            surface.draw_rect(
                PixelPoint::new(left, top),
                PixelPoint::new(left.saturating_add(map_size), top.saturating_add(map_size)),
                &self.border_paint,
            );
        }
    }
}

fn paint_marker(
    viewport: &Viewport,
    source: &dyn TileSource,
    marker: &MapMarker,
    wrap_size: Option<i32>,
    surface: &mut dyn DrawSurface,
) {
    if !marker.visible {
        return;
    }
    // only fixed-radius markers get the off-screen cull; a variable
    // radius can reach the viewport from an off-screen anchor
    let check_outside = marker.style == MarkerStyle::Fixed;
    let mut p = viewport.map_position(source, marker.coord, check_outside);
    if let Some(map_size) = wrap_size {
        // under wrap, an off-screen base position may still produce
        // visible copies
        if p.is_none() {
            p = viewport.map_position(source, marker.coord, false);
        }

        if let Some(base) = p {
            let Some(radius) = marker_radius(viewport, source, marker, base) else {
                return;
            };
            for x in marker_wrap_positions(base.x, map_size, viewport.width) {
                surface.draw_circle(PixelPoint::new(x, base.y), radius, &marker.paint);
            }
        }
        return;
    }
    if let Some(base) = p {
        if let Some(radius) = marker_radius(viewport, source, marker, base) {
            surface.draw_circle(base, radius, &marker.paint);
        }
    }
}

/// Screen radius for a marker: fixed pixels, or the projected length of
/// `radius` degrees of latitude at the marker's position.
fn marker_radius(
    viewport: &Viewport,
    source: &dyn TileSource,
    marker: &MapMarker,
    at: PixelPoint,
) -> Option<i32> {
    match marker.style {
        MarkerStyle::Fixed => Some(marker.radius as i32),
        MarkerStyle::Variable => {
            let shifted = Coordinate::new(marker.coord.lat + marker.radius, marker.coord.lon);
            let p = viewport.map_position(source, shifted, false)?;
            Some((at.y - p.y).abs())
        }
    }
}

fn paint_rectangle(
    viewport: &Viewport,
    source: &dyn TileSource,
    rectangle: &MapRectangle,
    wrap_size: Option<i32>,
    surface: &mut dyn DrawSurface,
) {
    if !rectangle.visible {
        return;
    }
    let Some(top_left) = viewport.map_position(source, rectangle.top_left, false) else {
        return;
    };
    let Some(bottom_right) = viewport.map_position(source, rectangle.bottom_right, false) else {
        return;
    };
    match wrap_size {
        Some(map_size) => {
            for off in rect_wrap_offsets(top_left.x, bottom_right.x, map_size, viewport.width) {
                surface.draw_rect(
                    top_left.translated(off, 0),
                    bottom_right.translated(off, 0),
                    &rectangle.paint,
                );
            }
        }
        None => surface.draw_rect(top_left, bottom_right, &rectangle.paint),
    }
}

fn paint_polygon(
    viewport: &Viewport,
    source: &dyn TileSource,
    polygon: &MapPolygon,
    wrap_size: Option<i32>,
    surface: &mut dyn DrawSurface,
) {
    if !polygon.visible || polygon.points.len() < 3 {
        return;
    }
    let mut projected = Vec::with_capacity(polygon.points.len());
    for &coord in &polygon.points {
        match viewport.map_position(source, coord, false) {
            Some(p) => projected.push(p),
            None => return,
        }
    }
    match wrap_size {
        Some(map_size) => {
            for copy in polygon_wrap_copies(&projected, map_size, viewport.width) {
                surface.draw_polygon(&copy, &polygon.paint);
            }
        }
        None => surface.draw_polygon(&projected, &polygon.paint),
    }
}
