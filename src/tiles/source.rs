//! Tile source abstraction and the two built-in source families:
//! slippy-map template sources and quadkey-addressed sources that need
//! provider metadata before they can build URLs.

use std::sync::Arc;

use crate::core::geo::{Coordinate, PixelPoint};
use crate::core::projection;
use crate::tiles::attribution::AttributionLoader;
use crate::{MapError, Result};

/// A provider of raster map tiles.
///
/// Projection defaults delegate to the shared spherical-Mercator math;
/// sources only override them if they serve a different grid.
pub trait TileSource: Send + Sync {
    /// Stable identifier, used to partition the tile cache.
    fn id(&self) -> &str;

    /// Human-readable name for display.
    fn name(&self) -> &str {
        self.id()
    }

    fn tile_size(&self) -> u32 {
        crate::core::constants::DEFAULT_TILE_SIZE
    }

    fn min_zoom(&self) -> u8 {
        crate::core::constants::MIN_ZOOM
    }

    fn max_zoom(&self) -> u8;

    /// URL for one tile. May fail before asynchronous provider metadata
    /// is available; [`MapError::MetadataNotReady`] means try again later.
    fn tile_url(&self, zoom: u8, x: u32, y: u32) -> Result<String>;

    fn to_pixel(&self, coord: Coordinate, zoom: u8) -> PixelPoint {
        projection::to_pixel(coord, self.tile_size(), zoom)
    }

    fn to_coordinate(&self, pixel: PixelPoint, zoom: u8) -> Coordinate {
        projection::to_coordinate(pixel, self.tile_size(), zoom)
    }

    /// Attribution for the visible region, if the source carries any.
    fn attribution_text(
        &self,
        _zoom: u8,
        _top_left: Coordinate,
        _bottom_right: Coordinate,
    ) -> Option<String> {
        None
    }
}

/// Template-addressed source in the usual `{z}/{x}/{y}` style, with
/// optional subdomain rotation.
pub struct SlippyTileSource {
    id: String,
    name: String,
    url_template: String,
    subdomains: Vec<String>,
    max_zoom: u8,
    attribution: Option<String>,
}

impl SlippyTileSource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url_template: impl Into<String>,
        max_zoom: u8,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url_template: url_template.into(),
            subdomains: Vec::new(),
            max_zoom,
            attribution: None,
        }
    }

    pub fn with_subdomains(mut self, subdomains: Vec<String>) -> Self {
        self.subdomains = subdomains;
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    /// The standard OpenStreetMap raster layer.
    pub fn openstreetmap() -> Self {
        Self::new(
            "osm",
            "OpenStreetMap",
            "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            19,
        )
        .with_attribution("© OpenStreetMap contributors")
    }
}

impl TileSource for SlippyTileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    fn tile_url(&self, zoom: u8, x: u32, y: u32) -> Result<String> {
        let mut url = self
            .url_template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string());
        if !self.subdomains.is_empty() {
            let subdomain = &self.subdomains[(x as usize + y as usize) % self.subdomains.len()];
            url = url.replace("{s}", subdomain);
        }
        Ok(url)
    }

    fn attribution_text(
        &self,
        _zoom: u8,
        _top_left: Coordinate,
        _bottom_right: Coordinate,
    ) -> Option<String> {
        self.attribution.clone()
    }
}

/// Interleave the x and y bits of a tile address into a quadkey string,
/// most significant bit first. One digit per zoom level, each in 0..=3.
pub fn quadkey(zoom: u8, x: u32, y: u32) -> String {
    let mut key = String::with_capacity(zoom as usize);
    for bit in (0..zoom).rev() {
        let mut digit = 0u8;
        if x & (1 << bit) != 0 {
            digit += 1;
        }
        if y & (1 << bit) != 0 {
            digit += 2;
        }
        key.push((b'0' + digit) as char);
    }
    key
}

/// Quadkey-addressed source whose URL template, subdomains and zoom
/// limits come from asynchronously loaded provider metadata.
pub struct QuadkeySource {
    id: String,
    name: String,
    loader: Arc<AttributionLoader>,
}

impl QuadkeySource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        loader: Arc<AttributionLoader>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            loader,
        }
    }
}

impl TileSource for QuadkeySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_zoom(&self) -> u8 {
        // a zero-length quadkey addresses no tile
        1
    }

    fn max_zoom(&self) -> u8 {
        match self.loader.try_get() {
            Some(Ok(meta)) => meta.max_zoom,
            // conservative limit until the metadata arrives
            _ => 22,
        }
    }

    fn tile_url(&self, zoom: u8, x: u32, y: u32) -> Result<String> {
        let meta = match self.loader.try_get() {
            None => return Err(MapError::MetadataNotReady),
            Some(Err(e)) => return Err(e),
            Some(Ok(meta)) => meta,
        };
        let subdomain =
            &meta.subdomains[(zoom as usize + x as usize + y as usize) % meta.subdomains.len()];
        Ok(meta
            .url_template
            .replace("{subdomain}", subdomain)
            .replace("{quadkey}", &quadkey(zoom, x, y)))
    }

    fn attribution_text(
        &self,
        zoom: u8,
        top_left: Coordinate,
        bottom_right: Coordinate,
    ) -> Option<String> {
        match self.loader.try_get() {
            Some(Ok(meta)) => {
                let text = meta.attribution_text(zoom, top_left, bottom_right);
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::Fetcher;
    use async_trait::async_trait;

    #[test]
    fn test_quadkey_interleaving() {
        // x=3 (binary 011), y=5 (binary 101) at zoom 3:
        // bit 2 -> y set: 2; bit 1 -> x set: 1; bit 0 -> both set: 3
        assert_eq!(quadkey(3, 3, 5), "213");
        assert_eq!(quadkey(1, 0, 0), "0");
        assert_eq!(quadkey(1, 1, 0), "1");
        assert_eq!(quadkey(1, 0, 1), "2");
        assert_eq!(quadkey(1, 1, 1), "3");
        assert_eq!(quadkey(0, 0, 0), "");
    }

    #[test]
    fn test_slippy_url_substitution() {
        let source = SlippyTileSource::new(
            "test",
            "Test",
            "https://{s}.tiles.example/{z}/{x}/{y}.png",
            18,
        )
        .with_subdomains(vec!["a".into(), "b".into(), "c".into()]);

        assert_eq!(
            source.tile_url(5, 16, 11).unwrap(),
            "https://a.tiles.example/5/16/11.png"
        );
        // (16 + 12) % 3 == 1
        assert_eq!(
            source.tile_url(5, 16, 12).unwrap(),
            "https://b.tiles.example/5/16/12.png"
        );
    }

    #[test]
    fn test_openstreetmap_preset() {
        let source = SlippyTileSource::openstreetmap();
        assert_eq!(source.id(), "osm");
        assert_eq!(source.min_zoom(), 0);
        assert_eq!(source.max_zoom(), 19);
        assert_eq!(
            source.tile_url(0, 0, 0).unwrap(),
            "https://tile.openstreetmap.org/0/0/0.png"
        );
        assert!(source
            .attribution_text(3, Coordinate::new(80.0, -170.0), Coordinate::new(-80.0, 170.0))
            .is_some());
    }

    struct NeverFetcher;

    #[async_trait]
    impl Fetcher for NeverFetcher {
        async fn fetch(&self, _url: &str) -> crate::Result<Vec<u8>> {
            futures::future::pending().await
        }
    }

    #[test]
    fn test_quadkey_source_before_metadata() {
        // no runtime context, so the loader never starts
        let loader = Arc::new(AttributionLoader::new(
            Arc::new(NeverFetcher),
            "https://metadata.example/imagery",
        ));
        let source = QuadkeySource::new("aerial", "Aerial", loader);

        assert_eq!(source.min_zoom(), 1);
        assert_eq!(source.max_zoom(), 22);
        assert!(matches!(
            source.tile_url(3, 3, 5),
            Err(MapError::MetadataNotReady)
        ));
    }

    struct StaticFetcher(&'static str);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> crate::Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn test_quadkey_source_url_after_metadata() {
        let loader = Arc::new(AttributionLoader::new(
            Arc::new(StaticFetcher(super::super::attribution::tests::SAMPLE_METADATA)),
            "https://metadata.example/imagery",
        ));
        loader.get().await.unwrap();

        let source = QuadkeySource::new("aerial", "Aerial", loader);
        assert_eq!(source.max_zoom(), 21);

        // subdomain index (3 + 3 + 5) % 4 == 3
        let url = source.tile_url(3, 3, 5).unwrap();
        assert_eq!(
            url,
            "https://ecn.t3.tiles.example.net/tiles/a213.jpeg?g=1&mkt=en-US"
        );
    }
}
