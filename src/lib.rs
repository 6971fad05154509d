//! # tileview
//!
//! An interactive tile-based map rendering engine: slippy-tile and
//! quadkey tile sources, asynchronous tile loading into a bounded cache,
//! spiral visible-tile enumeration, overlay geometry with horizontal
//! wrap-around duplication, and a viewport-fit solver.
//!
//! The engine never touches pixels itself; each frame it issues an
//! ordered sequence of calls against an abstract [`render::DrawSurface`].
//! Network transport sits behind the [`tiles::Fetcher`] collaborator so
//! the whole engine is testable without sockets.

pub mod core;
pub mod events;
pub mod layers;
pub mod render;
pub mod tiles;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    geo::{Coordinate, GeoBounds, PixelPoint},
    map::Map,
    viewport::Viewport,
};

pub use crate::layers::{
    marker::{MapMarker, MarkerStyle},
    vector::{MapPolygon, MapRectangle},
    Color, ShapeStyle,
};

pub use crate::events::{EventBus, MapEvent};

pub use crate::render::surface::DrawSurface;

pub use crate::tiles::{
    attribution::{AttributionEntry, AttributionLoader, ProviderMetadata},
    cache::{Tile, TileCache, TileKey},
    controller::TileController,
    source::{QuadkeySource, SlippyTileSource, TileSource},
    Fetcher, HttpFetcher,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// Tile URL requested before the provider metadata finished loading.
    /// Callers skip the tile for the current frame and retry later.
    #[error("provider metadata not loaded yet")]
    MetadataNotReady,

    /// Provider metadata fetched but unusable. Terminal: re-raised to
    /// every caller until process restart.
    #[error("provider metadata error: {0}")]
    Metadata(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("tile fetch failed: {0}")]
    TileFetch(String),
}

/// Error type alias for convenience
pub type Error = MapError;
