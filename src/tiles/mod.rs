pub mod attribution;
pub mod cache;
pub mod controller;
pub mod source;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::{MapError, Result};

/// Shared async HTTP client with a custom User-Agent so public tile
/// servers don't reject the request. Building the client once avoids the
/// cost of TLS and connection pool setup for every tile.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent("tileview/0.1.0")
        .timeout(std::time::Duration::from_secs(30))
        .pool_max_idle_per_host(16)
        .build()
        .expect("failed to build reqwest async client")
});

/// Transport collaborator used for tile images and provider metadata.
///
/// Injected so the engine stays free of concrete network assumptions;
/// tests swap in canned or failing fetchers.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Default [`Fetcher`] backed by the shared `reqwest` client.
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher;

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = HTTP_CLIENT.get(url).send().await?;
        if !response.status().is_success() {
            return Err(MapError::TileFetch(format!("HTTP {} for {}", response.status(), url)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

pub use cache::{Tile, TileCache, TileKey};
pub use controller::TileController;
pub use source::{QuadkeySource, SlippyTileSource, TileSource};
