//! Provider attribution metadata: one-shot background load, memoized for
//! the process lifetime.
//!
//! Quadkey-addressed sources cannot build tile URLs until the provider's
//! imagery metadata (URL template, subdomains, zoom limits, attribution
//! entries) has been fetched. The first caller to need it starts exactly
//! one background task; everyone else waits on the same pending result.
//! A mutex guards only the idle-to-pending transition; waiting happens
//! on a watch channel outside the lock, so readers are never serialized
//! once the load is underway.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;

use crate::core::geo::{Coordinate, GeoBounds};
use crate::tiles::Fetcher;
use crate::{MapError, Result};

/// One provider attribution line with the zoom range and coverage area
/// it applies to. Immutable once the metadata load succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionEntry {
    pub text: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub bounds: GeoBounds,
}

/// Parsed imagery metadata for a quadkey-addressed provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMetadata {
    /// Tile URL template carrying `{subdomain}` and `{quadkey}`
    /// placeholders.
    pub url_template: String,
    pub subdomains: Vec<String>,
    pub max_zoom: u8,
    pub attributions: Vec<AttributionEntry>,
}

impl ProviderMetadata {
    /// Concatenated attribution for every entry whose zoom range contains
    /// `zoom` and whose coverage area intersects the visible region.
    pub fn attribution_text(
        &self,
        zoom: u8,
        top_left: Coordinate,
        bottom_right: Coordinate,
    ) -> String {
        let mut text = String::new();
        for entry in &self.attributions {
            if zoom < entry.min_zoom || zoom > entry.max_zoom {
                continue;
            }
            let b = &entry.bounds;
            if top_left.lon < b.max.lon
                && bottom_right.lon > b.min.lon
                && top_left.lat > b.min.lat
                && bottom_right.lat < b.max.lat
            {
                text.push_str(&entry.text);
                text.push(' ');
            }
        }
        text
    }
}

#[derive(Clone)]
enum LoadOutcome {
    Ready(Arc<ProviderMetadata>),
    /// Terminal parse failure; re-raised to every past and future caller.
    Failed(String),
}

impl LoadOutcome {
    fn into_result(self) -> Result<Arc<ProviderMetadata>> {
        match self {
            LoadOutcome::Ready(meta) => Ok(meta),
            LoadOutcome::Failed(msg) => Err(MapError::Metadata(msg)),
        }
    }
}

enum LoadState {
    Idle,
    Pending(watch::Receiver<Option<LoadOutcome>>),
    Done(LoadOutcome),
}

/// Guarded lazy singleton around one provider's metadata fetch.
///
/// Transport failures are retried forever with doubling backoff starting
/// at one second; a parse failure is terminal. Requires a Tokio runtime
/// context to start the background task; without one the loader simply
/// stays idle until asked again.
pub struct AttributionLoader {
    fetcher: Arc<dyn Fetcher>,
    endpoint: String,
    state: Mutex<LoadState>,
}

impl AttributionLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, endpoint: impl Into<String>) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
            state: Mutex::new(LoadState::Idle),
        }
    }

    /// Kick off the background load if it has not started yet. Never
    /// blocks; does nothing outside a Tokio runtime context.
    pub fn ensure_started(&self) {
        let Ok(mut state) = self.state.lock() else { return };
        if !matches!(*state, LoadState::Idle) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let (tx, rx) = watch::channel(None);
        let fetcher = Arc::clone(&self.fetcher);
        let endpoint = self.endpoint.clone();
        handle.spawn(async move {
            load_with_backoff(fetcher, endpoint, tx).await;
        });
        *state = LoadState::Pending(rx);
    }

    /// Non-blocking access for the paint path and `tile_url`: `None`
    /// while the load is still pending.
    pub fn try_get(&self) -> Option<Result<Arc<ProviderMetadata>>> {
        self.ensure_started();
        let Ok(mut state) = self.state.lock() else { return None };
        let outcome = match &*state {
            LoadState::Idle => return None,
            LoadState::Done(outcome) => outcome.clone(),
            LoadState::Pending(rx) => {
                let slot = rx.borrow().clone();
                match slot {
                    Some(outcome) => {
                        *state = LoadState::Done(outcome.clone());
                        outcome
                    }
                    None => return None,
                }
            }
        };
        Some(outcome.into_result())
    }

    /// Wait for the metadata, starting the load if necessary. Concurrent
    /// callers all await the same underlying fetch.
    pub async fn get(&self) -> Result<Arc<ProviderMetadata>> {
        self.ensure_started();
        let mut rx = {
            let Ok(state) = self.state.lock() else {
                return Err(MapError::Metadata("attribution state poisoned".into()));
            };
            match &*state {
                LoadState::Done(outcome) => return outcome.clone().into_result(),
                LoadState::Pending(rx) => rx.clone(),
                LoadState::Idle => {
                    // no runtime context; an async caller always has one,
                    // so this only happens if spawning raced a shutdown
                    return Err(MapError::Metadata("attribution load not started".into()));
                }
            }
        };
        // wait outside the state lock
        loop {
            let slot = rx.borrow().clone();
            if let Some(outcome) = slot {
                if let Ok(mut state) = self.state.lock() {
                    *state = LoadState::Done(outcome.clone());
                }
                return outcome.into_result();
            }
            if rx.changed().await.is_err() {
                return Err(MapError::Metadata("attribution task stopped".into()));
            }
        }
    }
}

async fn load_with_backoff(
    fetcher: Arc<dyn Fetcher>,
    endpoint: String,
    tx: watch::Sender<Option<LoadOutcome>>,
) {
    let mut wait = Duration::from_secs(1);
    loop {
        match fetcher.fetch(&endpoint).await {
            Ok(bytes) => {
                let outcome = match parse_metadata(&bytes) {
                    Ok(meta) => {
                        log::info!(
                            "loaded provider attribution metadata ({} entries, max zoom {})",
                            meta.attributions.len(),
                            meta.max_zoom
                        );
                        LoadOutcome::Ready(Arc::new(meta))
                    }
                    Err(e) => {
                        log::error!("could not parse provider metadata: {}", e);
                        LoadOutcome::Failed(e.to_string())
                    }
                };
                let _ = tx.send(Some(outcome));
                return;
            }
            Err(e) => {
                log::warn!(
                    "could not fetch provider metadata: {}; retrying in {}s",
                    e,
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;
                wait *= 2;
            }
        }
    }
}

// JSON shape of the imagery metadata REST response. Only the fields the
// engine consumes are modeled.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataResponse {
    resource_sets: Vec<ResourceSet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceSet {
    resources: Vec<ImageryResource>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageryResource {
    image_url: String,
    image_url_subdomains: Vec<String>,
    zoom_max: u8,
    #[serde(default)]
    imagery_providers: Vec<ImageryProvider>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageryProvider {
    attribution: String,
    coverage_areas: Vec<CoverageArea>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoverageArea {
    zoom_min: u8,
    zoom_max: u8,
    /// south, west, north, east
    bbox: [f64; 4],
}

fn parse_metadata(bytes: &[u8]) -> Result<ProviderMetadata> {
    let response: MetadataResponse = serde_json::from_slice(bytes)?;
    let resource = response
        .resource_sets
        .into_iter()
        .flat_map(|set| set.resources)
        .next()
        .ok_or_else(|| MapError::Metadata("metadata response carries no imagery resource".into()))?;

    if resource.image_url_subdomains.is_empty() {
        return Err(MapError::Metadata("metadata response carries no subdomains".into()));
    }

    let url_template = resource
        .image_url
        .replacen("http://", "https://", 1)
        .replace("{culture}", "en-US");

    let mut attributions = Vec::new();
    for provider in resource.imagery_providers {
        for area in provider.coverage_areas {
            let [south, west, north, east] = area.bbox;
            attributions.push(AttributionEntry {
                text: provider.attribution.clone(),
                min_zoom: area.zoom_min,
                max_zoom: area.zoom_max,
                bounds: GeoBounds::new(
                    Coordinate::new(south, west),
                    Coordinate::new(north, east),
                ),
            });
        }
    }

    Ok(ProviderMetadata {
        url_template,
        subdomains: resource.image_url_subdomains,
        max_zoom: resource.zoom_max,
        attributions,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    pub(crate) const SAMPLE_METADATA: &str = r#"{
        "resourceSets": [{
            "resources": [{
                "imageUrl": "http://ecn.{subdomain}.tiles.example.net/tiles/a{quadkey}.jpeg?g=1&mkt={culture}",
                "imageUrlSubdomains": ["t0", "t1", "t2", "t3"],
                "zoomMax": 21,
                "imageryProviders": [{
                    "attribution": "(c) Example Imagery",
                    "coverageAreas": [
                        { "zoomMin": 1, "zoomMax": 21, "bbox": [-90.0, -180.0, 90.0, 180.0] }
                    ]
                }, {
                    "attribution": "(c) Regional Partner",
                    "coverageAreas": [
                        { "zoomMin": 10, "zoomMax": 19, "bbox": [40.0, -5.0, 55.0, 10.0] }
                    ]
                }]
            }]
        }]
    }"#;

    struct CountingFetcher {
        calls: AtomicUsize,
        payload: Vec<u8>,
    }

    impl CountingFetcher {
        fn new(payload: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                payload: payload.as_bytes().to_vec(),
            })
        }
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // give concurrent callers time to pile up on the pending load
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(self.payload.clone())
        }
    }

    /// Fails `failures` times, recording call instants, then succeeds.
    struct FlakyFetcher {
        calls: Mutex<Vec<Instant>>,
        failures: usize,
        payload: Vec<u8>,
    }

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            if calls.len() <= self.failures {
                return Err(MapError::TileFetch("connection refused".into()));
            }
            Ok(self.payload.clone())
        }
    }

    #[test]
    fn test_parse_metadata() {
        let meta = parse_metadata(SAMPLE_METADATA.as_bytes()).unwrap();
        assert!(meta.url_template.starts_with("https://"));
        assert!(meta.url_template.contains("mkt=en-US"));
        assert_eq!(meta.subdomains.len(), 4);
        assert_eq!(meta.max_zoom, 21);
        assert_eq!(meta.attributions.len(), 2);
        assert_eq!(meta.attributions[1].min_zoom, 10);
    }

    #[test]
    fn test_parse_rejects_empty_response() {
        let err = parse_metadata(br#"{"resourceSets": []}"#).unwrap_err();
        assert!(matches!(err, MapError::Metadata(_)));
    }

    #[test]
    fn test_attribution_text_filters_zoom_and_bounds() {
        let meta = parse_metadata(SAMPLE_METADATA.as_bytes()).unwrap();
        // viewport over central Europe at zoom 12: both entries apply
        let top_left = Coordinate::new(52.0, 5.0);
        let bottom_right = Coordinate::new(48.0, 9.0);
        let text = meta.attribution_text(12, top_left, bottom_right);
        assert!(text.contains("(c) Example Imagery"));
        assert!(text.contains("(c) Regional Partner"));
        // at zoom 3 the regional entry's zoom range excludes it
        let text = meta.attribution_text(3, top_left, bottom_right);
        assert!(text.contains("(c) Example Imagery"));
        assert!(!text.contains("Regional"));
        // a viewport outside its coverage area excludes it too
        let text = meta.attribution_text(
            12,
            Coordinate::new(-10.0, 100.0),
            Coordinate::new(-20.0, 110.0),
        );
        assert!(!text.contains("Regional"));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let fetcher = CountingFetcher::new(SAMPLE_METADATA);
        let loader = Arc::new(AttributionLoader::new(
            fetcher.clone(),
            "https://metadata.example/imagery",
        ));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let loader = Arc::clone(&loader);
                tokio::spawn(async move { loader.get().await })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let first = loader.get().await.unwrap();
        for res in results {
            let meta = res.unwrap().unwrap();
            assert!(Arc::ptr_eq(&meta, &first));
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_between_retries() {
        let fetcher = Arc::new(FlakyFetcher {
            calls: Mutex::new(Vec::new()),
            failures: 3,
            payload: SAMPLE_METADATA.as_bytes().to_vec(),
        });
        let loader = AttributionLoader::new(fetcher.clone(), "https://metadata.example/imagery");

        loader.get().await.unwrap();

        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        let gaps: Vec<u64> = calls
            .windows(2)
            .map(|w| (w[1] - w[0]).as_secs())
            .collect();
        assert_eq!(gaps, vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_parse_failure_is_terminal_for_all_callers() {
        let fetcher = CountingFetcher::new("not json at all");
        let loader = AttributionLoader::new(fetcher.clone(), "https://metadata.example/imagery");

        assert!(matches!(loader.get().await, Err(MapError::Serialization(_)) | Err(MapError::Metadata(_))));
        // a later caller gets the same terminal error without a re-fetch
        assert!(loader.get().await.is_err());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
