use std::str::FromStr;

use crate::maps_api::tile_retriever::BaseLayer;

pub const DEFAULT_DATASET: &str = "data/sri_lanka.geojson";
const DEFAULT_USER_AGENT: &str = concat!("gn-viewer/", env!("CARGO_PKG_VERSION"));

/// Runtime settings, read from the process environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Local path or `http(s)` URL of the boundary FeatureCollection.
    pub dataset_source: String,
    pub base_layer: BaseLayer,
    pub tile_cache_size: usize,
    pub fetch_workers: usize,
    pub user_agent: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dataset_source: DEFAULT_DATASET.to_string(),
            base_layer: BaseLayer::default(),
            tile_cache_size: 512,
            fetch_workers: 8,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            dataset_source: lookup("GN_VIEWER_DATASET").unwrap_or(defaults.dataset_source),
            base_layer: parse_or("GN_VIEWER_BASE_LAYER", &lookup, defaults.base_layer),
            tile_cache_size: parse_or("GN_VIEWER_TILE_CACHE", &lookup, defaults.tile_cache_size)
                .max(1),
            fetch_workers: parse_or("GN_VIEWER_FETCH_WORKERS", &lookup, defaults.fetch_workers)
                .max(1),
            user_agent: lookup("GN_VIEWER_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            log::warn!("Ignoring {}={:?}: {}", key, raw, e);
            default
        }),
        None => default,
    }
}
