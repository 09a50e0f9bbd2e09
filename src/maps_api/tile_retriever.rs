use std::error::Error;
use std::fmt;
use std::str::FromStr;

use crate::map::map_tile::{apply_dark_filter, MapTile, TileKey};

pub type TileError = Box<dyn Error + Send + Sync>;

/// Raster imagery shown beneath the vector layers. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaseLayer {
    Osm,
    OpenTopo,
    StadiaDark,
    #[default]
    CartoDarkMatter,
}

impl BaseLayer {
    pub const ALL: [BaseLayer; 4] = [
        BaseLayer::Osm,
        BaseLayer::OpenTopo,
        BaseLayer::StadiaDark,
        BaseLayer::CartoDarkMatter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BaseLayer::Osm => "OpenStreetMap",
            BaseLayer::OpenTopo => "OpenTopoMap",
            BaseLayer::StadiaDark => "Stadia Dark",
            BaseLayer::CartoDarkMatter => "CARTO Dark Matter",
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            BaseLayer::Osm => "© OpenStreetMap contributors",
            BaseLayer::OpenTopo => "© OpenTopoMap contributors",
            BaseLayer::StadiaDark => "© Stadia Maps",
            BaseLayer::CartoDarkMatter => "© CARTO",
        }
    }

    fn template(self) -> &'static str {
        match self {
            BaseLayer::Osm => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            BaseLayer::OpenTopo => "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            BaseLayer::StadiaDark => "https://tiles.stadiamaps.com/tiles/alidade_dark/{z}/{x}/{y}.png",
            BaseLayer::CartoDarkMatter => "https://basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
        }
    }

    /// Concrete URL for one tile. `{s}` cycles through the a-c subdomains.
    pub fn tile_url(self, zoom: u32, x: u32, y: u32) -> String {
        let subdomain = ["a", "b", "c"][((x as u64 + y as u64) % 3) as usize];
        self.template()
            .replace("{s}", subdomain)
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

impl fmt::Display for BaseLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBaseLayer(String);

impl fmt::Display for UnknownBaseLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown base layer {:?}", self.0)
    }
}

impl FromStr for BaseLayer {
    type Err = UnknownBaseLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "osm" | "openstreetmap" => Ok(BaseLayer::Osm),
            "opentopo" | "opentopomap" | "satellite" => Ok(BaseLayer::OpenTopo),
            "stadia_dark" | "dark" => Ok(BaseLayer::StadiaDark),
            "carto_dark_matter" | "dark_matter" => Ok(BaseLayer::CartoDarkMatter),
            _ => Err(UnknownBaseLayer(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TileRetriever {
    client: reqwest::Client,
}

impl TileRetriever {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Asynchronously fetches a tile, decodes it and applies the dark filter.
    pub async fn fetch_tile(&self, key: TileKey) -> Result<MapTile, TileError> {
        let url = key.layer.tile_url(key.zoom, key.x, key.y);
        log::debug!("Fetching tile from {}", url);

        let response = self.client.get(&url).send().await?;

        // If the response is not successful, return an error
        if !response.status().is_success() {
            return Err(format!("Failed to fetch tile {}: {}", url, response.status()).into());
        }

        let bytes = response.bytes().await?;

        // Decoding is CPU bound, keep it off the async workers
        let tile = tokio::task::spawn_blocking(move || -> Result<MapTile, TileError> {
            let mut image = image::load_from_memory(&bytes)?.to_rgba8();
            apply_dark_filter(&mut image);
            Ok(MapTile::new(key, image))
        })
        .await??;

        Ok(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_layer_keys() {
        assert_eq!("osm".parse(), Ok(BaseLayer::Osm));
        assert_eq!("satellite".parse(), Ok(BaseLayer::OpenTopo));
        assert_eq!("dark".parse(), Ok(BaseLayer::StadiaDark));
        assert_eq!("dark_matter".parse(), Ok(BaseLayer::CartoDarkMatter));
        assert_eq!("Carto-Dark-Matter".parse(), Ok(BaseLayer::CartoDarkMatter));
        assert!("bing".parse::<BaseLayer>().is_err());
    }

    #[test]
    fn tile_urls_fill_every_placeholder() {
        for layer in BaseLayer::ALL {
            let url = layer.tile_url(7, 92, 61);
            assert!(!url.contains('{'), "{url}");
            assert!(url.ends_with("/7/92/61.png"), "{url}");
        }
    }

    #[test]
    fn opentopo_rotates_subdomains() {
        assert!(BaseLayer::OpenTopo.tile_url(3, 0, 0).starts_with("https://a."));
        assert!(BaseLayer::OpenTopo.tile_url(3, 1, 0).starts_with("https://b."));
        assert!(BaseLayer::OpenTopo.tile_url(3, 1, 1).starts_with("https://c."));
    }
}
