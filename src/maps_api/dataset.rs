use std::collections::HashMap;

use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;
use rayon::prelude::*;

use crate::error::DatasetError;
use crate::map::division::{DivisionFeature, DivisionNames, FeatureId, FeatureValue};

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn read_source(client: &reqwest::Client, source: &str) -> Result<String, DatasetError> {
    if is_remote(source) {
        let response = client.get(source).send().await?;
        if !response.status().is_success() {
            return Err(DatasetError::Status(response.status()));
        }
        Ok(response.text().await?)
    } else {
        Ok(tokio::fs::read_to_string(source).await?)
    }
}

/// Parse a GeoJSON FeatureCollection into division features.
///
/// Only Polygon and MultiPolygon features are kept; their ids are their
/// positions in the returned list.
pub fn parse_dataset(text: &str) -> Result<Vec<DivisionFeature>, DatasetError> {
    let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
        return Err(DatasetError::NotAFeatureCollection);
    };

    let candidates: Vec<(serde_json::Map<String, serde_json::Value>, MultiPolygon<f64>)> = collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let geometry = Geometry::<f64>::try_from(feature.geometry?.value)
                .map_err(|e| log::debug!("Skipping feature with unusable geometry: {}", e))
                .ok()?;
            let polygons = match geometry {
                Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
                Geometry::MultiPolygon(polygons) => polygons,
                _ => return None,
            };
            Some((feature.properties.unwrap_or_default(), polygons))
        })
        .collect();

    // Projection and triangulation dominate load time for large collections
    let mut features: Vec<DivisionFeature> = candidates
        .into_par_iter()
        .filter_map(|(properties, geometry)| {
            let names = DivisionNames::from_properties(&properties);
            let values: HashMap<String, FeatureValue> = properties
                .iter()
                .filter_map(|(key, value)| FeatureValue::from_json(value).map(|v| (key.clone(), v)))
                .collect();
            DivisionFeature::new(FeatureId(0), names, values, geometry)
        })
        .collect();

    for (index, feature) in features.iter_mut().enumerate() {
        feature.id = FeatureId(index);
    }
    Ok(features)
}

pub async fn fetch_dataset(
    client: &reqwest::Client,
    source: &str,
) -> Result<Vec<DivisionFeature>, DatasetError> {
    let text = read_source(client, source).await?;
    tokio::task::spawn_blocking(move || parse_dataset(&text))
        .await
        .map_err(|e| DatasetError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

/// Fetch and parse the boundary dataset; any failure yields an empty dataset.
pub async fn load_dataset(client: &reqwest::Client, source: &str) -> Vec<DivisionFeature> {
    match fetch_dataset(client, source).await {
        Ok(features) => {
            log::info!("Loaded {} divisions from {}", features.len(), source);
            features
        }
        Err(e) => {
            log::warn!("Could not load boundary dataset from {}: {}", source, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../data/sri_lanka.geojson");

    #[test]
    fn sample_keeps_only_polygonal_features() {
        let features = parse_dataset(SAMPLE).expect("sample parses");
        assert_eq!(features.len(), 6);

        let labels: Vec<&str> = features.iter().map(|f| f.label()).collect();
        assert_eq!(
            labels,
            vec!["Fort", "Pettah", "Kotahena East", "Pettah", "Unknown", "Maradana"]
        );
        for (index, feature) in features.iter().enumerate() {
            assert_eq!(feature.id, FeatureId(index));
        }
    }

    #[test]
    fn multipolygons_survive_parsing() {
        let features = parse_dataset(SAMPLE).expect("sample parses");
        let kotahena = &features[2];
        assert_eq!(kotahena.geometry.0.len(), 2);
        assert_eq!(kotahena.ds_division(), "Colombo");
        assert_eq!(
            kotahena.properties.get("province"),
            Some(&FeatureValue::String("Western".to_string()))
        );
    }

    #[test]
    fn non_collections_are_rejected() {
        let point = r#"{"type": "Point", "coordinates": [79.8, 6.9]}"#;
        assert!(matches!(parse_dataset(point), Err(DatasetError::NotAFeatureCollection)));
        assert!(matches!(parse_dataset("{ not json"), Err(DatasetError::GeoJson(_))));
    }

    #[tokio::test]
    async fn loads_the_bundled_dataset_from_disk() {
        let client = reqwest::Client::new();
        let features = load_dataset(&client, "data/sri_lanka.geojson").await;
        assert_eq!(features.len(), 6);
    }

    #[tokio::test]
    async fn missing_file_yields_empty_dataset() {
        let client = reqwest::Client::new();
        assert!(matches!(
            fetch_dataset(&client, "data/does-not-exist.geojson").await,
            Err(DatasetError::Io(_))
        ));
        assert!(load_dataset(&client, "data/does-not-exist.geojson").await.is_empty());
    }
}
