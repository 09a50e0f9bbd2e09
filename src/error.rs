use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to fetch dataset: {0}")]
    Http(#[from] reqwest::Error),
    #[error("dataset request returned {0}")]
    Status(reqwest::StatusCode),
    #[error("dataset is not valid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("dataset root is not a FeatureCollection")]
    NotAFeatureCollection,
}

#[derive(Debug, Error, PartialEq)]
pub enum MeasureError {
    #[error("geometry has no rings to measure")]
    EmptyGeometry,
    #[error("measurement produced a non-finite value")]
    NonFinite,
}
