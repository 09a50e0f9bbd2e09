use geo::{
    Area, Coord, CoordsIter, EuclideanLength, GeodesicArea, GeodesicLength, LineString,
    MapCoords, MultiPolygon, Polygon,
};

use super::projection::EARTH_RADIUS;
use crate::error::MeasureError;

/// Area and perimeter of a division, both in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub area_m2: f64,
    pub perimeter_m: f64,
}

impl Metrics {
    pub fn area_km2(&self) -> f64 {
        self.area_m2 / 1_000_000.0
    }
}

fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

fn checked(area_m2: f64, perimeter_m: f64) -> Result<Metrics, MeasureError> {
    if area_m2.is_finite() && perimeter_m.is_finite() {
        Ok(Metrics { area_m2, perimeter_m })
    } else {
        Err(MeasureError::NonFinite)
    }
}

fn ensure_measurable(geometry: &MultiPolygon<f64>) -> Result<(), MeasureError> {
    if geometry.0.is_empty() || geometry.iter().all(|p| p.exterior().0.len() < 4) {
        return Err(MeasureError::EmptyGeometry);
    }
    if geometry.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(MeasureError::NonFinite);
    }
    Ok(())
}

/// Ellipsoidal area and perimeter of a lon/lat geometry. The perimeter sums every ring.
pub fn geodesic_metrics(geometry: &MultiPolygon<f64>) -> Result<Metrics, MeasureError> {
    ensure_measurable(geometry)?;
    let area = geometry.geodesic_area_unsigned();
    let perimeter = geometry
        .iter()
        .flat_map(rings)
        .map(|ring| ring.geodesic_length())
        .sum();
    checked(area, perimeter)
}

/// Flat-earth approximation: equirectangular projection around the mean latitude.
pub fn planar_metrics(geometry: &MultiPolygon<f64>) -> Result<Metrics, MeasureError> {
    ensure_measurable(geometry)?;
    let count = geometry.coords_count() as f64;
    let mean_lat = geometry.coords_iter().map(|c| c.y).sum::<f64>() / count;
    let scale = mean_lat.to_radians().cos();

    let local = geometry.map_coords(|c| Coord {
        x: c.x.to_radians() * EARTH_RADIUS * scale,
        y: c.y.to_radians() * EARTH_RADIUS,
    });
    let perimeter = local
        .iter()
        .flat_map(rings)
        .map(|ring| ring.euclidean_length())
        .sum();
    checked(local.unsigned_area(), perimeter)
}

/// Run `primary`, falling back to `fallback`; absent if both fail.
pub fn measure_with<P, F>(geometry: &MultiPolygon<f64>, primary: P, fallback: F) -> Option<Metrics>
where
    P: Fn(&MultiPolygon<f64>) -> Result<Metrics, MeasureError>,
    F: Fn(&MultiPolygon<f64>) -> Result<Metrics, MeasureError>,
{
    match primary(geometry) {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            log::warn!("Geodesic measurement failed ({}), using planar approximation", e);
            fallback(geometry)
                .map_err(|e| log::warn!("Planar measurement failed too: {}", e))
                .ok()
        }
    }
}

pub fn measure(geometry: &MultiPolygon<f64>) -> Option<Metrics> {
    measure_with(geometry, geodesic_metrics, planar_metrics)
}

/// Area in m² of a single lon/lat polygon.
pub fn polygon_area(polygon: &Polygon<f64>) -> Option<f64> {
    measure(&MultiPolygon::new(vec![polygon.clone()])).map(|m| m.area_m2)
}
