use std::f64::consts::PI;

use geo::{Coord, MapCoords, MultiPolygon, Rect};

/// WGS84 equatorial radius used by EPSG:3857.
pub const EARTH_RADIUS: f64 = 6_378_137.0;
/// Half the width of the Web Mercator square, in meters.
pub const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS;
/// Edge length of a raster tile in screen pixels.
pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 19.0;

const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Convert a longitude/latitude pair (EPSG:4326) to Web Mercator meters (EPSG:3857).
pub fn lonlat_to_mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    Coord {
        x: coord.x.to_radians() * EARTH_RADIUS,
        y: (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS,
    }
}

/// Inverse of [`lonlat_to_mercator`].
pub fn mercator_to_lonlat(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
    }
}

pub fn project_multi_polygon(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.map_coords(lonlat_to_mercator)
}

/// Meters per screen pixel at a (possibly fractional) zoom level.
pub fn resolution(zoom: f64) -> f64 {
    2.0 * ORIGIN_SHIFT / (TILE_SIZE * 2.0_f64.powf(zoom))
}

pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (2.0 * ORIGIN_SHIFT / (TILE_SIZE * resolution)).log2()
}

/// Integer tile zoom used to fetch imagery for a view zoom.
pub fn tile_zoom(zoom: f64) -> u32 {
    zoom.round().clamp(MIN_ZOOM, MAX_ZOOM) as u32
}

/// Mercator extent covered by tile `(x, y)` at zoom `z`.
pub fn tile_extent(x: u32, y: u32, zoom: u32) -> Rect<f64> {
    let span = tile_span(zoom);
    let west = x as f64 * span - ORIGIN_SHIFT;
    let north = ORIGIN_SHIFT - y as f64 * span;
    Rect::new(
        Coord { x: west, y: north - span },
        Coord { x: west + span, y: north },
    )
}

/// All tile coordinates at `zoom` that intersect a mercator extent.
pub fn tiles_covering(extent: Rect<f64>, zoom: u32) -> Vec<(u32, u32)> {
    let span = tile_span(zoom);
    let last = (1_u64 << zoom) as f64 - 1.0;
    let index = |value: f64| (value / span).floor().clamp(0.0, last) as u32;

    let min_x = index(extent.min().x + ORIGIN_SHIFT);
    let max_x = index(extent.max().x + ORIGIN_SHIFT);
    let min_y = index(ORIGIN_SHIFT - extent.max().y);
    let max_y = index(ORIGIN_SHIFT - extent.min().y);

    let mut tiles = Vec::new();
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            tiles.push((x, y));
        }
    }
    tiles
}

fn tile_span(zoom: u32) -> f64 {
    2.0 * ORIGIN_SHIFT / 2.0_f64.powi(zoom as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mercator_round_trips_colombo() {
        let colombo = Coord { x: 79.8612, y: 6.9271 };
        let projected = lonlat_to_mercator(colombo);
        assert_relative_eq!(projected.x, 8_890_108.1, epsilon = 1.0);
        assert_relative_eq!(projected.y, 773_006.7, epsilon = 1.0);

        let back = mercator_to_lonlat(projected);
        assert_relative_eq!(back.x, colombo.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, colombo.y, epsilon = 1e-9);
    }

    #[test]
    fn zoom_and_resolution_are_inverse() {
        assert_relative_eq!(resolution(0.0), 156_543.033_928_041, epsilon = 1e-6);
        for zoom in [0.0, 3.5, 7.0, 13.25, 19.0] {
            assert_relative_eq!(zoom_for_resolution(resolution(zoom)), zoom, epsilon = 1e-9);
        }
    }

    #[test]
    fn tile_extent_of_root_tile_is_whole_world() {
        let extent = tile_extent(0, 0, 0);
        assert_relative_eq!(extent.min().x, -ORIGIN_SHIFT);
        assert_relative_eq!(extent.max().y, ORIGIN_SHIFT);
        assert_relative_eq!(extent.width(), 2.0 * ORIGIN_SHIFT);
    }

    #[test]
    fn tiles_covering_sri_lanka_at_zoom_seven() {
        let extent = Rect::new(
            Coord { x: 8_850_000.0, y: 700_000.0 },
            Coord { x: 9_150_000.0, y: 1_200_000.0 },
        );
        let tiles = tiles_covering(extent, 7);
        assert!(tiles.contains(&(92, 61)));
        assert!(tiles.iter().all(|&(x, y)| (92..=93).contains(&x) && (60..=62).contains(&y)));
    }

    #[test]
    fn tile_zoom_is_clamped() {
        assert_eq!(tile_zoom(-2.0), 0);
        assert_eq!(tile_zoom(7.4), 7);
        assert_eq!(tile_zoom(7.6), 8);
        assert_eq!(tile_zoom(25.0), 19);
    }
}
