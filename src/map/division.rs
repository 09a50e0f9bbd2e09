use std::collections::HashMap;
use std::sync::Arc;

use egui::{Color32, Stroke};
use geo::{BoundingRect, Contains, Coord, MultiPolygon, Point, Rect, Simplify, TriangulateEarcut};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use serde::{Deserialize, Deserializer};

use super::projection;

/// Position of a feature in the loaded collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl FeatureValue {
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(FeatureValue::String(s.clone())),
            serde_json::Value::Bool(b) => Some(FeatureValue::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FeatureValue::Int(i)),
                None => n.as_f64().map(FeatureValue::Double),
            },
            _ => None,
        }
    }
}

impl std::fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::String(v) => f.write_str(v),
            FeatureValue::Int(v) => write!(f, "{}", v),
            FeatureValue::Double(v) => write!(f, "{}", v),
            FeatureValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Administrative names under both schemas seen in the wild: the custom
/// `gn_name`/`ds_name`/`province` fields and the standard `ADMn_EN` codes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DivisionNames {
    #[serde(rename = "ADM3_EN", deserialize_with = "lenient_string")]
    adm3_en: Option<String>,
    #[serde(rename = "ADM2_EN", deserialize_with = "lenient_string")]
    adm2_en: Option<String>,
    #[serde(rename = "ADM1_EN", deserialize_with = "lenient_string")]
    adm1_en: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    gn_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    ds_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    province: Option<String>,
}

/// Accept strings, numbers and booleans; blank values count as missing.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let text = match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return Ok(None),
    };
    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

fn first_of<'a>(primary: &'a Option<String>, fallback: &'a Option<String>) -> &'a str {
    primary
        .as_deref()
        .or(fallback.as_deref())
        .unwrap_or("")
}

impl DivisionNames {
    pub fn from_properties(properties: &serde_json::Map<String, serde_json::Value>) -> Self {
        serde_json::from_value(serde_json::Value::Object(properties.clone())).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct DivisionFeature {
    pub id: FeatureId,
    names: DivisionNames,
    pub properties: HashMap<String, FeatureValue>,
    /// Geographic (EPSG:4326) geometry, used for measurement.
    pub geometry: MultiPolygon<f64>,
    /// Web Mercator geometry, used for rendering and hit-testing.
    pub projected: MultiPolygon<f64>,
    pub extent: Rect<f64>,
    triangles: Vec<[Coord<f64>; 3]>,
}

impl DivisionFeature {
    /// Returns `None` for geometries without any coordinates.
    pub fn new(
        id: FeatureId,
        names: DivisionNames,
        properties: HashMap<String, FeatureValue>,
        geometry: MultiPolygon<f64>,
    ) -> Option<Self> {
        let projected = projection::project_multi_polygon(&geometry);
        let extent = projected.bounding_rect()?;
        let triangles = projected
            .iter()
            .flat_map(|polygon| polygon.earcut_triangles())
            .map(|t| [t.0, t.1, t.2])
            .collect();
        Some(Self {
            id,
            names,
            properties,
            geometry,
            projected,
            extent,
            triangles,
        })
    }

    /// Display label: the GN level name.
    pub fn label(&self) -> &str {
        first_of(&self.names.adm3_en, &self.names.gn_name)
    }

    pub fn gn_name(&self) -> &str {
        self.names.gn_name.as_deref().unwrap_or("")
    }

    pub fn ds_name(&self) -> &str {
        self.names.ds_name.as_deref().unwrap_or("")
    }

    /// Parent DS division, preferring the standard schema.
    pub fn ds_division(&self) -> &str {
        first_of(&self.names.adm2_en, &self.names.ds_name)
    }

    pub fn province(&self) -> &str {
        first_of(&self.names.province, &self.names.adm1_en)
    }

    /// Secondary text shown next to the label in the division list.
    pub fn list_suffix(&self) -> &str {
        first_of(&self.names.ds_name, &self.names.gn_name)
    }

    pub fn triangles(&self) -> &[[Coord<f64>; 3]] {
        &self.triangles
    }

    pub fn contains(&self, point: Coord<f64>) -> bool {
        self.projected.contains(&Point::from(point))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStyle {
    pub fill: Color32,
    pub stroke: Stroke,
}

impl FeatureStyle {
    pub fn boundary() -> Self {
        Self {
            fill: Color32::from_rgba_unmultiplied(14, 165, 160, 20),
            stroke: Stroke::new(2.0, Color32::from_rgb(0x0e, 0xa5, 0xa0)),
        }
    }

    pub fn highlight() -> Self {
        Self {
            fill: Color32::from_rgba_unmultiplied(37, 99, 235, 64),
            stroke: Stroke::new(4.0, Color32::from_rgb(0xf5, 0x9e, 0x42)),
        }
    }

    pub fn selected() -> Self {
        Self {
            fill: Color32::from_rgba_unmultiplied(14, 165, 160, 56),
            stroke: Stroke::new(4.0, Color32::from_rgb(0xf5, 0x9e, 0x42)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryStyle {
    /// Every division gets the teal boundary style.
    #[default]
    Default,
    /// Only the given division renders, highlighted; the rest render nothing.
    HighlightOnly(FeatureId),
}

type IndexedExtent = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Below this tile zoom the default style draws outlines only.
pub const FILL_MIN_ZOOM: f64 = 10.0;
/// Outline simplification tolerance, in screen pixels.
const OUTLINE_TOLERANCE_PX: f64 = 1.0;

/// Projected outlines simplified for one tile zoom.
struct OutlineCache {
    zoom: u32,
    outlines: HashMap<FeatureId, MultiPolygon<f64>>,
}

/// The loaded boundary features plus an R-tree over their extents.
#[derive(Default)]
pub struct BoundaryLayer {
    features: Vec<Arc<DivisionFeature>>,
    index: RTree<IndexedExtent>,
    extent: Option<Rect<f64>>,
    style: BoundaryStyle,
    outlines: Option<OutlineCache>,
}

impl BoundaryLayer {
    pub fn set_features(&mut self, features: Vec<DivisionFeature>) {
        self.outlines = None;
        self.features = features.into_iter().map(Arc::new).collect();
        let envelopes = self
            .features
            .iter()
            .enumerate()
            .map(|(i, feature)| {
                let (min, max) = (feature.extent.min(), feature.extent.max());
                GeomWithData::new(Rectangle::from_corners([min.x, min.y], [max.x, max.y]), i)
            })
            .collect();
        self.index = RTree::bulk_load(envelopes);
        self.extent = self
            .features
            .iter()
            .map(|feature| feature.extent)
            .reduce(|a, b| {
                Rect::new(
                    Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            });
    }

    pub fn features(&self) -> &[Arc<DivisionFeature>] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: FeatureId) -> Option<&Arc<DivisionFeature>> {
        self.features.get(id.0)
    }

    /// First feature carrying the given display label.
    pub fn find_by_label(&self, label: &str) -> Option<&Arc<DivisionFeature>> {
        self.features.iter().find(|feature| feature.label() == label)
    }

    /// Combined mercator extent of every feature, if any are loaded.
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.extent
    }

    /// The topmost feature containing a mercator point.
    pub fn hit_test(&self, point: Coord<f64>) -> Option<&Arc<DivisionFeature>> {
        self.index
            .locate_all_at_point(&[point.x, point.y])
            .map(|entry| entry.data)
            .filter(|&i| self.features[i].contains(point))
            .max()
            .map(|i| &self.features[i])
    }

    /// Features whose extents intersect a mercator extent, in drawing order.
    /// Features smaller than `min_size` meters on both axes are skipped.
    pub fn visible(&self, extent: Rect<f64>, min_size: f64) -> Vec<&Arc<DivisionFeature>> {
        let envelope = AABB::from_corners(
            [extent.min().x, extent.min().y],
            [extent.max().x, extent.max().y],
        );
        let mut hits: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .filter(|&i| {
                let feature_extent = self.features[i].extent;
                feature_extent.width().max(feature_extent.height()) >= min_size
            })
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|i| &self.features[i]).collect()
    }

    /// Outline of a feature simplified to about a pixel at `zoom`.
    ///
    /// Simplified outlines are kept until the zoom or the features change.
    pub fn outline(&mut self, id: FeatureId, zoom: u32) -> Option<&MultiPolygon<f64>> {
        let feature = self.features.get(id.0)?;
        if self.outlines.as_ref().map_or(true, |cache| cache.zoom != zoom) {
            self.outlines = Some(OutlineCache {
                zoom,
                outlines: HashMap::new(),
            });
        }
        let cache = self.outlines.as_mut()?;
        let tolerance = projection::resolution(zoom as f64) * OUTLINE_TOLERANCE_PX;
        Some(
            cache
                .outlines
                .entry(id)
                .or_insert_with(|| feature.projected.simplify(&tolerance)),
        )
    }

    /// Whether polygons get filled at a view zoom. A lone highlighted feature always is.
    pub fn fills_at(&self, zoom: f64) -> bool {
        match self.style {
            BoundaryStyle::Default => zoom >= FILL_MIN_ZOOM,
            BoundaryStyle::HighlightOnly(_) => true,
        }
    }

    #[cfg(test)]
    pub fn style(&self) -> BoundaryStyle {
        self.style
    }

    pub fn set_style(&mut self, style: BoundaryStyle) {
        self.style = style;
    }

    /// Style a feature renders with under the current layer style, or `None` if hidden.
    pub fn style_for(&self, id: FeatureId) -> Option<FeatureStyle> {
        match self.style {
            BoundaryStyle::Default => Some(FeatureStyle::boundary()),
            BoundaryStyle::HighlightOnly(selected) if selected == id => {
                Some(FeatureStyle::highlight())
            }
            BoundaryStyle::HighlightOnly(_) => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use geo::{polygon, Area};

    /// A lon/lat square near Colombo, `size` degrees wide.
    pub(crate) fn square(lon: f64, lat: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: lon, y: lat),
            (x: lon + size, y: lat),
            (x: lon + size, y: lat + size),
            (x: lon, y: lat + size),
            (x: lon, y: lat),
        ]])
    }

    pub(crate) fn feature(id: usize, properties: serde_json::Value, geometry: MultiPolygon<f64>) -> DivisionFeature {
        let map = properties.as_object().cloned().unwrap_or_default();
        let values = map
            .iter()
            .filter_map(|(k, v)| FeatureValue::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        DivisionFeature::new(FeatureId(id), DivisionNames::from_properties(&map), values, geometry)
            .expect("non-empty geometry")
    }

    #[test]
    fn names_fall_back_between_schemas() {
        let standard = feature(
            0,
            serde_json::json!({"ADM3_EN": "Kotahena East", "ADM2_EN": "Colombo", "ADM1_EN": "Western"}),
            square(79.85, 6.94, 0.01),
        );
        assert_eq!(standard.label(), "Kotahena East");
        assert_eq!(standard.ds_division(), "Colombo");
        assert_eq!(standard.province(), "Western");
        assert_eq!(standard.list_suffix(), "");

        let custom = feature(
            1,
            serde_json::json!({"gn_name": "Mattakkuliya", "ds_name": "Colombo", "province": "Western", "ADM3_EN": ""}),
            square(79.86, 6.96, 0.01),
        );
        assert_eq!(custom.label(), "Mattakkuliya");
        assert_eq!(custom.ds_division(), "Colombo");
        assert_eq!(custom.list_suffix(), "Colombo");
    }

    #[test]
    fn odd_property_types_do_not_break_names() {
        let odd = feature(
            0,
            serde_json::json!({"ADM3_EN": 42, "gn_name": null, "ds_name": ["x"], "area": 1.5}),
            square(80.0, 7.0, 0.01),
        );
        assert_eq!(odd.label(), "42");
        assert_eq!(odd.ds_name(), "");
        assert_eq!(odd.properties.get("area"), Some(&FeatureValue::Double(1.5)));
    }

    #[test]
    fn triangles_cover_the_projected_polygon() {
        let f = feature(0, serde_json::json!({}), square(79.9, 6.9, 0.05));
        let triangulated: f64 = f
            .triangles()
            .iter()
            .map(|[a, b, c]| geo::Triangle::new(*a, *b, *c).unsigned_area())
            .sum();
        approx::assert_relative_eq!(triangulated, f.projected.unsigned_area(), max_relative = 1e-9);
    }

    #[test]
    fn hit_test_prefers_topmost_feature() {
        let mut layer = BoundaryLayer::default();
        layer.set_features(vec![
            feature(0, serde_json::json!({"ADM3_EN": "Outer"}), square(79.8, 6.8, 0.2)),
            feature(1, serde_json::json!({"ADM3_EN": "Inner"}), square(79.85, 6.85, 0.05)),
        ]);

        let inner = projection::lonlat_to_mercator(Coord { x: 79.87, y: 6.87 });
        let outer_only = projection::lonlat_to_mercator(Coord { x: 79.95, y: 6.95 });
        let outside = projection::lonlat_to_mercator(Coord { x: 81.0, y: 8.0 });

        assert_eq!(layer.hit_test(inner).map(|f| f.label()), Some("Inner"));
        assert_eq!(layer.hit_test(outer_only).map(|f| f.label()), Some("Outer"));
        assert!(layer.hit_test(outside).is_none());
    }

    #[test]
    fn extent_and_visibility() {
        let mut layer = BoundaryLayer::default();
        assert!(layer.extent().is_none());
        layer.set_features(vec![
            feature(0, serde_json::json!({}), square(79.8, 6.8, 0.1)),
            feature(1, serde_json::json!({}), square(81.0, 8.0, 0.1)),
        ]);

        let extent = layer.extent().expect("extent");
        let sw = projection::lonlat_to_mercator(Coord { x: 79.8, y: 6.8 });
        let ne = projection::lonlat_to_mercator(Coord { x: 81.1, y: 8.1 });
        approx::assert_relative_eq!(extent.min().x, sw.x, epsilon = 1e-6);
        approx::assert_relative_eq!(extent.max().y, ne.y, epsilon = 1e-6);

        let near_first = Rect::new(sw, projection::lonlat_to_mercator(Coord { x: 79.85, y: 6.85 }));
        let visible: Vec<FeatureId> = layer.visible(near_first, 0.0).iter().map(|f| f.id).collect();
        assert_eq!(visible, vec![FeatureId(0)]);

        // both squares are about 11 km across
        let everything = layer.extent().expect("extent");
        assert_eq!(layer.visible(everything, 1_000.0).len(), 2);
        assert!(layer.visible(everything, 20_000.0).is_empty());
    }

    fn ring_feature(points: usize) -> DivisionFeature {
        let mut ring: Vec<(f64, f64)> = (0..points)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / points as f64;
                (80.0 + 0.05 * angle.cos(), 7.0 + 0.05 * angle.sin())
            })
            .collect();
        ring.push(ring[0]);
        let polygon = geo::Polygon::new(geo::LineString::from(ring), vec![]);
        feature(0, serde_json::json!({}), MultiPolygon::new(vec![polygon]))
    }

    #[test]
    fn outlines_lose_detail_when_zoomed_out() {
        use geo::CoordsIter;

        let mut layer = BoundaryLayer::default();
        layer.set_features(vec![ring_feature(360)]);

        let coarse = layer.outline(FeatureId(0), 7).expect("outline").coords_count();
        let fine = layer.outline(FeatureId(0), 19).expect("outline").coords_count();
        assert!(coarse < 20, "{coarse}");
        assert!(fine > 100, "{fine}");
        assert!(layer.outline(FeatureId(1), 7).is_none());
    }

    #[test]
    fn new_features_drop_cached_outlines() {
        use geo::CoordsIter;

        let mut layer = BoundaryLayer::default();
        layer.set_features(vec![ring_feature(360)]);
        assert!(layer.outline(FeatureId(0), 12).is_some());

        layer.set_features(vec![feature(0, serde_json::json!({}), square(79.9, 6.9, 0.05))]);
        let outline = layer.outline(FeatureId(0), 12).expect("outline");
        assert_eq!(outline.coords_count(), 5);
    }

    #[test]
    fn fill_depends_on_zoom_until_something_is_highlighted() {
        let mut layer = BoundaryLayer::default();
        assert!(!layer.fills_at(7.0));
        assert!(layer.fills_at(FILL_MIN_ZOOM));

        layer.set_style(BoundaryStyle::HighlightOnly(FeatureId(0)));
        assert!(layer.fills_at(7.0));
    }

    #[test]
    fn highlight_only_hides_everything_else() {
        let mut layer = BoundaryLayer::default();
        assert_eq!(layer.style_for(FeatureId(3)), Some(FeatureStyle::boundary()));

        layer.set_style(BoundaryStyle::HighlightOnly(FeatureId(1)));
        assert_eq!(layer.style_for(FeatureId(1)), Some(FeatureStyle::highlight()));
        assert_eq!(layer.style_for(FeatureId(0)), None);
    }
}
