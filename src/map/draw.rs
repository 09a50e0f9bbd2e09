use std::fmt;

use geo::{Coord, LineString, MapCoords, Point, Polygon};

use super::{measure, projection};

/// Pixel distance within which vertices snap together or can be grabbed.
pub const SNAP_TOLERANCE_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawTool {
    #[default]
    None,
    Point,
    LineString,
    Polygon,
}

impl DrawTool {
    pub const ALL: [DrawTool; 4] = [
        DrawTool::None,
        DrawTool::Point,
        DrawTool::LineString,
        DrawTool::Polygon,
    ];
}

impl fmt::Display for DrawTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DrawTool::None => "None",
            DrawTool::Point => "Point",
            DrawTool::LineString => "Line",
            DrawTool::Polygon => "Polygon",
        })
    }
}

/// A finished user drawing, in Web Mercator meters.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawnShape {
    Point(Point<f64>),
    Line(LineString<f64>),
    Polygon(Polygon<f64>),
}

impl DrawnShape {
    fn vertices(&self) -> Vec<Coord<f64>> {
        match self {
            DrawnShape::Point(p) => vec![p.0],
            DrawnShape::Line(line) => line.0.clone(),
            DrawnShape::Polygon(polygon) => polygon.exterior().0.clone(),
        }
    }

    fn move_vertex(&mut self, index: usize, to: Coord<f64>) {
        match self {
            DrawnShape::Point(p) => p.0 = to,
            DrawnShape::Line(line) => {
                if let Some(c) = line.0.get_mut(index) {
                    *c = to;
                }
            }
            DrawnShape::Polygon(polygon) => polygon.exterior_mut(|ring| {
                let last = ring.0.len().saturating_sub(1);
                // first and last coordinate are the same vertex of a closed ring
                if index == 0 || index == last {
                    ring.0[0] = to;
                    ring.0[last] = to;
                } else if let Some(c) = ring.0.get_mut(index) {
                    *c = to;
                }
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VertexRef {
    shape: usize,
    vertex: usize,
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// User drawings and the active drawing interaction.
///
/// Switching tools tears everything down: the sketch, any vertex drag, the
/// finished shapes and the polygon area readout.
#[derive(Debug, Default)]
pub struct DrawLayer {
    tool: DrawTool,
    shapes: Vec<DrawnShape>,
    sketch: Vec<Coord<f64>>,
    drag: Option<VertexRef>,
    polygon_area: Option<f64>,
}

impl DrawLayer {
    pub fn tool(&self) -> DrawTool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: DrawTool) {
        if tool == self.tool {
            return;
        }
        log::debug!("Draw tool changed from {} to {}", self.tool, tool);
        *self = Self {
            tool,
            ..Self::default()
        };
    }

    pub fn is_active(&self) -> bool {
        self.tool != DrawTool::None
    }

    pub fn shapes(&self) -> &[DrawnShape] {
        &self.shapes
    }

    pub fn sketch(&self) -> &[Coord<f64>] {
        &self.sketch
    }

    pub fn is_sketching(&self) -> bool {
        !self.sketch.is_empty()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Geodesic area (m²) of the last completed polygon.
    pub fn polygon_area(&self) -> Option<f64> {
        self.polygon_area
    }

    fn nearest_vertex(&self, coord: Coord<f64>, tolerance: f64) -> Option<(VertexRef, Coord<f64>)> {
        self.shapes
            .iter()
            .enumerate()
            .flat_map(|(shape, s)| {
                s.vertices()
                    .into_iter()
                    .enumerate()
                    .map(move |(vertex, c)| (VertexRef { shape, vertex }, c))
            })
            .map(|(at, c)| (at, c, distance(c, coord)))
            .filter(|(_, _, d)| *d <= tolerance)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(at, c, _)| (at, c))
    }

    fn snap(&self, coord: Coord<f64>, tolerance: f64) -> Coord<f64> {
        self.nearest_vertex(coord, tolerance)
            .map_or(coord, |(_, snapped)| snapped)
    }

    /// Handle a map click. Returns `false` when no tool is active.
    pub fn click(&mut self, coord: Coord<f64>, tolerance: f64) -> bool {
        let coord = self.snap(coord, tolerance);
        match self.tool {
            DrawTool::None => return false,
            DrawTool::Point => self.shapes.push(DrawnShape::Point(coord.into())),
            DrawTool::LineString => self.sketch.push(coord),
            DrawTool::Polygon => {
                let closes = self.sketch.len() >= 3
                    && distance(self.sketch[0], coord) <= tolerance;
                if closes {
                    self.finish_sketch(tolerance);
                } else {
                    self.sketch.push(coord);
                }
            }
        }
        true
    }

    /// Complete the current sketch if it has enough vertices.
    pub fn finish_sketch(&mut self, tolerance: f64) -> bool {
        let mut vertices: Vec<Coord<f64>> = Vec::with_capacity(self.sketch.len());
        for c in &self.sketch {
            if vertices.last().map_or(true, |last| distance(*last, *c) > tolerance) {
                vertices.push(*c);
            }
        }

        match self.tool {
            DrawTool::LineString if vertices.len() >= 2 => {
                self.shapes.push(DrawnShape::Line(LineString::new(vertices)));
            }
            DrawTool::Polygon if vertices.len() >= 3 => {
                if distance(vertices[0], vertices[vertices.len() - 1]) <= tolerance {
                    vertices.pop();
                }
                if vertices.len() < 3 {
                    return false;
                }
                let polygon = Polygon::new(LineString::new(vertices), vec![]);
                self.polygon_area =
                    measure::polygon_area(&polygon.map_coords(projection::mercator_to_lonlat));
                log::debug!("Polygon drawn, area {:?} m²", self.polygon_area);
                self.shapes.push(DrawnShape::Polygon(polygon));
            }
            _ => return false,
        }
        self.sketch.clear();
        true
    }

    pub fn abort_sketch(&mut self) {
        self.sketch.clear();
    }

    /// Grab a drawn vertex near `coord`. Only possible between sketches.
    pub fn begin_modify(&mut self, coord: Coord<f64>, tolerance: f64) -> bool {
        if !self.is_active() || self.is_sketching() {
            return false;
        }
        self.drag = self.nearest_vertex(coord, tolerance).map(|(at, _)| at);
        self.drag.is_some()
    }

    pub fn drag_to(&mut self, coord: Coord<f64>) {
        if let Some(at) = self.drag {
            if let Some(shape) = self.shapes.get_mut(at.shape) {
                shape.move_vertex(at.vertex, coord);
            }
        }
    }

    pub fn end_modify(&mut self) {
        self.drag = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    const TOL: f64 = 50.0;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn draw_square(layer: &mut DrawLayer) {
        layer.click(c(8_880_000.0, 770_000.0), TOL);
        layer.click(c(8_881_000.0, 770_000.0), TOL);
        layer.click(c(8_881_000.0, 771_000.0), TOL);
        layer.click(c(8_880_000.0, 771_000.0), TOL);
        // click on the first vertex closes the ring
        layer.click(c(8_880_010.0, 770_010.0), TOL);
    }

    #[test]
    fn no_tool_ignores_clicks() {
        let mut layer = DrawLayer::default();
        assert!(!layer.click(c(0.0, 0.0), TOL));
        assert!(layer.shapes().is_empty());
    }

    #[test]
    fn polygon_completion_sets_area_readout() {
        let mut layer = DrawLayer::default();
        layer.set_tool(DrawTool::Polygon);
        draw_square(&mut layer);

        assert!(!layer.is_sketching());
        assert_eq!(layer.shapes().len(), 1);
        let area = layer.polygon_area().expect("area readout");
        // a 1 km mercator square near 7°N is roughly (1 km * cos 7°)²
        assert!(area > 0.95e6 && area < 1.0e6, "{area}");
    }

    #[test]
    fn switching_polygon_to_none_clears_readout() {
        let mut layer = DrawLayer::default();
        layer.set_tool(DrawTool::Polygon);
        draw_square(&mut layer);
        assert!(layer.polygon_area().is_some());

        layer.set_tool(DrawTool::None);
        assert_eq!(layer.polygon_area(), None);
        assert!(layer.shapes().is_empty());
        assert!(!layer.is_active());
    }

    #[test]
    fn reselecting_the_same_tool_keeps_drawings() {
        let mut layer = DrawLayer::default();
        layer.set_tool(DrawTool::Point);
        layer.click(c(1.0, 1.0), TOL);
        layer.set_tool(DrawTool::Point);
        assert_eq!(layer.shapes().len(), 1);
    }

    #[test]
    fn line_needs_two_distinct_vertices() {
        let mut layer = DrawLayer::default();
        layer.set_tool(DrawTool::LineString);
        layer.click(c(0.0, 0.0), TOL);
        // double click lands a duplicate of the same vertex
        layer.click(c(0.0, 0.0), TOL);
        assert!(!layer.finish_sketch(TOL));
        assert!(layer.is_sketching());

        layer.click(c(500.0, 0.0), TOL);
        layer.click(c(500.0, 0.0), TOL);
        assert!(layer.finish_sketch(TOL));
        assert_eq!(
            layer.shapes(),
            &[DrawnShape::Line(LineString::from(vec![(0.0, 0.0), (500.0, 0.0)]))]
        );
    }

    #[test]
    fn new_vertices_snap_to_existing_ones() {
        let mut layer = DrawLayer::default();
        layer.set_tool(DrawTool::Point);
        layer.click(c(100.0, 100.0), TOL);
        layer.click(c(120.0, 90.0), TOL);
        layer.click(c(400.0, 400.0), TOL);

        let points: Vec<_> = layer
            .shapes()
            .iter()
            .map(|s| match s {
                DrawnShape::Point(p) => p.0,
                other => panic!("unexpected shape {other:?}"),
            })
            .collect();
        assert_eq!(points, vec![c(100.0, 100.0), c(100.0, 100.0), c(400.0, 400.0)]);
    }

    #[test]
    fn dragging_a_ring_vertex_keeps_polygon_closed() {
        let mut layer = DrawLayer::default();
        layer.set_tool(DrawTool::Polygon);
        draw_square(&mut layer);

        assert!(layer.begin_modify(c(8_880_005.0, 770_005.0), TOL));
        layer.drag_to(c(8_879_000.0, 769_000.0));
        layer.end_modify();
        assert!(!layer.is_dragging());

        let DrawnShape::Polygon(polygon) = &layer.shapes()[0] else {
            panic!("expected a polygon");
        };
        let ring = &polygon.exterior().0;
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring[0], c(8_879_000.0, 769_000.0));
        assert!(polygon.unsigned_area() > 1_000_000.0);
    }

    #[test]
    fn cannot_modify_while_sketching() {
        let mut layer = DrawLayer::default();
        layer.set_tool(DrawTool::Point);
        layer.click(c(0.0, 0.0), TOL);
        layer.set_tool(DrawTool::LineString);
        layer.click(c(0.0, 0.0), TOL);
        assert!(!layer.begin_modify(c(0.0, 0.0), TOL));
    }
}
