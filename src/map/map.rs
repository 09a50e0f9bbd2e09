use std::sync::Arc;

use egui::epaint::{Mesh, Shape};
use egui::{pos2, vec2, Color32, Pos2, Rect, Response, Sense, Stroke, Ui, Widget};
use geo::{Coord, LineString, MultiPolygon, TriangulateEarcut};
use lru::LruCache;

use super::division::{DivisionFeature, FeatureId, FeatureStyle};
use super::draw::{DrawnShape, SNAP_TOLERANCE_PX};
use super::layers::MapLayers;
use super::map_tile::{MapTile, TileKey};
use super::projection;
use super::view::View;

const TILE_PLACEHOLDER: Color32 = Color32::from_rgb(0x11, 0x18, 0x27);
const DRAW_FILL: Color32 = Color32::from_rgba_premultiplied(40, 40, 40, 40);
const DRAW_STROKE: Color32 = Color32::from_rgb(0xff, 0xcc, 0x33);

/// Something the shell has to act on after the map was drawn.
pub enum MapEvent {
    /// A click outside drawing mode: the feature under the pointer, or none.
    Select(Option<Arc<DivisionFeature>>),
}

pub struct Map<'a> {
    view: &'a mut View,
    layers: &'a mut MapLayers,
    tile_cache: &'a mut LruCache<TileKey, MapTile>,
    missing_tiles: &'a mut Vec<TileKey>,
    events: &'a mut Vec<MapEvent>,
}

impl<'a> Map<'a> {
    pub fn new(
        view: &'a mut View,
        layers: &'a mut MapLayers,
        tile_cache: &'a mut LruCache<TileKey, MapTile>,
        missing_tiles: &'a mut Vec<TileKey>,
        events: &'a mut Vec<MapEvent>,
    ) -> Self {
        Self {
            view,
            layers,
            tile_cache,
            missing_tiles,
            events,
        }
    }
}

/// Screen placement of map coordinates for one frame.
struct Projector {
    center: Pos2,
    view_center: Coord<f64>,
    resolution: f64,
}

impl Projector {
    fn new(rect: Rect, view: &View) -> Self {
        Self {
            center: rect.center(),
            view_center: view.center(),
            resolution: view.resolution(),
        }
    }

    fn to_screen(&self, coord: Coord<f64>) -> Pos2 {
        self.center
            + vec2(
                ((coord.x - self.view_center.x) / self.resolution) as f32,
                ((self.view_center.y - coord.y) / self.resolution) as f32,
            )
    }

    fn ring(&self, ring: &LineString<f64>) -> Vec<Pos2> {
        ring.0.iter().map(|c| self.to_screen(*c)).collect()
    }
}

fn paint_triangles(painter: &egui::Painter, projector: &Projector, triangles: &[[Coord<f64>; 3]], fill: Color32) {
    if fill.a() == 0 || triangles.is_empty() {
        return;
    }
    let mut mesh = Mesh::default();
    for triangle in triangles {
        let first = mesh.vertices.len() as u32;
        for corner in triangle {
            mesh.colored_vertex(projector.to_screen(*corner), fill);
        }
        mesh.add_triangle(first, first + 1, first + 2);
    }
    painter.add(Shape::mesh(mesh));
}

fn paint_outline(painter: &egui::Painter, projector: &Projector, outline: &MultiPolygon<f64>, stroke: Stroke) {
    for polygon in outline.iter() {
        painter.add(Shape::closed_line(projector.ring(polygon.exterior()), stroke));
        for interior in polygon.interiors() {
            painter.add(Shape::closed_line(projector.ring(interior), stroke));
        }
    }
}

fn paint_division(painter: &egui::Painter, projector: &Projector, feature: &DivisionFeature, style: FeatureStyle) {
    paint_triangles(painter, projector, feature.triangles(), style.fill);
    paint_outline(painter, projector, &feature.projected, style.stroke);
}

fn screen_to_map(view: &View, rect: Rect, pos: Pos2) -> Coord<f64> {
    let offset = pos - rect.center();
    view.offset_to_map(offset.x as f64, offset.y as f64)
}

fn paint_vertex(painter: &egui::Painter, at: Pos2) {
    painter.circle(at, 4.0, DRAW_STROKE, Stroke::new(1.5, Color32::WHITE));
}

impl<'a> Widget for Map<'a> {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let now = ui.input(|i| i.time);

        self.view.set_viewport_size(rect.width() as f64, rect.height() as f64);
        self.view.tick(now);

        let tolerance = SNAP_TOLERANCE_PX * self.view.resolution();

        // Dragging either moves a drawn vertex or pans the map
        if response.drag_started() {
            if let Some(origin) = ui.input(|i| i.pointer.press_origin()) {
                let coord = screen_to_map(self.view, rect, origin);
                self.layers.drawing.begin_modify(coord, tolerance);
            }
        }
        if response.dragged() {
            if self.layers.drawing.is_dragging() {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.layers.drawing.drag_to(screen_to_map(self.view, rect, pos));
                }
            } else {
                let delta = response.drag_delta();
                self.view.pan_pixels(delta.x as f64, delta.y as f64);
            }
        }
        if response.drag_stopped() {
            self.layers.drawing.end_modify();
        }

        if response.contains_pointer() {
            let anchor = ui
                .input(|i| i.pointer.hover_pos())
                .map(|pos| pos - rect.center())
                .map_or((0.0, 0.0), |offset| (offset.x as f64, offset.y as f64));

            // Pinch or ctrl+scroll
            let zoom_delta = ui.input(|i| i.zoom_delta());
            if (zoom_delta - 1.0).abs() > f32::EPSILON {
                self.view.zoom_around(self.view.zoom() + (zoom_delta as f64).log2(), anchor);
            } else {
                let scroll = ui.input(|i| i.smooth_scroll_delta.y);
                if scroll.abs() > f32::EPSILON {
                    // Normalize scroll further using tanh
                    let step = (scroll as f64 / 10.0).tanh();
                    self.view.zoom_around(self.view.zoom() + step, anchor);
                }
            }
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let coord = screen_to_map(self.view, rect, pos);
                let double_click = response.double_clicked();
                if let Some(event) = self.layers.route_click(coord, tolerance, double_click) {
                    self.events.push(event);
                }
            }
        }
        if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.layers.drawing.abort_sketch();
        }

        if response.contains_pointer() && self.layers.drawing.is_active() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Crosshair);
        } else if response.dragged() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        }

        let painter = ui.painter_at(rect);
        let projector = Projector::new(rect, self.view);
        let extent = self.view.extent();

        // Base imagery
        let zoom = projection::tile_zoom(self.view.zoom());
        let base = self.layers.base();
        for (x, y) in projection::tiles_covering(extent, zoom) {
            let tile_extent = projection::tile_extent(x, y, zoom);
            let tile_rect = Rect::from_min_max(
                projector.to_screen(Coord { x: tile_extent.min().x, y: tile_extent.max().y }),
                projector.to_screen(Coord { x: tile_extent.max().x, y: tile_extent.min().y }),
            );
            let key = TileKey::new(base, zoom, x, y);
            if let Some(tile) = self.tile_cache.get_mut(&key) {
                let texture = tile.texture(ui.ctx());
                painter.image(
                    texture.id(),
                    tile_rect,
                    Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            } else {
                self.missing_tiles.push(key);
                painter.rect_filled(tile_rect, 0.0, TILE_PLACEHOLDER);
            }
        }

        // Boundaries, skipping anything under a pixel across
        let boundaries = &mut self.layers.boundaries;
        let fill = boundaries.fills_at(self.view.zoom());
        let visible: Vec<FeatureId> = boundaries
            .visible(extent, self.view.resolution())
            .iter()
            .map(|feature| feature.id)
            .collect();
        for id in visible {
            let Some(style) = boundaries.style_for(id) else {
                continue;
            };
            if fill {
                if let Some(feature) = boundaries.get(id) {
                    paint_triangles(&painter, &projector, feature.triangles(), style.fill);
                }
            }
            if let Some(outline) = boundaries.outline(id, zoom) {
                paint_outline(&painter, &projector, outline, style.stroke);
            }
        }

        // Selection
        if let Some(feature) = self.layers.selection.feature() {
            paint_division(&painter, &projector, feature, FeatureStyle::selected());
        }

        // Drawings
        let draw_stroke = Stroke::new(2.5, DRAW_STROKE);
        for shape in self.layers.drawing.shapes() {
            match shape {
                DrawnShape::Point(point) => paint_vertex(&painter, projector.to_screen(point.0)),
                DrawnShape::Line(line) => {
                    painter.add(Shape::line(projector.ring(line), draw_stroke));
                }
                DrawnShape::Polygon(polygon) => {
                    let triangles: Vec<[Coord<f64>; 3]> = polygon
                        .earcut_triangles()
                        .into_iter()
                        .map(|t| [t.0, t.1, t.2])
                        .collect();
                    paint_triangles(&painter, &projector, &triangles, DRAW_FILL);
                    painter.add(Shape::closed_line(projector.ring(polygon.exterior()), draw_stroke));
                }
            }
        }

        let sketch = self.layers.drawing.sketch();
        if !sketch.is_empty() {
            let mut points: Vec<Pos2> = sketch.iter().map(|c| projector.to_screen(*c)).collect();
            if let Some(hover) = response.hover_pos() {
                points.push(hover);
            }
            painter.add(Shape::line(points, Stroke::new(2.0, DRAW_STROKE.gamma_multiply(0.8))));
            for c in sketch {
                paint_vertex(&painter, projector.to_screen(*c));
            }
        }

        painter.text(
            rect.right_bottom() - vec2(8.0, 6.0),
            egui::Align2::RIGHT_BOTTOM,
            base.attribution(),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );

        if self.view.is_animating() || self.layers.drawing.is_sketching() {
            ui.ctx().request_repaint();
        }

        response
    }
}
