use std::sync::Arc;

use geo::Coord;

use super::division::{BoundaryLayer, DivisionFeature};
use super::draw::{DrawLayer, DrawTool};
use super::map::MapEvent;
use super::view::View;
use crate::maps_api::tile_retriever::BaseLayer;

const DATASET_FIT_PADDING: f64 = 40.0;
const DATASET_FIT_DURATION: f64 = 1.2;

/// Holds at most one feature: the current selection.
#[derive(Debug, Default, Clone)]
pub struct SelectionLayer {
    feature: Option<Arc<DivisionFeature>>,
}

impl SelectionLayer {
    pub fn feature(&self) -> Option<&Arc<DivisionFeature>> {
        self.feature.as_ref()
    }

    pub fn replace(&mut self, feature: Arc<DivisionFeature>) {
        self.feature = Some(feature);
    }

    pub fn clear(&mut self) {
        self.feature = None;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        usize::from(self.feature.is_some())
    }
}

/// The map's layer stack, bottom to top.
#[derive(Default)]
pub struct MapLayers {
    base: BaseLayer,
    pub boundaries: BoundaryLayer,
    pub selection: SelectionLayer,
    pub drawing: DrawLayer,
}

impl MapLayers {
    pub fn new(base: BaseLayer) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn base(&self) -> BaseLayer {
        self.base
    }

    /// Swap the imagery source. Vector layers are left alone.
    pub fn set_base(&mut self, base: BaseLayer) {
        if base != self.base {
            log::info!("Base layer switched to {}", base);
            self.base = base;
        }
    }

    /// Populate the boundary layer and fit the view to the whole dataset.
    pub fn load_boundaries(&mut self, features: Vec<DivisionFeature>, view: &mut View, now: f64) {
        self.boundaries.set_features(features);
        if let Some(extent) = self.boundaries.extent() {
            view.fit(extent, DATASET_FIT_PADDING, DATASET_FIT_DURATION, now);
        }
    }

    /// Route a map click at a mercator coordinate.
    ///
    /// With a draw tool active the click belongs to the drawing and nothing is
    /// reported. Otherwise it selects the feature under the pointer, or nothing.
    /// The second release of a double click finishes a sketch instead of adding
    /// another vertex or point.
    pub fn route_click(
        &mut self,
        coord: Coord<f64>,
        tolerance: f64,
        double_click: bool,
    ) -> Option<MapEvent> {
        if self.drawing.is_active() {
            if !double_click {
                self.drawing.click(coord, tolerance);
            } else if self.drawing.tool() != DrawTool::Point {
                self.drawing.finish_sketch(tolerance);
            }
            return None;
        }
        if double_click {
            return None;
        }
        Some(MapEvent::Select(self.boundaries.hit_test(coord).cloned()))
    }
}
