use std::ops::Range;
use std::sync::Arc;

use rand::Rng;

use crate::map::division::{BoundaryStyle, DivisionFeature};
use crate::map::layers::MapLayers;
use crate::map::measure::{self, Metrics};
use crate::map::view::View;

/// Range of the mock population figure shown for a selection. Not real data.
pub const POPULATION_RANGE: Range<u32> = 1_000..91_000;

#[derive(Debug, Clone)]
pub struct Selection {
    pub feature: Arc<DivisionFeature>,
    pub metrics: Option<Metrics>,
    /// Placeholder estimate, drawn uniformly from [`POPULATION_RANGE`].
    pub population: u32,
}

/// Single entry point for map clicks, the division list and the Clear button.
#[derive(Debug, Default)]
pub struct SelectionController {
    current: Option<Selection>,
}

impl SelectionController {
    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    pub fn metrics(&self) -> Option<Metrics> {
        self.current.as_ref().and_then(|s| s.metrics)
    }

    pub fn population(&self) -> Option<u32> {
        self.current.as_ref().map(|s| s.population)
    }

    pub fn select(
        &mut self,
        feature: Option<Arc<DivisionFeature>>,
        layers: &mut MapLayers,
        view: &mut View,
        now: f64,
    ) {
        self.select_with_rng(feature, layers, view, now, &mut rand::thread_rng());
    }

    pub fn select_with_rng<R: Rng>(
        &mut self,
        feature: Option<Arc<DivisionFeature>>,
        layers: &mut MapLayers,
        view: &mut View,
        now: f64,
        rng: &mut R,
    ) {
        let Some(feature) = feature else {
            if self.current.take().is_some() {
                log::debug!("Selection cleared");
            }
            layers.selection.clear();
            layers.boundaries.set_style(BoundaryStyle::Default);
            return;
        };

        layers.selection.replace(Arc::clone(&feature));

        let metrics = measure::measure(&feature.geometry);
        let population = rng.gen_range(POPULATION_RANGE);
        log::info!(
            "Selected {:?} ({}): {:?}",
            feature.label(),
            feature.ds_division(),
            metrics
        );

        view.fly_to_extent(feature.extent, now);
        layers.boundaries.set_style(BoundaryStyle::HighlightOnly(feature.id));

        self.current = Some(Selection {
            feature,
            metrics,
            population,
        });
    }
}
