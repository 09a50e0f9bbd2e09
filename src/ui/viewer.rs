use std::collections::HashSet;
use std::error::Error;
use std::num::NonZeroUsize;
use std::sync::Arc;

use egui::{Color32, RichText};
use lru::LruCache;
use tokio::sync::{mpsc, oneshot};

use super::navbar::Navbar;
use super::sidebar::{Sidebar, SidebarAction, TEAL};
use super::theme;
use crate::config::ViewerConfig;
use crate::map::division::{DivisionFeature, FeatureStyle};
use crate::map::draw::DrawTool;
use crate::map::layers::MapLayers;
use crate::map::map::{Map, MapEvent};
use crate::map::map_tile::{MapTile, TileKey};
use crate::map::view::{self, View};
use crate::maps_api::dataset;
use crate::maps_api::tile_retriever::{BaseLayer, TileError, TileRetriever};
use crate::selection::SelectionController;

type TileMessage = (TileKey, Result<MapTile, TileError>);

/// The page: navbar on top, division sidebar on the left, map in the middle.
pub struct ViewerApp {
    runtime: tokio::runtime::Runtime,
    tile_retriever: TileRetriever,
    tile_cache: LruCache<TileKey, MapTile>,
    pending_tiles: HashSet<TileKey>,
    tile_sender: mpsc::UnboundedSender<TileMessage>,
    tile_receiver: mpsc::UnboundedReceiver<TileMessage>,
    dataset_receiver: Option<oneshot::Receiver<Vec<DivisionFeature>>>,
    view: View,
    layers: MapLayers,
    selection: SelectionController,
    navbar: Navbar,
    sidebar: Sidebar,
    initial_fit_done: bool,
}

impl ViewerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: ViewerConfig,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        cc.egui_ctx.set_style(theme::dark_theme_style(&cc.egui_ctx));

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.fetch_workers)
            .thread_name("gn-viewer-io")
            .enable_all()
            .build()?;
        let tile_retriever = TileRetriever::new(&config.user_agent)?;
        let (tile_sender, tile_receiver) = mpsc::unbounded_channel();

        // The dataset is fetched once; the map shows tiles only until it lands
        let (dataset_sender, dataset_receiver) = oneshot::channel();
        let client = reqwest::Client::builder().user_agent(&config.user_agent).build()?;
        let source = config.dataset_source.clone();
        let requester = cc.egui_ctx.clone();
        runtime.spawn(async move {
            let features = dataset::load_dataset(&client, &source).await;
            if dataset_sender.send(features).is_err() {
                log::debug!("Viewer closed before the dataset arrived");
            }
            requester.request_repaint();
        });

        let cache_size = NonZeroUsize::new(config.tile_cache_size).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            runtime,
            tile_retriever,
            tile_cache: LruCache::new(cache_size),
            pending_tiles: HashSet::new(),
            tile_sender,
            tile_receiver,
            dataset_receiver: Some(dataset_receiver),
            view: View::default(),
            layers: MapLayers::new(config.base_layer),
            selection: SelectionController::default(),
            navbar: Navbar::default(),
            sidebar: Sidebar::default(),
            initial_fit_done: false,
        })
    }

    fn select(&mut self, feature: Option<Arc<DivisionFeature>>, now: f64) {
        self.selection.select(feature, &mut self.layers, &mut self.view, now);
    }

    fn receive_dataset(&mut self, now: f64) {
        let Some(receiver) = self.dataset_receiver.as_mut() else {
            return;
        };
        match receiver.try_recv() {
            Ok(features) => {
                self.layers.load_boundaries(features, &mut self.view, now);
                self.dataset_receiver = None;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                log::warn!("Dataset loader stopped without a result");
                self.dataset_receiver = None;
            }
        }
    }

    fn request_tiles(&mut self, ctx: &egui::Context, missing_tiles: Vec<TileKey>) {
        for key in missing_tiles {
            // Check if we need to fetch the tile, or are waiting for it
            if self.pending_tiles.contains(&key) || self.tile_cache.contains(&key) {
                continue;
            }
            let sender = self.tile_sender.clone();
            let tile_retriever = self.tile_retriever.clone();
            let requester = ctx.clone();

            self.runtime.spawn(async move {
                let result = tile_retriever.fetch_tile(key).await;
                if sender.send((key, result)).is_ok() {
                    requester.request_repaint();
                }
            });
            self.pending_tiles.insert(key);
        }
    }

    fn receive_tiles(&mut self) {
        while let Ok((key, result)) = self.tile_receiver.try_recv() {
            match result {
                Ok(tile) => {
                    self.tile_cache.put(key, tile);
                    self.pending_tiles.remove(&key);
                }
                // Failed tiles stay pending so they are not requested again
                Err(e) => log::warn!("Error fetching tile {:?}: {}", key, e),
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let toggle = if self.sidebar.open { "✕" } else { "☰" };
            let button = egui::Button::new(RichText::new(toggle).size(20.0).color(Color32::WHITE))
                .fill(TEAL)
                .min_size(egui::vec2(36.0, 36.0));
            if ui.add(button).on_hover_text("Toggle sidebar").clicked() {
                self.sidebar.toggle();
            }
            ui.add_space(8.0);

            let mut base = self.layers.base();
            egui::ComboBox::from_id_salt("base_layer")
                .selected_text(base.label())
                .show_ui(ui, |ui| {
                    for layer in BaseLayer::ALL {
                        ui.selectable_value(&mut base, layer, layer.label());
                    }
                });
            self.layers.set_base(base);

            let mut tool = self.layers.drawing.tool();
            egui::ComboBox::from_id_salt("draw_tool")
                .selected_text(format!("Draw: {}", tool))
                .show_ui(ui, |ui| {
                    for option in DrawTool::ALL {
                        ui.selectable_value(&mut tool, option, option.to_string());
                    }
                });
            self.layers.drawing.set_tool(tool);

            if let Some(area) = self.layers.drawing.polygon_area() {
                ui.label(
                    RichText::new(format!("Drawn area: {:.3} sqkm", area / 1_000_000.0))
                        .color(FeatureStyle::highlight().stroke.color),
                );
            }

            if self.layers.boundaries.is_empty() && self.dataset_receiver.is_some() {
                ui.spinner();
                ui.label(RichText::new("Loading divisions…").small());
            }
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Test for f11 key, to toggle fullscreen
        if let Some(new_fullscreen) = ctx.input(|i| {
            if i.key_pressed(egui::Key::F11) { Some(!i.viewport().fullscreen.unwrap_or(false)) }
            else                             { None                                            }
        }) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(new_fullscreen));
            ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
        }

        let now = ctx.input(|i| i.time);

        self.navbar.show(ctx);
        let sidebar_action = self.sidebar.show(ctx, &self.layers.boundaries, &self.selection);

        let mut missing_tiles = Vec::new();
        let mut events = Vec::new();
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(theme::MAP_BG).inner_margin(20.0))
            .show(ctx, |ui| {
                self.toolbar(ui);
                ui.add_space(8.0);
                egui::Frame::none()
                    .rounding(12.0)
                    .stroke(egui::Stroke::new(1.0, Color32::from_white_alpha(6)))
                    .show(ui, |ui| {
                        ui.add(Map::new(
                            &mut self.view,
                            &mut self.layers,
                            &mut self.tile_cache,
                            &mut missing_tiles,
                            &mut events,
                        ));
                    });
            });

        if !self.initial_fit_done {
            self.view.fit(view::extent_from_array(view::SRI_LANKA_EXTENT), 40.0, 1.2, now);
            self.initial_fit_done = true;
        }
        self.receive_dataset(now);

        if let Some(SidebarAction::Select(feature)) = sidebar_action {
            self.select(feature, now);
        }
        for event in events {
            match event {
                MapEvent::Select(feature) => self.select(feature, now),
            }
        }

        self.request_tiles(ctx, missing_tiles);
        self.receive_tiles();

        if self.view.is_animating() {
            ctx.request_repaint();
        }
    }
}
