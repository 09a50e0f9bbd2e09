#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod error;
mod map;
mod maps_api;
mod selection;
mod ui;

fn main() -> eframe::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = config::ViewerConfig::from_env();
    log::info!("Starting with {:?}", config);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::vec2(1440.0, 900.0))
            .with_min_inner_size(egui::vec2(640.0, 400.0))
            .with_title("GN Division Viewer")
            .with_resizable(true)
            .with_decorations(true),
        ..Default::default()
    };

    eframe::run_native(
        "GN Division Viewer",
        native_options,
        // The map needs a live graphics context, so it is only built once the window exists
        Box::new(move |cc| {
            let app = ui::viewer::ViewerApp::new(cc, config)?;
            Ok(Box::new(app))
        }),
    )
}
