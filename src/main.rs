#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;

use eframe::NativeOptions;
use egui::ViewportBuilder;

use crate::app::ThumbPaneApp;

fn main() -> eframe::Result<()> {
    env_logger::init(); // RUST_LOG=debug for dialog/export tracing

    let native_options = NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size((440.0, 880.0))
            .with_min_inner_size((380.0, 640.0))
            .with_clamp_size_to_monitor_size(true)
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "thumbpane",
        native_options,
        Box::new(|cc| Ok(Box::new(ThumbPaneApp::new(cc)))),
    )
}
