mod aggregate;
mod config;
mod error;
mod filters;
mod forecast;
mod loader;
mod model;
mod pipeline;
mod stats;
mod ui;

use config::{DashboardConfig, CONFIG_FILE};
use eframe::egui;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ui::RetailDashboardApp;

const SEGOE_UI_PATH: &str = "C:\\Windows\\Fonts\\segoeui.ttf";

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = DashboardConfig::load(Path::new(CONFIG_FILE));
    info!(?config, "starting dashboard");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1500.0, 1000.0])
            .with_min_inner_size([1100.0, 700.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Retail Sales Forecast Dashboard",
        options,
        Box::new(move |cc| {
            let mut fonts = egui::FontDefinitions::default();

            if let Ok(segoe_data) = std::fs::read(SEGOE_UI_PATH) {
                fonts.font_data.insert(
                    "SegoeUI".to_owned(),
                    egui::FontData::from_owned(segoe_data).into(),
                );
                if let Some(family) = fonts.families.get_mut(&egui::FontFamily::Proportional) {
                    family.insert(0, "SegoeUI".to_owned());
                }
            }

            cc.egui_ctx.set_fonts(fonts);
            ui::set_custom_style(&cc.egui_ctx);
            Ok(Box::new(RetailDashboardApp::new(config)))
        }),
    )
}
