mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::KitchenPnlApp;
use config::LoadConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match LoadConfig::from_env_and_args() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            eprintln!("kitchen-pnl: {e}");
            eprintln!("usage: kitchen-pnl [PATH] [--header-row N] [--sheet NAME]");
            std::process::exit(2);
        }
    };
    log::info!(
        "Starting with {} (header row {})",
        config.path.display(),
        config.header_row
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Kitchen Level P&L Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(KitchenPnlApp::new(config)))),
    )
}
