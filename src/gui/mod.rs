mod app;
pub mod menu;
mod player;

use anyhow::Result;

use crate::config::Config;
use crate::sources::saavn::SaavnClient;

pub fn launch(config: Config) -> Result<()> {
    let source = SaavnClient::new(&config.api)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 720.0])
            .with_min_inner_size([480.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Music Player",
        options,
        Box::new(move |cc| Ok(Box::new(app::PlayerApp::new(cc, config, source)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to start the GUI: {}", e))
}
