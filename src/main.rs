#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod breathing;
mod config;
mod markers;
mod pipeline;
#[cfg(test)]
mod test_support;
mod types;
mod ui;

use anyhow::Result;
use config::AppConfig;
use gpui::Application;

fn main() -> Result<()> {
    env_logger::init();

    let config = AppConfig::from_args(std::env::args().skip(1))?;
    log::info!(
        "starting with source {:?}, polling every {:?}",
        config.source,
        config.poll_interval
    );

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, config) {
                log::error!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
