use std::sync::Arc;

use crossbeam_channel::{Receiver, bounded};
use gpui::{
    AnyElement, App, AppContext, Bounds, Context, IntoElement, ObjectFit, ParentElement, Render,
    RenderImage, Styled, StyledImage, TitlebarOptions, Window, WindowBounds, WindowOptions, div,
    img, px, size,
};
use gpui_component::{Root, h_flex, v_flex};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{
    config::AppConfig,
    pipeline::{self, DetectorHandle},
    types::{AnalyzedFrame, BreathingReading, Frame},
};

mod main_view;
mod render_util;

const WINDOW_SIZE: (f32, f32) = (800.0, 600.0);
const INDICATOR_SIZE: f32 = 50.0;
const WAITING_STATUS: &str = "Breathing status: waiting...";

pub fn launch_ui(app: &mut App, config: AppConfig) -> gpui::Result<()> {
    let window_options = WindowOptions {
        window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
            None,
            size(px(WINDOW_SIZE.0), px(WINDOW_SIZE.1)),
            app,
        ))),
        titlebar: Some(TitlebarOptions {
            title: Some("Breath Trainer".into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| AppView::new(config));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    result_rx: Receiver<AnalyzedFrame>,
    detector: Option<DetectorHandle>,
    source_error: Option<String>,
    latest_frame: Option<Frame>,
    latest_reading: Option<BreathingReading>,
    latest_image: Option<Arc<RenderImage>>,
}

impl AppView {
    fn new(config: AppConfig) -> Self {
        let (result_tx, result_rx) = bounded(1);

        let (detector, source_error) = match pipeline::start_detector(
            config.source.clone(),
            config.tracker.clone(),
            config.poll_interval,
            result_tx,
        ) {
            Ok(handle) => {
                log::info!("reading frames from {}", handle.label());
                (Some(handle), None)
            }
            Err(err) => {
                log::error!("failed to start detector: {err:?}");
                (None, Some(format!("{err:#}")))
            }
        };

        Self {
            result_rx,
            detector,
            source_error,
            latest_frame: None,
            latest_reading: None,
            latest_image: None,
        }
    }
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        // Keep polling the detector channel while the window is open.
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        self.render_main(window, cx)
    }
}

impl Drop for AppView {
    fn drop(&mut self) {
        if let Some(detector) = self.detector.take() {
            log::info!("releasing {}", detector.label());
            drop(detector);
        }
    }
}
