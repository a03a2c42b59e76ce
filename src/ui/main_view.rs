use super::render_util::frame_to_image;
use super::{
    AnyElement, AppView, Arc, Context, INDICATOR_SIZE, IntoElement, ObjectFit, ParentElement,
    RenderImage, Styled, StyledImage, WAITING_STATUS, Window, div, h_flex, img, px, v_flex,
};

impl AppView {
    pub(super) fn render_main(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let mut newest = None;
        while let Ok(analyzed) = self.result_rx.try_recv() {
            newest = Some(analyzed);
        }

        if let Some(analyzed) = newest {
            if let Some(image) = frame_to_image(&analyzed.frame, Some(&analyzed.reading)) {
                self.replace_latest_image(image, window, cx);
            }
            self.latest_frame = Some(analyzed.frame);
            self.latest_reading = Some(analyzed.reading);
        }

        let frame_view: AnyElement = if let Some(image) = &self.latest_image {
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element()
        } else {
            let placeholder = self
                .source_error
                .clone()
                .unwrap_or_else(|| "Waiting for video...".to_string());
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .child(placeholder)
                .into_any_element()
        };

        let status_text = self
            .latest_reading
            .as_ref()
            .map(|r| r.status_text())
            .unwrap_or_else(|| WAITING_STATUS.to_string());

        let indicator_color = self
            .latest_reading
            .as_ref()
            .map(|r| r.pattern.indicator_rgb())
            .unwrap_or(0x00ff00);

        let source_text = match (&self.detector, &self.latest_frame) {
            (Some(detector), Some(frame)) => {
                format!("{} {}x{}", detector.label(), frame.width, frame.height)
            }
            (Some(detector), None) => detector.label().to_string(),
            (None, _) => "no video source".to_string(),
        };

        v_flex()
            .size_full()
            .gap_3()
            .p_4()
            .bg(gpui::rgb(0x1a2332))
            .child(
                div()
                    .flex_1()
                    .w_full()
                    .overflow_hidden()
                    .rounded_lg()
                    .bg(gpui::rgb(0x000000))
                    .child(frame_view),
            )
            .child(
                div()
                    .text_base()
                    .text_color(gpui::rgb(0xe2e8f0))
                    .child(status_text),
            )
            .child(
                h_flex()
                    .gap_3()
                    .items_center()
                    .child(
                        div()
                            .w(px(INDICATOR_SIZE))
                            .h(px(INDICATOR_SIZE))
                            .rounded_full()
                            .bg(gpui::rgb(indicator_color)),
                    )
                    .child(
                        div()
                            .text_xs()
                            .text_color(gpui::rgb(0x8b95a5))
                            .overflow_hidden()
                            .text_ellipsis()
                            .whitespace_nowrap()
                            .child(source_text),
                    ),
            )
            .into_any_element()
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // Explicitly drop the previous GPU texture; otherwise the sprite atlas keeps
            // every frame and memory will climb rapidly while the video is running.
            cx.drop_image(old_image, Some(window));
        }
    }
}
