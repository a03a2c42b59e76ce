use super::{Arc, ImageBuffer, ImageFrame, RenderImage, Rgba};
use crate::{
    pipeline::overlay,
    types::{BreathingReading, Frame},
};

pub(super) fn frame_to_image(
    frame: &Frame,
    reading: Option<&BreathingReading>,
) -> Option<Arc<RenderImage>> {
    let mut rgb = frame.rgb.clone();
    if let Some(reading) = reading {
        overlay::draw_markers(
            &mut rgb,
            frame.width,
            frame.height,
            reading.markers.as_ref(),
            &reading.centroids,
        );
    }

    // GPUI expects BGRA; build it directly to avoid the async asset pipeline and flicker.
    let mut bgra = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        bgra.extend_from_slice(&[px[2], px[1], px[0], 255]);
    }

    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(frame.width, frame.height, bgra)?;
    let frame = ImageFrame::new(buffer);

    Some(Arc::new(RenderImage::new(vec![frame])))
}
