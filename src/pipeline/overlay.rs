use image::{ImageBuffer, Rgb};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::types::{MarkerPair, MarkerPosition};

pub const MARKER_RADIUS: i32 = 6;
const STRAY_RADIUS: i32 = 3;

const CHEST_COLOR: [u8; 3] = [248, 113, 113];
const ABDOMEN_COLOR: [u8; 3] = [56, 189, 248];
const STRAY_COLOR: [u8; 3] = [250, 204, 21];
const LINK_COLOR: [u8; 3] = [226, 232, 240];

/// Draws every detected centroid onto an RGB buffer, highlighting the chest
/// and abdomen pair and linking them with a line. Shapes are clipped to the
/// frame; a buffer too short for `width`x`height` is left untouched.
pub fn draw_markers(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    pair: Option<&MarkerPair>,
    centroids: &[MarkerPosition],
) {
    let Some(mut canvas) = ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(width, height, buffer) else {
        log::warn!("overlay skipped: buffer does not cover {width}x{height}");
        return;
    };

    for point in centroids {
        draw_filled_circle_mut(&mut canvas, (point.x, point.y), STRAY_RADIUS, Rgb(STRAY_COLOR));
    }

    let Some(pair) = pair else {
        return;
    };

    draw_line_segment_mut(
        &mut canvas,
        (pair.chest.x as f32, pair.chest.y as f32),
        (pair.abdomen.x as f32, pair.abdomen.y as f32),
        Rgb(LINK_COLOR),
    );
    draw_filled_circle_mut(
        &mut canvas,
        (pair.chest.x, pair.chest.y),
        MARKER_RADIUS,
        Rgb(CHEST_COLOR),
    );
    draw_filled_circle_mut(
        &mut canvas,
        (pair.abdomen.x, pair.abdomen.y),
        MARKER_RADIUS,
        Rgb(ABDOMEN_COLOR),
    );
}
