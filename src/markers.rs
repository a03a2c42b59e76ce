use image::GrayImage;
use imageproc::{
    contours::{BorderType, Contour, find_contours},
    point::Point,
};
use rayon::prelude::*;
use thiserror::Error;

use crate::types::{Frame, MarkerPair, MarkerPosition};

/// Binary mask over a frame: 255 where the pixel falls inside the marker colour
/// range, 0 elsewhere.
pub type ColorMask = GrayImage;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("frame buffer size mismatch: got {got}, expected {expected}")]
    BufferSize { got: usize, expected: usize },
}

/// Inclusive hue/saturation/value bounds. Hue is in [0, 180), saturation and
/// value in [0, 255].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const GREEN_MARKER: HsvRange = HsvRange {
        lower: [35, 50, 50],
        upper: [85, 255, 255],
    };

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }
}

/// Converts one RGB pixel to 8-bit HSV (hue halved to fit a byte).
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(i32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let saturation = if max == 0 {
        0
    } else {
        (255.0 * diff as f32 / max as f32).round() as i32
    };

    let hue = if diff == 0 {
        0
    } else {
        let diff = diff as f32;
        let mut degrees = if max == r {
            60.0 * (g - b) as f32 / diff
        } else if max == g {
            120.0 + 60.0 * (b - r) as f32 / diff
        } else {
            240.0 + 60.0 * (r - g) as f32 / diff
        };
        if degrees < 0.0 {
            degrees += 360.0;
        }
        let half = (degrees / 2.0).round() as i32;
        if half >= 180 { half - 180 } else { half }
    };

    [hue as u8, saturation.clamp(0, 255) as u8, max as u8]
}

pub fn validate_frame(frame: &Frame) -> Result<(), FrameError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(FrameError::Empty {
            width: frame.width,
            height: frame.height,
        });
    }
    let expected = frame.expected_len();
    if frame.rgb.len() != expected {
        return Err(FrameError::BufferSize {
            got: frame.rgb.len(),
            expected,
        });
    }
    Ok(())
}

pub fn segment(frame: &Frame, range: &HsvRange) -> Result<ColorMask, FrameError> {
    validate_frame(frame)?;

    let mut mask = vec![0u8; frame.width as usize * frame.height as usize];
    mask.par_iter_mut()
        .zip(frame.rgb.par_chunks_exact(3))
        .for_each(|(dst, px)| {
            if range.contains(rgb_to_hsv([px[0], px[1], px[2]])) {
                *dst = 255;
            }
        });

    GrayImage::from_raw(frame.width, frame.height, mask).ok_or(FrameError::BufferSize {
        got: frame.rgb.len(),
        expected: frame.expected_len(),
    })
}

/// Centroids of every top-level blob in the mask, topmost first. Blobs on the
/// same row come out in reverse scan order, so the rightmost one leads.
///
/// Blobs nested inside another blob's hole are not reported, and neither are
/// blobs whose outline encloses no area (single pixels, one-pixel lines).
pub fn marker_centroids(mask: &ColorMask) -> Vec<MarkerPosition> {
    let contours: Vec<Contour<i32>> = find_contours(mask);
    let mut centroids: Vec<MarkerPosition> = contours
        .iter()
        .rev()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter_map(|c| contour_centroid(&c.points))
        .collect();

    centroids.sort_by_key(|p| p.y);
    centroids
}

/// First-order polygon moments of a closed outline (m10/m00, m01/m00).
fn contour_centroid(points: &[Point<i32>]) -> Option<MarkerPosition> {
    if points.len() < 3 {
        return None;
    }

    let mut m00 = 0.0f64;
    let mut m10 = 0.0f64;
    let mut m01 = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let cross = (p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64) as f64;
        m00 += cross;
        m10 += (p.x + q.x) as f64 * cross;
        m01 += (p.y + q.y) as f64 * cross;
    }
    m00 /= 2.0;
    m10 /= 6.0;
    m01 /= 6.0;

    if m00.abs() <= f64::EPSILON {
        return None;
    }

    Some(MarkerPosition::new(
        (m10 / m00) as i32,
        (m01 / m00) as i32,
    ))
}

/// Assigns the topmost centroid to the chest and the next one to the abdomen.
/// Expects `centroids` sorted by ascending y. A third blob is ignored and
/// markers that cross vertically swap roles.
pub fn select_pair(centroids: &[MarkerPosition]) -> Option<MarkerPair> {
    match centroids {
        [chest, abdomen, ..] => Some(MarkerPair {
            chest: *chest,
            abdomen: *abdomen,
        }),
        _ => None,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkerScan {
    pub centroids: Vec<MarkerPosition>,
    pub pair: Option<MarkerPair>,
}

#[derive(Clone, Debug)]
pub struct MarkerTracker {
    range: HsvRange,
}

impl Default for MarkerTracker {
    fn default() -> Self {
        Self::new(HsvRange::GREEN_MARKER)
    }
}

impl MarkerTracker {
    pub fn new(range: HsvRange) -> Self {
        Self { range }
    }

    pub fn scan(&self, frame: &Frame) -> Result<MarkerScan, FrameError> {
        let mask = segment(frame, &self.range)?;
        let centroids = marker_centroids(&mask);
        let pair = select_pair(&centroids);
        Ok(MarkerScan { centroids, pair })
    }

    pub fn locate_markers(&self, frame: &Frame) -> Result<Option<MarkerPair>, FrameError> {
        self.scan(frame).map(|scan| scan.pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{GREEN, blank_frame, paint_rect};

    #[test]
    fn hsv_matches_eight_bit_convention() {
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
        assert_eq!(rgb_to_hsv([255, 0, 128]), [165, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 255]), [90, 255, 255]);
    }

    #[test]
    fn green_range_bounds() {
        let range = HsvRange::GREEN_MARKER;
        assert!(range.contains(rgb_to_hsv([0, 255, 0])));
        assert!(range.contains(rgb_to_hsv([200, 255, 200])));
        // too pale
        assert!(!range.contains(rgb_to_hsv([220, 255, 220])));
        // too dark
        assert!(!range.contains(rgb_to_hsv([0, 40, 0])));
        // yellow and cyan sit just outside the hue band
        assert!(!range.contains(rgb_to_hsv([255, 255, 0])));
        assert!(!range.contains(rgb_to_hsv([0, 255, 255])));
        assert!(range.contains([35, 50, 50]));
        assert!(range.contains([85, 255, 255]));
        assert!(!range.contains([34, 255, 255]));
        assert!(!range.contains([86, 255, 255]));
        assert!(!range.contains([60, 49, 255]));
    }

    #[test]
    fn segment_marks_only_green_pixels() {
        let mut frame = blank_frame(8, 4);
        paint_rect(&mut frame, 1, 1, 2, 2, GREEN);
        paint_rect(&mut frame, 5, 1, 2, 2, [255, 0, 0]);

        let mask = segment(&frame, &HsvRange::GREEN_MARKER).unwrap();
        assert_eq!(mask.dimensions(), (8, 4));
        assert_eq!(mask.get_pixel(1, 1).0, [255]);
        assert_eq!(mask.get_pixel(2, 2).0, [255]);
        assert_eq!(mask.get_pixel(5, 1).0, [0]);
        assert_eq!(mask.get_pixel(0, 0).0, [0]);
        assert_eq!(mask.pixels().filter(|p| p.0[0] == 255).count(), 4);
    }

    #[test]
    fn malformed_frames_are_rejected() {
        let mut frame = blank_frame(4, 4);
        frame.rgb.truncate(10);
        assert!(matches!(
            segment(&frame, &HsvRange::GREEN_MARKER),
            Err(FrameError::BufferSize {
                got: 10,
                expected: 48
            })
        ));

        let empty = blank_frame(0, 4);
        assert!(matches!(
            MarkerTracker::default().scan(&empty),
            Err(FrameError::Empty { .. })
        ));
    }

    #[test]
    fn rectangle_centroid_is_its_center() {
        let mut frame = blank_frame(64, 64);
        paint_rect(&mut frame, 10, 20, 11, 7, GREEN);
        let mask = segment(&frame, &HsvRange::GREEN_MARKER).unwrap();
        assert_eq!(marker_centroids(&mask), vec![MarkerPosition::new(15, 23)]);
    }

    #[test]
    fn no_or_one_blob_means_not_found() {
        let tracker = MarkerTracker::default();
        let frame = blank_frame(40, 40);
        assert_eq!(tracker.locate_markers(&frame).unwrap(), None);

        let mut frame = blank_frame(40, 40);
        paint_rect(&mut frame, 5, 5, 9, 9, GREEN);
        let scan = tracker.scan(&frame).unwrap();
        assert_eq!(scan.centroids.len(), 1);
        assert_eq!(scan.pair, None);
    }

    #[test]
    fn topmost_blob_is_chest() {
        let tracker = MarkerTracker::default();
        let mut frame = blank_frame(80, 80);
        // abdomen painted first and further left to make sure order comes from y
        paint_rect(&mut frame, 2, 50, 9, 9, GREEN);
        paint_rect(&mut frame, 40, 10, 9, 9, GREEN);

        let pair = tracker.locate_markers(&frame).unwrap().unwrap();
        assert_eq!(pair.chest, MarkerPosition::new(44, 14));
        assert_eq!(pair.abdomen, MarkerPosition::new(6, 54));
        assert!(pair.chest.y <= pair.abdomen.y);
    }

    #[test]
    fn equal_rows_put_the_right_blob_on_the_chest() {
        let tracker = MarkerTracker::default();
        let mut frame = blank_frame(80, 40);
        paint_rect(&mut frame, 5, 10, 9, 9, GREEN);
        paint_rect(&mut frame, 50, 10, 9, 9, GREEN);

        let pair = tracker.locate_markers(&frame).unwrap().unwrap();
        assert_eq!(pair.chest, MarkerPosition::new(54, 14));
        assert_eq!(pair.abdomen, MarkerPosition::new(9, 14));
    }

    #[test]
    fn third_blob_below_is_ignored() {
        let tracker = MarkerTracker::default();
        let mut frame = blank_frame(60, 100);
        paint_rect(&mut frame, 10, 70, 9, 9, GREEN);
        paint_rect(&mut frame, 10, 40, 9, 9, GREEN);
        paint_rect(&mut frame, 10, 10, 9, 9, GREEN);

        let scan = tracker.scan(&frame).unwrap();
        assert_eq!(scan.centroids.len(), 3);
        let pair = scan.pair.unwrap();
        assert_eq!(pair.chest.y, 14);
        assert_eq!(pair.abdomen.y, 44);
    }

    #[test]
    fn zero_area_blobs_are_skipped() {
        let tracker = MarkerTracker::default();
        let mut frame = blank_frame(60, 60);
        paint_rect(&mut frame, 5, 5, 1, 1, GREEN);
        paint_rect(&mut frame, 30, 2, 1, 20, GREEN);
        paint_rect(&mut frame, 10, 40, 9, 9, GREEN);

        let scan = tracker.scan(&frame).unwrap();
        assert_eq!(scan.centroids, vec![MarkerPosition::new(14, 44)]);
        assert_eq!(scan.pair, None);
    }

    #[test]
    fn blobs_inside_holes_are_not_external() {
        let tracker = MarkerTracker::default();
        let mut frame = blank_frame(80, 80);
        // ring with a dot inside its hole
        paint_rect(&mut frame, 10, 10, 21, 21, GREEN);
        paint_rect(&mut frame, 13, 13, 15, 15, [0, 0, 0]);
        paint_rect(&mut frame, 18, 18, 5, 5, GREEN);
        // separate marker further down
        paint_rect(&mut frame, 50, 60, 9, 9, GREEN);

        let scan = tracker.scan(&frame).unwrap();
        assert_eq!(
            scan.centroids,
            vec![MarkerPosition::new(20, 20), MarkerPosition::new(54, 64)]
        );
    }

    #[test]
    fn select_pair_needs_two() {
        assert_eq!(select_pair(&[]), None);
        assert_eq!(select_pair(&[MarkerPosition::new(1, 1)]), None);
        let pair = select_pair(&[MarkerPosition::new(1, 1), MarkerPosition::new(3, 9)]).unwrap();
        assert_eq!(pair.chest, MarkerPosition::new(1, 1));
        assert_eq!(pair.abdomen, MarkerPosition::new(3, 9));
    }
}
