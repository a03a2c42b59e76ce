use crate::types::Frame;

pub const GREEN: [u8; 3] = [0, 200, 0];

pub fn blank_frame(width: u32, height: u32) -> Frame {
    Frame::new(vec![0u8; width as usize * height as usize * 3], width, height)
}

/// Fills a `w`x`h` rectangle with its top-left corner at (`x`, `y`).
pub fn paint_rect(frame: &mut Frame, x: u32, y: u32, w: u32, h: u32, rgb: [u8; 3]) {
    for row in y..(y + h).min(frame.height) {
        for col in x..(x + w).min(frame.width) {
            let idx = ((row * frame.width + col) as usize) * 3;
            frame.rgb[idx..idx + 3].copy_from_slice(&rgb);
        }
    }
}

/// Two 9x9 green markers centred at (`x`, `chest_y`) and (`x`, `abdomen_y`).
pub fn two_marker_frame(x: u32, chest_y: u32, abdomen_y: u32) -> Frame {
    let mut frame = blank_frame(120, 160);
    paint_rect(&mut frame, x - 4, chest_y - 4, 9, 9, GREEN);
    paint_rect(&mut frame, x - 4, abdomen_y - 4, 9, 9, GREEN);
    frame
}
