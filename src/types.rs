use std::time::Instant;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgb: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgb,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    pub fn expected_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(3)
    }
}

/// Integer pixel centroid of one marker blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkerPosition {
    pub x: i32,
    pub y: i32,
}

impl MarkerPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The two markers picked for one tick. `chest` is always the upper one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerPair {
    pub chest: MarkerPosition,
    pub abdomen: MarkerPosition,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreathingPattern {
    Diaphragmatic,
    ChestShallow,
    Asynchronous,
    Normal,
    MarkersNotFound,
}

impl BreathingPattern {
    pub fn display_name(&self) -> &'static str {
        match self {
            BreathingPattern::Diaphragmatic => "diaphragmatic/normal breathing",
            BreathingPattern::ChestShallow => "chest/shallow breathing",
            BreathingPattern::Asynchronous => "asynchronous breathing",
            BreathingPattern::Normal => "breathing normal.",
            BreathingPattern::MarkersNotFound => "markers not found",
        }
    }

    /// Patterns that light the indicator red.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            BreathingPattern::ChestShallow | BreathingPattern::Asynchronous
        )
    }

    pub fn indicator_rgb(&self) -> u32 {
        if self.is_alert() { 0xff0000 } else { 0x00ff00 }
    }
}

#[derive(Clone, Debug)]
pub struct BreathingReading {
    pub pattern: BreathingPattern,
    pub markers: Option<MarkerPair>,
    /// Every blob found this tick, topmost first.
    pub centroids: Vec<MarkerPosition>,
}

impl BreathingReading {
    pub fn status_text(&self) -> String {
        format!("Breathing status: {}", self.pattern.display_name())
    }
}

#[derive(Clone, Debug)]
pub struct AnalyzedFrame {
    pub frame: Frame,
    pub reading: BreathingReading,
}
