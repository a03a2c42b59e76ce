use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::Result;
use crossbeam_channel::{Sender, TrySendError, tick};

use super::source::{FrameSource, SourceError, open_source};
use crate::{
    breathing::BreathingClassifier,
    config::{SourceSpec, TrackerConfig},
    markers::{FrameError, MarkerTracker},
    types::{AnalyzedFrame, BreathingPattern, BreathingReading, Frame},
};

/// Marker tracking plus breathing classification for one subject.
pub struct BreathDetector {
    tracker: MarkerTracker,
    classifier: BreathingClassifier,
}

impl BreathDetector {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            tracker: MarkerTracker::new(config.range),
            classifier: BreathingClassifier::new(config.history_capacity),
        }
    }

    pub fn process(&mut self, frame: &Frame) -> Result<BreathingReading, FrameError> {
        let scan = self.tracker.scan(frame)?;
        let pattern = match scan.pair {
            Some(pair) => self.classifier.observe(pair, frame.timestamp),
            None => BreathingPattern::MarkersNotFound,
        };

        Ok(BreathingReading {
            pattern,
            markers: scan.pair,
            centroids: scan.centroids,
        })
    }

    pub fn classifier(&self) -> &BreathingClassifier {
        &self.classifier
    }
}

/// One poll step: read a frame, analyse it. Every failure is logged and turns
/// into "nothing new this tick".
pub fn run_tick(source: &mut dyn FrameSource, detector: &mut BreathDetector) -> Option<AnalyzedFrame> {
    let frame = match source.read() {
        Ok(frame) => frame,
        Err(SourceError::EndOfStream) => {
            log::info!("end of stream on {}, rewinding", source.label());
            if let Err(err) = source.rewind() {
                log::warn!("failed to rewind {}: {err}", source.label());
            }
            return None;
        }
        Err(err) => {
            log::warn!("frame read failed: {err}");
            return None;
        }
    };

    match detector.process(&frame) {
        Ok(reading) => {
            log::debug!(
                "{} (markers: {:?}, blobs: {})",
                reading.pattern.display_name(),
                reading.markers,
                reading.centroids.len()
            );
            Some(AnalyzedFrame { frame, reading })
        }
        Err(err) => {
            log::warn!("skipping malformed frame: {err}");
            None
        }
    }
}

#[derive(Debug)]
pub struct DetectorHandle {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    label: String,
}

impl DetectorHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    #[allow(dead_code)]
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns the poll worker. It owns the frame source and the detector, ticks
/// every `interval`, and hands each analysed frame to `result_tx`, dropping it
/// when the receiver has not caught up.
pub fn start_detector(
    spec: SourceSpec,
    config: TrackerConfig,
    interval: Duration,
    result_tx: Sender<AnalyzedFrame>,
) -> Result<DetectorHandle> {
    // Fail fast before spawning the worker; camera handles cannot cross threads,
    // so the worker reopens whatever opened here.
    let (opened, resolved) = open_source(&spec)?;
    let label = opened.label();
    drop(opened);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        let mut source = match open_source(&resolved) {
            Ok((source, _)) => source,
            Err(err) => {
                log::error!("failed to open frame source: {err:?}");
                return;
            }
        };

        let mut detector = BreathDetector::new(&config);
        log::info!(
            "detector running on {} every {:?} (history {} samples)",
            source.label(),
            interval,
            detector.classifier().history().capacity()
        );

        let ticker = tick(interval);
        while !stop_flag.load(Ordering::Relaxed) {
            if ticker.recv().is_err() {
                break;
            }

            if let Some(analyzed) = run_tick(source.as_mut(), &mut detector) {
                if let Err(TrySendError::Disconnected(_)) = result_tx.try_send(analyzed) {
                    break;
                }
            }
        }

        log::info!("detector stopped");
    });

    Ok(DetectorHandle {
        stop,
        handle: Some(handle),
        label,
    })
}
