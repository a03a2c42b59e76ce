use std::path::{Path, PathBuf};

use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::source::{FrameSource, SourceError};
use crate::types::Frame;

/// A video file decoded through OpenCV's capture backend, looped by seeking
/// back to frame 0.
pub struct VideoFileSource {
    capture: VideoCapture,
    path: PathBuf,
    bgr: Mat,
    rgb: Mat,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let video_err = |source| SourceError::Video {
            path: path.to_path_buf(),
            source,
        };

        let capture =
            VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY).map_err(video_err)?;
        if !capture.is_opened().map_err(video_err)? {
            return Err(SourceError::Empty(path.to_path_buf()));
        }

        let source = Self {
            capture,
            path: path.to_path_buf(),
            bgr: Mat::default(),
            rgb: Mat::default(),
        };
        log::info!(
            "opened {} ({}x{} @ {:.1} fps)",
            path.display(),
            source.property(videoio::CAP_PROP_FRAME_WIDTH),
            source.property(videoio::CAP_PROP_FRAME_HEIGHT),
            source.property(videoio::CAP_PROP_FPS)
        );
        Ok(source)
    }

    fn property(&self, id: i32) -> f64 {
        self.capture.get(id).unwrap_or(0.0)
    }

    fn video_err(&self, source: opencv::Error) -> SourceError {
        SourceError::Video {
            path: self.path.clone(),
            source,
        }
    }
}

impl FrameSource for VideoFileSource {
    fn read(&mut self) -> Result<Frame, SourceError> {
        let grabbed = self
            .capture
            .read(&mut self.bgr)
            .map_err(|err| self.video_err(err))?;
        if !grabbed || self.bgr.empty() {
            return Err(SourceError::EndOfStream);
        }

        imgproc::cvt_color(&self.bgr, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|err| self.video_err(err))?;
        let width = self.rgb.cols().max(0) as u32;
        let height = self.rgb.rows().max(0) as u32;
        let rgb = self
            .rgb
            .data_bytes()
            .map_err(|err| self.video_err(err))?
            .to_vec();
        Ok(Frame::new(rgb, width, height))
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        let seeked = self
            .capture
            .set(videoio::CAP_PROP_POS_FRAMES, 0.0)
            .map_err(|err| self.video_err(err))?;
        if !seeked {
            log::warn!("{} did not accept a seek to frame 0", self.path.display());
        }
        Ok(())
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }
}
