use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Result;
use thiserror::Error;

use crate::{config::SourceSpec, types::Frame};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "m4v", "webm"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("end of stream")]
    EndOfStream,
    #[error("no image frames found in {}", .0.display())]
    Empty(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[cfg(feature = "video-opencv")]
    #[error("video error on {}: {source}", .path.display())]
    Video {
        path: PathBuf,
        #[source]
        source: opencv::Error,
    },
    #[cfg(not(feature = "video-opencv"))]
    #[error("{} is a video file but video playback is disabled (enable the video-opencv feature)", .0.display())]
    VideoDisabled(PathBuf),
    #[error(transparent)]
    Camera(#[from] anyhow::Error),
}

/// Something that hands out frames on demand, one per poll tick.
pub trait FrameSource {
    /// Next frame, or `SourceError::EndOfStream` once a finite source runs dry.
    fn read(&mut self) -> Result<Frame, SourceError>;
    fn rewind(&mut self) -> Result<(), SourceError>;
    fn label(&self) -> String;
}

/// Still images played back in file-name order. A directory gives a clip, a
/// single file gives a one-frame loop.
#[derive(Debug)]
pub struct ImageSequenceSource {
    root: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequenceSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let io_err = |source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        };

        let metadata = fs::metadata(path).map_err(io_err)?;
        let files = if metadata.is_dir() {
            let mut files = Vec::new();
            for entry in fs::read_dir(path).map_err(io_err)? {
                let entry_path = entry.map_err(io_err)?.path();
                if entry_path.is_file() && is_frame_file(&entry_path) {
                    files.push(entry_path);
                }
            }
            files.sort();
            files
        } else if is_frame_file(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };

        if files.is_empty() {
            return Err(SourceError::Empty(path.to_path_buf()));
        }

        Ok(Self {
            root: path.to_path_buf(),
            files,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

fn is_frame_file(path: &Path) -> bool {
    has_extension(path, FRAME_EXTENSIONS)
}

fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<Frame, SourceError> {
        let Some(path) = self.files.get(self.cursor) else {
            return Err(SourceError::EndOfStream);
        };
        self.cursor += 1;

        let image = image::open(path)
            .map_err(|source| SourceError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        let (width, height) = image.dimensions();
        Ok(Frame::new(image.into_raw(), width, height))
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.cursor = 0;
        Ok(())
    }

    fn label(&self) -> String {
        format!("{} ({} frames)", self.root.display(), self.files.len())
    }
}

/// Opens `spec`, falling back to the first camera when a path cannot be used.
/// Returns the source together with the spec that actually opened.
pub fn open_source(spec: &SourceSpec) -> Result<(Box<dyn FrameSource>, SourceSpec)> {
    match spec {
        SourceSpec::Path(path) => match open_path(path) {
            Ok(source) => {
                log::info!("playing {}", source.label());
                Ok((source, spec.clone()))
            }
            Err(err) => {
                log::warn!("{err}; switching to camera 0");
                let fallback = SourceSpec::Camera(0);
                Ok((open_camera(0)?, fallback))
            }
        },
        SourceSpec::Camera(index) => Ok((open_camera(*index)?, spec.clone())),
    }
}

/// Video files go to the decoder, anything else is read as still frames.
fn open_path(path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    if is_video_file(path) {
        return open_video(path);
    }
    Ok(Box::new(ImageSequenceSource::open(path)?))
}

#[cfg(feature = "video-opencv")]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    Ok(Box::new(super::video::VideoFileSource::open(path)?))
}

#[cfg(not(feature = "video-opencv"))]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    Err(SourceError::VideoDisabled(path.to_path_buf()))
}

#[cfg(feature = "camera-nokhwa")]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    let camera = super::camera::CameraSource::open(index)
        .map_err(|err| err.context(format!("failed to open camera {index}")))?;
    Ok(Box::new(camera))
}

#[cfg(not(feature = "camera-nokhwa"))]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    Err(anyhow::anyhow!(
        "camera {index} requested but camera support is disabled (enable the camera-nokhwa feature)"
    ))
}
