use anyhow::{Result, anyhow};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraIndex, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType,
    },
};

use super::{
    rgb_converter,
    source::{FrameSource, SourceError},
};
use crate::types::Frame;

// Prefer pixel formats that are widely supported on macOS (the built-in cameras
// often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
    FrameFormat::GRAY,
];

fn requested_formats() -> [RequestedFormat<'static>; 3] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: CameraIndex,
    pub label: String,
}

pub fn available_cameras() -> Result<Vec<CameraDevice>> {
    let cameras = query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .map(|info| CameraDevice {
            index: info.index().clone(),
            label: format_camera_label(&info),
        })
        .collect())
}

fn format_camera_label(info: &CameraInfo) -> String {
    info.human_name()
}

fn build_camera(index: CameraIndex) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

/// Live camera read synchronously, one buffer per `read`.
pub struct CameraSource {
    camera: Camera,
    label: String,
}

impl CameraSource {
    pub fn open(index: u32) -> Result<Self> {
        let index = CameraIndex::Index(index);
        let label = available_cameras()
            .unwrap_or_else(|err| {
                log::warn!("camera enumeration failed: {err:?}");
                Vec::new()
            })
            .into_iter()
            .find(|device| device.index == index)
            .map(|device| device.label)
            .unwrap_or_else(|| format!("camera {index}"));

        let camera = build_camera(index)?;
        log::info!("opened {label} ({})", camera.camera_format());

        Ok(Self { camera, label })
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Result<Frame, SourceError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|err| SourceError::Camera(err.into()))?;
        let converted = rgb_converter::convert_camera_frame(&buffer)?;
        Ok(Frame::new(converted.rgb, converted.width, converted.height))
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(err) = self.camera.stop_stream() {
            log::warn!("failed to stop {}: {err:?}", self.label);
        }
    }
}
