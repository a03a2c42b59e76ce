#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod detector;
pub mod overlay;
#[cfg(feature = "camera-nokhwa")]
pub mod rgb_converter;
pub mod source;
#[cfg(feature = "video-opencv")]
pub mod video;

// Re-exports for convenience
pub use detector::{DetectorHandle, start_detector};
