//! Frame sources.
//!
//! A [`CameraSource`] samples a capture device at a fixed cadence while it is
//! active. A [`StillImage`] wraps a single uploaded image.
use std::{io, path::Path, time::Duration, time::Instant};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::decoder::DecodeError;

/// Default time between two camera frames.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// User agent fragments identifying mobile devices.
const MOBILE_USER_AGENTS: [&str; 4] = ["iphone", "android", "ipad", "ipod"];

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("permission to use the capture device was denied")]
    PermissionDenied,

    #[error("no capture device available")]
    NoDevice,

    #[error("capture stream ended")]
    StreamEnded,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Raw RGBA image captured from a source.
///
/// A frame belongs to exactly one decode cycle and is consumed by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    captured_at: Instant,
}

impl Frame {
    /// Creates a frame from RGBA pixels, captured now.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self::captured_at(pixels, width, height, Instant::now())
    }

    pub fn captured_at(pixels: Vec<u8>, width: u32, height: u32, captured_at: Instant) -> Self {
        Self {
            pixels,
            width,
            height,
            captured_at,
        }
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn timestamp(&self) -> Instant {
        self.captured_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let user_agent = user_agent.to_ascii_lowercase();
        if MOBILE_USER_AGENTS.iter().any(|m| user_agent.contains(m)) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacingMode {
    /// Rear camera.
    Environment,

    /// Front camera.
    User,
}

/// Video constraints passed to the capture device.
///
/// `facing_mode` is an exact requirement: a device that cannot honor it must
/// fail acquisition rather than fall back to another camera.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConstraints {
    pub facing_mode: Option<FacingMode>,
}

impl CaptureConstraints {
    pub fn for_device(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Mobile => Self {
                facing_mode: Some(FacingMode::Environment),
            },
            DeviceClass::Desktop => Self::default(),
        }
    }

    pub fn for_user_agent(user_agent: &str) -> Self {
        Self::for_device(DeviceClass::from_user_agent(user_agent))
    }
}

/// Camera or other live capture collaborator.
pub trait CaptureDevice {
    /// Opens a stream honoring `constraints`.
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<(), AcquisitionError>;

    /// Grabs the current image of an acquired stream.
    fn capture(&mut self) -> Result<Frame, AcquisitionError>;

    /// Stops every track of the stream. Must be a no-op when nothing is
    /// acquired.
    fn release(&mut self);
}

/// Source of frames for a continuous scan.
pub trait FrameSource {
    /// Acquires the underlying resource. Starting an active source does
    /// nothing.
    fn start(&mut self) -> Result<(), AcquisitionError>;

    /// Captures one frame.
    fn next_frame(&mut self) -> Result<Frame, AcquisitionError>;

    /// Releases the underlying resource. Idempotent.
    fn stop(&mut self);

    fn is_active(&self) -> bool;

    /// Time between two frames.
    fn interval(&self) -> Duration;
}

/// Frame source sampling a capture device.
///
/// The device is released when the source is stopped or dropped.
pub struct CameraSource<D: CaptureDevice> {
    device: D,
    constraints: CaptureConstraints,
    interval: Duration,
    active: bool,
}

impl<D: CaptureDevice> CameraSource<D> {
    pub fn new(device: D, constraints: CaptureConstraints) -> Self {
        Self {
            device,
            constraints,
            interval: DEFAULT_FRAME_INTERVAL,
            active: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn constraints(&self) -> &CaptureConstraints {
        &self.constraints
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: CaptureDevice> FrameSource for CameraSource<D> {
    fn start(&mut self) -> Result<(), AcquisitionError> {
        if self.active {
            return Ok(());
        }

        if let Err(e) = self.device.acquire(&self.constraints) {
            tracing::error!(error = %e, "cannot acquire capture device");
            // Partially opened streams are closed too.
            self.device.release();
            return Err(e);
        }

        tracing::debug!(constraints = ?self.constraints, "capture device acquired");
        self.active = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, AcquisitionError> {
        if !self.active {
            return Err(AcquisitionError::StreamEnded);
        }

        self.device.capture()
    }

    fn stop(&mut self) {
        if self.active {
            self.device.release();
            self.active = false;
            tracing::debug!("capture device released");
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

impl<D: CaptureDevice> Drop for CameraSource<D> {
    fn drop(&mut self) {
        self.stop()
    }
}

/// Single uploaded image.
#[derive(Debug, Clone)]
pub struct StillImage {
    frame: Frame,
}

impl StillImage {
    /// Decodes an encoded image (PNG, JPEG, ...).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_frame(Frame::from_rgba(image.to_rgba8())))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let image = image::open(path)?;
        Ok(Self::from_frame(Frame::from_rgba(image.to_rgba8())))
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageOutputFormat};

    use super::*;

    #[derive(Default)]
    struct Device {
        fail: bool,
        acquired: bool,
        releases: usize,
    }

    impl CaptureDevice for Device {
        fn acquire(&mut self, _: &CaptureConstraints) -> Result<(), AcquisitionError> {
            if self.fail {
                Err(AcquisitionError::PermissionDenied)
            } else {
                self.acquired = true;
                Ok(())
            }
        }

        fn capture(&mut self) -> Result<Frame, AcquisitionError> {
            Ok(Frame::new(vec![0; 4], 1, 1))
        }

        fn release(&mut self) {
            self.acquired = false;
            self.releases += 1;
        }
    }

    #[test]
    fn mobile_user_agents_request_the_rear_camera() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
        let android = "Mozilla/5.0 (Linux; Android 14; Pixel 8)";
        let desktop = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";

        assert_eq!(DeviceClass::from_user_agent(iphone), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_user_agent(android), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_user_agent(desktop), DeviceClass::Desktop);

        assert_eq!(
            CaptureConstraints::for_user_agent(iphone).facing_mode,
            Some(FacingMode::Environment)
        );
        assert_eq!(CaptureConstraints::for_user_agent(desktop).facing_mode, None);
    }

    #[test]
    fn failed_start_produces_no_frames() {
        let device = Device {
            fail: true,
            ..Device::default()
        };
        let mut source = CameraSource::new(device, CaptureConstraints::default());

        assert!(matches!(
            source.start(),
            Err(AcquisitionError::PermissionDenied)
        ));
        assert!(!source.is_active());
        assert!(matches!(
            source.next_frame(),
            Err(AcquisitionError::StreamEnded)
        ));
        assert_eq!(source.device().releases, 1);

        source.stop();
        assert_eq!(source.device().releases, 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut source = CameraSource::new(Device::default(), CaptureConstraints::default());
        source.stop();
        assert_eq!(source.device().releases, 0);

        source.start().unwrap();
        assert!(source.device().acquired);
        assert_eq!(source.next_frame().unwrap().width(), 1);

        source.stop();
        source.stop();
        assert!(!source.device().acquired);
        assert_eq!(source.device().releases, 1);
    }

    #[test]
    fn still_image_from_png() {
        let image = RgbaImage::from_pixel(5, 3, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();

        let still = StillImage::from_bytes(&bytes).unwrap();
        assert_eq!((still.frame().width(), still.frame().height()), (5, 3));
        assert_eq!(&still.into_frame().into_pixels()[..4], [255, 0, 0, 255]);

        assert!(matches!(
            StillImage::from_bytes(b"not an image"),
            Err(DecodeError::Image(_))
        ));
    }
}
