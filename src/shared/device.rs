// This is free and unencumbered software released into the public domain.

use crate::shared::{
    CameraError, CameraResult, CaptureRequest, ImageBuffer, OutputTarget, RecorderSink,
};
use std::fmt;
use std::sync::mpsc::SyncSender;

/// Which way a camera points relative to the device user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Front,
    Back,
}

impl Facing {
    pub fn opposite(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Back => write!(f, "back"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An authorization the surrounding OS grants or withholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Camera,
    Microphone,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Microphone => write!(f, "microphone"),
        }
    }
}

/// One physical camera as reported at discovery time. Immutable.
#[derive(Clone, Debug)]
pub struct CameraDescriptor {
    pub id: String,
    pub facing: Facing,
    pub resolutions: Vec<Resolution>,
}

impl CameraDescriptor {
    /// The platform lists resolutions best-first.
    pub fn best_resolution(&self) -> Option<Resolution> {
        self.resolutions.first().copied()
    }
}

/// Result of an asynchronous open, delivered on the platform callback thread.
pub enum DeviceEvent {
    Opened(Box<dyn DeviceHandle>),
    Disconnected,
    Error(CameraError),
}

impl fmt::Debug for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened(handle) => f.debug_tuple("Opened").field(&handle.id()).finish(),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

/// Result of an asynchronous session configuration.
pub enum ConfigureEvent {
    Configured(Box<dyn ActiveSession>),
    ConfigureFailed(String),
}

/// The seam between the session manager and a concrete camera stack.
///
/// Open and configure results arrive through `SyncSender`s rather than
/// direct callbacks so the platform's callback thread never mutates
/// session state; the manager drains them from its own context.
pub trait CameraPlatform: Send {
    /// Enumerate available physical cameras. Pure query, no side effects.
    fn devices(&self) -> CameraResult<Vec<CameraDescriptor>>;

    fn is_authorized(&self, capability: Capability) -> bool;

    /// Begin opening `descriptor`; the outcome is posted to `events`.
    fn open(
        &self,
        descriptor: &CameraDescriptor,
        events: SyncSender<DeviceEvent>,
    ) -> CameraResult<()>;

    /// A fresh, unprepared recorder sink for this platform.
    fn new_recorder(&self) -> Box<dyn RecorderSink>;
}

/// Exclusive handle to an opened device. Invalid after `close`.
pub trait DeviceHandle: Send {
    fn id(&self) -> &str;

    /// Begin building a capture session bound to `targets`; the outcome is
    /// posted to `events`. Completed single-shot JPEG buffers are posted to
    /// `stills` when a `StillCapture` target is present (at most one in
    /// flight).
    fn configure(
        &mut self,
        targets: &[OutputTarget],
        events: SyncSender<ConfigureEvent>,
        stills: SyncSender<ImageBuffer>,
    ) -> CameraResult<()>;

    fn close(&mut self);
}

/// A configured capture session. Valid only while its handle is open;
/// exactly one per handle at a time.
pub trait ActiveSession: Send {
    fn set_repeating(&mut self, request: &CaptureRequest) -> CameraResult<()>;

    fn stop_repeating(&mut self) -> CameraResult<()>;

    /// Submit a one-shot request without disturbing the repeating one.
    fn submit(&mut self, request: &CaptureRequest) -> CameraResult<()>;

    fn close(&mut self);
}

pub fn list_devices(platform: &dyn CameraPlatform) -> CameraResult<Vec<CameraDescriptor>> {
    platform.devices()
}

/// First device matching `facing`, or [`CameraError::NotFound`].
pub fn select_device(
    platform: &dyn CameraPlatform,
    facing: Facing,
) -> CameraResult<CameraDescriptor> {
    platform
        .devices()?
        .into_iter()
        .find(|d| d.facing == facing)
        .ok_or(CameraError::NotFound(facing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::backends::sim::SimPlatform;

    #[test]
    fn selects_by_facing() {
        let platform = SimPlatform::new();
        let back = select_device(&platform, Facing::Back).unwrap();
        assert_eq!(back.facing, Facing::Back);
        let front = select_device(&platform, Facing::Front).unwrap();
        assert_eq!(front.facing, Facing::Front);
        assert_ne!(back.id, front.id);
    }

    #[test]
    fn missing_facing_is_not_found() {
        let platform = SimPlatform::with_devices(vec![CameraDescriptor {
            id: "0".into(),
            facing: Facing::Back,
            resolutions: vec![Resolution::new(1920, 1080)],
        }]);
        let err = select_device(&platform, Facing::Front).unwrap_err();
        assert!(matches!(err, CameraError::NotFound(Facing::Front)));
    }

    #[test]
    fn facing_opposite_round_trips() {
        assert_eq!(Facing::Back.opposite(), Facing::Front);
        assert_eq!(Facing::Front.opposite().opposite(), Facing::Front);
    }
}
