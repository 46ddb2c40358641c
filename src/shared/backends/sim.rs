// This is free and unencumbered software released into the public domain.

//! Software-simulated camera platform.
//!
//! Delivers open/configure results and still buffers from a spawned thread,
//! the way a real platform posts callbacks, so the session manager's
//! channel-draining paths are exercised for real. Fault injection covers the
//! failure modes the manager must survive: busy devices, rejected target
//! combinations, unusable recorders, and a platform that never calls back.

use crate::shared::{
    ActiveSession, CameraDescriptor, CameraError, CameraPlatform, CameraResult, Capability,
    CaptureRequest, ConfigureEvent, DeviceEvent, DeviceHandle, Facing, ImageBuffer, OutputTarget,
    RecorderSink, RecordingParams, Resolution, TargetKind,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const JFIF_HEADER: &[u8] = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00\x01\x01\x00\x00\x01\x00\x01\x00\x00";
const MP4_STUB: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom";

/// Stub JPEG payload with the request's JPEG orientation encoded in the two
/// bytes before the EOI marker, so tests can tell which request a buffer
/// answered.
pub fn stub_jpeg(orientation: u16) -> Bytes {
    let mut data = Vec::with_capacity(JFIF_HEADER.len() + 4);
    data.extend_from_slice(JFIF_HEADER);
    data.extend_from_slice(&orientation.to_be_bytes());
    data.extend_from_slice(b"\xff\xd9");
    Bytes::from(data)
}

/// The orientation [`stub_jpeg`] encoded, if `jpeg` looks like one.
pub fn stub_orientation(jpeg: &[u8]) -> Option<u16> {
    if jpeg.len() < 6 || !jpeg.starts_with(b"\xff\xd8") || !jpeg.ends_with(b"\xff\xd9") {
        return None;
    }
    let n = jpeg.len();
    Some(u16::from_be_bytes([jpeg[n - 4], jpeg[n - 3]]))
}

struct Shared {
    devices: Vec<CameraDescriptor>,
    camera_granted: AtomicBool,
    microphone_granted: AtomicBool,
    busy: AtomicBool,
    reject_configure: AtomicBool,
    fail_recorder: AtomicBool,
    silent: AtomicBool,
    still_delay_ms: AtomicU64,
    open_count: AtomicUsize,
}

#[derive(Clone)]
pub struct SimPlatform {
    shared: Arc<Shared>,
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPlatform {
    /// One back and one front camera, 1080p-first.
    pub fn new() -> Self {
        Self::with_devices(vec![
            CameraDescriptor {
                id: "0".into(),
                facing: Facing::Back,
                resolutions: vec![Resolution::new(1920, 1080), Resolution::new(1280, 720)],
            },
            CameraDescriptor {
                id: "1".into(),
                facing: Facing::Front,
                resolutions: vec![Resolution::new(1280, 720)],
            },
        ])
    }

    pub fn with_devices(devices: Vec<CameraDescriptor>) -> Self {
        Self {
            shared: Arc::new(Shared {
                devices,
                camera_granted: AtomicBool::new(true),
                microphone_granted: AtomicBool::new(true),
                busy: AtomicBool::new(false),
                reject_configure: AtomicBool::new(false),
                fail_recorder: AtomicBool::new(false),
                silent: AtomicBool::new(false),
                still_delay_ms: AtomicU64::new(0),
                open_count: AtomicUsize::new(0),
            }),
        }
    }

    pub fn set_authorized(&self, capability: Capability, granted: bool) {
        let flag = match capability {
            Capability::Camera => &self.shared.camera_granted,
            Capability::Microphone => &self.shared.microphone_granted,
        };
        flag.store(granted, Ordering::Relaxed);
    }

    /// Pretend another owner holds every device.
    pub fn set_busy(&self, busy: bool) {
        self.shared.busy.store(busy, Ordering::Relaxed);
    }

    /// Reject every target combination at configure time.
    pub fn set_reject_configure(&self, reject: bool) {
        self.shared.reject_configure.store(reject, Ordering::Relaxed);
    }

    /// Make recorder preparation fail (encoder unavailable).
    pub fn set_recorder_failing(&self, failing: bool) {
        self.shared.fail_recorder.store(failing, Ordering::Relaxed);
    }

    /// Swallow all callbacks, forcing deadline expiry in the caller.
    pub fn set_silent(&self, silent: bool) {
        self.shared.silent.store(silent, Ordering::Relaxed);
    }

    /// Hold still buffers back for `delay` before delivering them, so a
    /// capture can outlive its caller's deadline.
    pub fn set_still_delay(&self, delay: Duration) {
        self.shared
            .still_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Live open handles across the whole platform.
    pub fn open_handles(&self) -> usize {
        self.shared.open_count.load(Ordering::SeqCst)
    }
}

impl CameraPlatform for SimPlatform {
    fn devices(&self) -> CameraResult<Vec<CameraDescriptor>> {
        Ok(self.shared.devices.clone())
    }

    fn is_authorized(&self, capability: Capability) -> bool {
        match capability {
            Capability::Camera => self.shared.camera_granted.load(Ordering::Relaxed),
            Capability::Microphone => self.shared.microphone_granted.load(Ordering::Relaxed),
        }
    }

    fn open(
        &self,
        descriptor: &CameraDescriptor,
        events: SyncSender<DeviceEvent>,
    ) -> CameraResult<()> {
        let shared = Arc::clone(&self.shared);
        let id = descriptor.id.clone();

        std::thread::spawn(move || {
            if shared.silent.load(Ordering::Relaxed) {
                return;
            }
            if shared.busy.load(Ordering::Relaxed) {
                let _ = events.send(DeviceEvent::Error(CameraError::DeviceUnavailable));
                return;
            }

            shared.open_count.fetch_add(1, Ordering::SeqCst);
            debug!(%id, "sim device opened");
            let handle = SimHandle {
                id,
                shared,
                open: true,
            };
            let _ = events.send(DeviceEvent::Opened(Box::new(handle)));
        });

        Ok(())
    }

    fn new_recorder(&self) -> Box<dyn RecorderSink> {
        Box::new(SimRecorder {
            shared: Arc::clone(&self.shared),
            output: None,
            started: false,
        })
    }
}

struct SimHandle {
    id: String,
    shared: Arc<Shared>,
    open: bool,
}

impl DeviceHandle for SimHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn configure(
        &mut self,
        targets: &[OutputTarget],
        events: SyncSender<ConfigureEvent>,
        stills: SyncSender<ImageBuffer>,
    ) -> CameraResult<()> {
        if !self.open {
            return Err(CameraError::NotConfigured);
        }

        let shared = Arc::clone(&self.shared);
        let has_still = targets.iter().any(|t| t.kind() == TargetKind::StillCapture);

        std::thread::spawn(move || {
            if shared.silent.load(Ordering::Relaxed) {
                return;
            }
            if shared.reject_configure.load(Ordering::Relaxed) {
                let _ = events.send(ConfigureEvent::ConfigureFailed(
                    "unsupported output target combination".into(),
                ));
                return;
            }

            let session = SimSession {
                shared,
                stills: has_still.then_some(stills),
                repeating: None,
                closed: false,
            };
            let _ = events.send(ConfigureEvent::Configured(Box::new(session)));
        });

        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.shared.open_count.fetch_sub(1, Ordering::SeqCst);
            debug!(id = %self.id, "sim device closed");
        }
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.close();
    }
}

struct SimSession {
    shared: Arc<Shared>,
    stills: Option<SyncSender<ImageBuffer>>,
    repeating: Option<CaptureRequest>,
    closed: bool,
}

impl ActiveSession for SimSession {
    fn set_repeating(&mut self, request: &CaptureRequest) -> CameraResult<()> {
        if self.closed {
            return Err(CameraError::NotConfigured);
        }
        self.repeating = Some(request.clone());
        Ok(())
    }

    fn stop_repeating(&mut self) -> CameraResult<()> {
        if self.repeating.take().is_some() {
            debug!("sim repeating request stopped");
        }
        Ok(())
    }

    fn submit(&mut self, request: &CaptureRequest) -> CameraResult<()> {
        if self.closed {
            return Err(CameraError::NotConfigured);
        }
        if !request.targets.contains(&TargetKind::StillCapture) {
            return Ok(());
        }

        let stills = self.stills.clone().ok_or(CameraError::NotConfigured)?;
        let shared = Arc::clone(&self.shared);
        let orientation = request.jpeg_orientation.unwrap_or(0);
        let delay = shared.still_delay_ms.load(Ordering::Relaxed);

        // Completed buffer arrives from the callback thread.
        std::thread::spawn(move || {
            if shared.silent.load(Ordering::Relaxed) {
                return;
            }
            if delay > 0 {
                std::thread::sleep(Duration::from_millis(delay));
            }
            let _ = stills.send(ImageBuffer::new(stub_jpeg(orientation)));
        });

        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        self.repeating = None;
    }
}

struct SimRecorder {
    shared: Arc<Shared>,
    output: Option<PathBuf>,
    started: bool,
}

impl RecorderSink for SimRecorder {
    fn prepare(&mut self, path: &Path, params: &RecordingParams) -> CameraResult<()> {
        if self.shared.fail_recorder.load(Ordering::Relaxed) {
            return Err(CameraError::recorder_init("encoder unavailable"));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(CameraError::recorder_init(format!(
                    "output directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        debug!(path = %path.display(), bitrate = params.video_bitrate, "sim recorder prepared");
        self.output = Some(path.to_path_buf());
        self.started = false;
        Ok(())
    }

    fn start(&mut self) -> CameraResult<()> {
        if self.output.is_none() {
            return Err(CameraError::recorder_init("recorder not prepared"));
        }
        self.started = true;
        Ok(())
    }

    fn finalize(&mut self) -> CameraResult<PathBuf> {
        let path = self
            .output
            .take()
            .ok_or_else(|| CameraError::recorder_init("recorder not prepared"))?;
        if !self.started {
            debug!("finalizing a recorder that was never started");
        }
        self.started = false;
        std::fs::write(&path, MP4_STUB).map_err(|e| CameraError::storage(&path, e))?;
        debug!(path = %path.display(), "sim recording finalized");
        Ok(path)
    }
}
