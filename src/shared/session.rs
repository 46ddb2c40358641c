// This is free and unencumbered software released into the public domain.

use crate::shared::{
    ActiveSession, CameraDescriptor, CameraError, CameraPlatform, CameraResult, Capability,
    ConfigureEvent, DeviceEvent, DeviceHandle, Facing, ImageBuffer, ImageSink, MediaSavedCallback,
    OutputTarget, RecorderSink, RecordingParams, RecordingState, Resolution, Rotation,
    SessionConfig, TargetKind, contains_kind, preview_request, record_request, select_device,
    still_request,
};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, sync_channel};
use tracing::{debug, info, warn};

/// Externally observable lifecycle phase. `Opening` and `Capturing` are
/// spanned by the blocking `open` and `begin_still_capture` calls and are
/// never left behind as resting states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Closed,
    Previewing,
    Recording,
}

/// Everything valid while a device is open with a configured session.
struct Active {
    descriptor: CameraDescriptor,
    handle: Box<dyn DeviceHandle>,
    session: Box<dyn ActiveSession>,
    targets: Vec<OutputTarget>,
    stills: Receiver<ImageBuffer>,
    device_events: Receiver<DeviceEvent>,
}

impl Active {
    /// Session first, then the handle, then the sinks (dropped receivers).
    fn release(mut self) {
        self.session.close();
        self.handle.close();
    }

    fn preview_resolution(&self) -> Resolution {
        self.targets
            .iter()
            .find(|t| t.kind() == TargetKind::Preview)
            .or_else(|| self.targets.first())
            .map(|t| t.resolution())
            .unwrap_or(Resolution::new(1920, 1080))
    }
}

enum SessionState {
    Closed,
    Previewing(Active),
    Recording {
        active: Active,
        recorder: Box<dyn RecorderSink>,
        output: PathBuf,
    },
}

/// Owns the open device handle and the configured capture session, and
/// mediates every transition between preview, still capture, and recording.
///
/// All operations take `&mut self`: transitions are serialized, and platform
/// callbacks only ever reach this type as channel messages drained here.
/// Mode switches fully release the prior session and handle before acquiring
/// the next one, so at most one handle exists at any observation point.
pub struct SessionManager {
    platform: Box<dyn CameraPlatform>,
    config: SessionConfig,
    sink: ImageSink,
    observer: Option<MediaSavedCallback>,
    state: SessionState,
}

impl SessionManager {
    pub fn new(platform: Box<dyn CameraPlatform>, config: SessionConfig) -> Self {
        let sink = ImageSink::new(config.media_dir.clone());
        Self {
            platform,
            config,
            sink,
            observer: None,
            state: SessionState::Closed,
        }
    }

    /// Register the at-most-once-per-capture saved-media observer.
    pub fn with_observer(mut self, observer: MediaSavedCallback) -> Self {
        self.sink = ImageSink::new(self.config.media_dir.clone())
            .with_observer(Arc::clone(&observer));
        self.observer = Some(observer);
        self
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Closed => SessionPhase::Closed,
            SessionState::Previewing(_) => SessionPhase::Previewing,
            SessionState::Recording { .. } => SessionPhase::Recording,
        }
    }

    pub fn facing(&self) -> Facing {
        self.config.facing
    }

    pub fn recording_state(&self) -> RecordingState {
        match &self.state {
            SessionState::Recording { output, .. } => RecordingState::Recording(output.clone()),
            _ => RecordingState::Idle,
        }
    }

    pub fn targets(&self) -> &[OutputTarget] {
        match &self.state {
            SessionState::Closed => &[],
            SessionState::Previewing(a) | SessionState::Recording { active: a, .. } => {
                a.targets.as_slice()
            },
        }
    }

    /// Open the device matching the configured facing and bring up the
    /// default preview configuration ({Preview, StillCapture}).
    ///
    /// Any failure leaves the state `Closed` with the handle released.
    pub fn open(&mut self) -> CameraResult<()> {
        if !matches!(self.state, SessionState::Closed) {
            debug!("open requested while open; releasing current device first");
            self.close();
        }

        if !self.platform.is_authorized(Capability::Camera) {
            return Err(CameraError::PermissionDenied(Capability::Camera));
        }

        let descriptor = select_device(self.platform.as_ref(), self.config.facing)?;
        if self.config.diagnostics {
            debug!(id = %descriptor.id, resolutions = ?descriptor.resolutions, "device selected");
        }
        let resolution = self
            .config
            .resolution
            .or_else(|| descriptor.best_resolution())
            .ok_or_else(|| CameraError::configuration("device reports no output resolutions"))?;

        let (device_tx, device_rx) = sync_channel(2);
        self.platform.open(&descriptor, device_tx)?;
        let handle = match device_rx.recv_timeout(self.config.event_deadline) {
            Ok(DeviceEvent::Opened(handle)) => handle,
            Ok(DeviceEvent::Disconnected) => return Err(CameraError::DeviceUnavailable),
            Ok(DeviceEvent::Error(e)) => return Err(e),
            Err(_) => return Err(CameraError::Timeout("opening camera device")),
        };

        let targets = vec![
            OutputTarget::Preview(resolution),
            OutputTarget::StillCapture(resolution),
        ];
        let active = self.build_session(descriptor, handle, device_rx, targets)?;

        info!(facing = %self.config.facing, id = %active.descriptor.id, "camera opened");
        self.state = SessionState::Previewing(active);
        Ok(())
    }

    /// Tear down the current capture session and build a new one over
    /// `targets`. A matching repeating preview request is issued
    /// automatically when a `Preview` target is present.
    ///
    /// On failure the device is released and the state is `Closed`, never a
    /// half-open handle.
    pub fn configure(&mut self, targets: Vec<OutputTarget>) -> CameraResult<()> {
        let active = match mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Previewing(a) => a,
            other => {
                self.state = other;
                return Err(CameraError::NotConfigured);
            },
        };

        let Active {
            descriptor,
            handle,
            mut session,
            device_events,
            ..
        } = active;
        session.close();

        let active = self.build_session(descriptor, handle, device_events, targets)?;
        self.state = SessionState::Previewing(active);
        Ok(())
    }

    /// Submit a one-shot still capture against the current session, without
    /// disturbing the repeating preview request, and persist the resulting
    /// buffer. Returns the written path; the session stays in preview.
    pub fn begin_still_capture(&mut self, rotation: Rotation) -> CameraResult<PathBuf> {
        let deadline = self.config.event_deadline;
        let active = match &mut self.state {
            SessionState::Previewing(a) => a,
            SessionState::Recording { .. } => {
                warn!("still capture requested while recording");
                return Err(CameraError::NotConfigured);
            },
            SessionState::Closed => return Err(CameraError::NotConfigured),
        };
        if !contains_kind(&active.targets, TargetKind::StillCapture) {
            return Err(CameraError::NotConfigured);
        }

        // A capture that timed out may deliver its buffer late; anything
        // still queued belongs to a cancelled request and must not be
        // mistaken for this one's result.
        while let Ok(mut stale) = active.stills.try_recv() {
            stale.release();
            warn!("released a stale still buffer from a timed-out capture");
        }

        active.session.submit(&still_request(rotation))?;
        let mut buffer = match active.stills.recv_timeout(deadline) {
            Ok(b) => b,
            Err(_) => return Err(CameraError::Timeout("awaiting still capture")),
        };

        let path = self.sink.persist(&mut buffer)?;
        debug!(path = %path.display(), "still capture complete");
        Ok(path)
    }

    /// Start recording into `output`. Requires a recording target in the
    /// current configuration and reconfigures to add one when absent.
    ///
    /// A recorder-preparation failure leaves the session previewing.
    pub fn begin_recording(&mut self, output: impl AsRef<Path>) -> CameraResult<()> {
        let output = output.as_ref().to_path_buf();

        match self.state {
            SessionState::Recording { .. } => {
                warn!("begin_recording while a recording is in progress");
                return Err(CameraError::NotConfigured);
            },
            SessionState::Closed => return Err(CameraError::NotConfigured),
            SessionState::Previewing(_) => {},
        }
        if !self.platform.is_authorized(Capability::Microphone) {
            return Err(CameraError::PermissionDenied(Capability::Microphone));
        }

        // Prepare the recorder first so its failure cannot disturb the
        // session.
        let mut recorder = self.platform.new_recorder();
        recorder.prepare(&output, &RecordingParams::default())?;

        let needs_recording_target = match &self.state {
            SessionState::Previewing(a) => !contains_kind(&a.targets, TargetKind::Recording),
            _ => false,
        };
        if needs_recording_target {
            let mut targets = match &self.state {
                SessionState::Previewing(a) => a.targets.clone(),
                _ => Vec::new(),
            };
            let resolution = targets
                .first()
                .map(|t| t.resolution())
                .unwrap_or(Resolution::new(1920, 1080));
            targets.push(OutputTarget::Recording(resolution));
            self.configure(targets)?;
        }

        let mut active = match mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Previewing(a) => a,
            other => {
                self.state = other;
                return Err(CameraError::NotConfigured);
            },
        };

        // Repeating request over {Preview, Recording}, then the encoder.
        if let Err(e) = active.session.set_repeating(&record_request()) {
            let _ = active.session.set_repeating(&preview_request());
            self.state = SessionState::Previewing(active);
            return Err(e);
        }
        if let Err(e) = recorder.start() {
            let _ = active.session.set_repeating(&preview_request());
            self.state = SessionState::Previewing(active);
            return Err(CameraError::recorder_init(e.to_string()));
        }

        info!(path = %output.display(), "recording started");
        self.state = SessionState::Recording {
            active,
            recorder,
            output,
        };
        Ok(())
    }

    /// Stop the repeating request, finalize the recorder output, and return
    /// to a preview-only configuration. A no-op (logged) when no recording
    /// is in progress.
    pub fn end_recording(&mut self) -> CameraResult<Option<PathBuf>> {
        let (mut active, mut recorder) =
            match mem::replace(&mut self.state, SessionState::Closed) {
                SessionState::Recording {
                    active, recorder, ..
                } => (active, recorder),
                other => {
                    self.state = other;
                    debug!("end_recording while not recording; ignoring");
                    return Ok(None);
                },
            };

        if let Err(e) = active.session.stop_repeating() {
            warn!(error = %e, "stopping repeating request");
        }
        let finalized = recorder.finalize();

        let resolution = active.preview_resolution();
        let Active {
            descriptor,
            handle,
            mut session,
            device_events,
            ..
        } = active;
        session.close();

        match self.build_session(
            descriptor,
            handle,
            device_events,
            vec![OutputTarget::Preview(resolution)],
        ) {
            Ok(a) => self.state = SessionState::Previewing(a),
            // Closed is the stable fallback; the recording itself is intact.
            Err(e) => warn!(error = %e, "restoring preview after recording failed"),
        }

        let path = finalized?;
        info!(path = %path.display(), "recording finalized");
        if let Some(cb) = &self.observer {
            cb(&path);
        }
        Ok(Some(path))
    }

    /// Release everything and reopen with the opposite facing direction.
    /// The prior handle is fully closed before the next one is requested.
    pub fn switch_facing(&mut self) -> CameraResult<()> {
        let was_open = !matches!(self.state, SessionState::Closed);
        self.close();
        self.config.facing = self.config.facing.opposite();
        info!(facing = %self.config.facing, "switching camera");
        if was_open { self.open() } else { Ok(()) }
    }

    /// Release the capture session, then the device handle, then the output
    /// sinks. Idempotent; an in-progress recording is finalized first.
    pub fn close(&mut self) {
        match mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Closed => {},
            SessionState::Previewing(active) => {
                active.release();
                debug!("camera closed");
            },
            SessionState::Recording {
                mut active,
                mut recorder,
                ..
            } => {
                if let Err(e) = active.session.stop_repeating() {
                    warn!(error = %e, "stopping repeating request");
                }
                match recorder.finalize() {
                    Ok(path) => {
                        info!(path = %path.display(), "recording finalized on close");
                        if let Some(cb) = &self.observer {
                            cb(&path);
                        }
                    },
                    Err(e) => warn!(error = %e, "finalizing recording on close"),
                }
                active.release();
                debug!("camera closed");
            },
        }
    }

    /// Configure a session over `targets` against `handle`, waiting (bounded)
    /// for the platform's configure callback. On any failure the handle is
    /// closed before returning.
    fn build_session(
        &mut self,
        descriptor: CameraDescriptor,
        mut handle: Box<dyn DeviceHandle>,
        device_events: Receiver<DeviceEvent>,
        targets: Vec<OutputTarget>,
    ) -> CameraResult<Active> {
        if targets.is_empty() {
            handle.close();
            return Err(CameraError::configuration("at least one output target is required"));
        }

        let (configure_tx, configure_rx) = sync_channel(1);
        let (still_tx, still_rx) = sync_channel(1); // max one still in flight
        if let Err(e) = handle.configure(&targets, configure_tx, still_tx) {
            handle.close();
            return Err(e);
        }

        let session = match configure_rx.recv_timeout(self.config.event_deadline) {
            Ok(ConfigureEvent::Configured(s)) => s,
            Ok(ConfigureEvent::ConfigureFailed(msg)) => {
                handle.close();
                return Err(CameraError::ConfigurationFailed(msg));
            },
            Err(_) => {
                handle.close();
                return Err(CameraError::Timeout("configuring capture session"));
            },
        };

        let mut active = Active {
            descriptor,
            handle,
            session,
            targets,
            stills: still_rx,
            device_events,
        };
        if self.config.diagnostics {
            debug!(targets = ?active.targets, "capture session configured");
        }

        if contains_kind(&active.targets, TargetKind::Preview) {
            if let Err(e) = active.session.set_repeating(&preview_request()) {
                active.release();
                return Err(e);
            }
            debug!("repeating preview request issued");
        }

        Ok(active)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::backends::sim::{self, SimPlatform};

    fn manager(platform: SimPlatform) -> SessionManager {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(Facing::Back).with_media_dir(dir.keep());
        SessionManager::new(Box::new(platform), config)
    }

    #[test]
    fn operations_before_open_are_rejected() {
        let mut mgr = manager(SimPlatform::new());
        assert!(matches!(
            mgr.configure(vec![OutputTarget::Preview(Resolution::new(640, 480))]),
            Err(CameraError::NotConfigured)
        ));
        assert!(matches!(
            mgr.begin_still_capture(Rotation::Deg0),
            Err(CameraError::NotConfigured)
        ));
        assert!(matches!(
            mgr.begin_recording("clip.mp4"),
            Err(CameraError::NotConfigured)
        ));
        assert_eq!(mgr.phase(), SessionPhase::Closed);
    }

    #[test]
    fn open_without_camera_permission_is_denied() {
        let platform = SimPlatform::new();
        platform.set_authorized(Capability::Camera, false);
        let mut mgr = manager(platform);
        assert!(matches!(
            mgr.open(),
            Err(CameraError::PermissionDenied(Capability::Camera))
        ));
        assert_eq!(mgr.phase(), SessionPhase::Closed);
    }

    #[test]
    fn busy_device_reports_unavailable() {
        let platform = SimPlatform::new();
        platform.set_busy(true);
        let mut mgr = manager(platform);
        assert!(matches!(mgr.open(), Err(CameraError::DeviceUnavailable)));
        assert_eq!(mgr.phase(), SessionPhase::Closed);
    }

    #[test]
    fn rejected_configuration_releases_the_device() {
        let platform = SimPlatform::new();
        let probe = platform.clone();
        platform.set_reject_configure(true);
        let mut mgr = manager(platform);
        assert!(matches!(
            mgr.open(),
            Err(CameraError::ConfigurationFailed(_))
        ));
        assert_eq!(mgr.phase(), SessionPhase::Closed);
        assert_eq!(probe.open_handles(), 0);
    }

    #[test]
    fn unresponsive_platform_times_out() {
        let platform = SimPlatform::new();
        platform.set_silent(true);
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(Facing::Back)
            .with_media_dir(dir.keep())
            .with_event_deadline(std::time::Duration::from_millis(50));
        let mut mgr = SessionManager::new(Box::new(platform), config);
        assert!(matches!(mgr.open(), Err(CameraError::Timeout(_))));
        assert_eq!(mgr.phase(), SessionPhase::Closed);
    }

    #[test]
    fn late_buffer_from_timed_out_capture_is_discarded() {
        let platform = SimPlatform::new();
        let probe = platform.clone();
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(Facing::Back)
            .with_media_dir(dir.keep())
            .with_event_deadline(std::time::Duration::from_millis(150));
        let mut mgr = SessionManager::new(Box::new(platform), config);
        mgr.open().unwrap();

        probe.set_still_delay(std::time::Duration::from_millis(400));
        let err = mgr.begin_still_capture(Rotation::Deg0).unwrap_err();
        assert!(matches!(err, CameraError::Timeout(_)));
        assert_eq!(mgr.phase(), SessionPhase::Previewing);

        // Let the delayed buffer land in the stills channel.
        std::thread::sleep(std::time::Duration::from_millis(500));

        probe.set_still_delay(std::time::Duration::ZERO);
        let path = mgr.begin_still_capture(Rotation::Deg180).unwrap();
        let data = std::fs::read(&path).unwrap();
        // Deg180 maps to JPEG orientation 270; the leftover Deg0 buffer
        // would have carried 90.
        assert_eq!(sim::stub_orientation(&data), Some(270));
    }

    #[test]
    fn recording_while_recording_is_rejected_without_side_effects() {
        let mut mgr = manager(SimPlatform::new());
        mgr.open().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        mgr.begin_recording(&clip).unwrap();

        let err = mgr.begin_recording(dir.path().join("other.mp4")).unwrap_err();
        assert!(matches!(err, CameraError::NotConfigured));
        assert_eq!(mgr.recording_state(), RecordingState::Recording(clip.clone()));

        let path = mgr.end_recording().unwrap().unwrap();
        assert_eq!(path, clip);
        assert_eq!(mgr.recording_state(), RecordingState::Idle);
    }

    #[test]
    fn end_recording_while_idle_is_a_noop() {
        let mut mgr = manager(SimPlatform::new());
        mgr.open().unwrap();
        assert!(mgr.end_recording().unwrap().is_none());
        assert_eq!(mgr.phase(), SessionPhase::Previewing);
    }

    #[test]
    fn recording_requires_microphone() {
        let platform = SimPlatform::new();
        platform.set_authorized(Capability::Microphone, false);
        let mut mgr = manager(platform);
        mgr.open().unwrap();
        assert!(matches!(
            mgr.begin_recording("clip.mp4"),
            Err(CameraError::PermissionDenied(Capability::Microphone))
        ));
        assert_eq!(mgr.phase(), SessionPhase::Previewing);
    }

    #[test]
    fn failed_recorder_prepare_leaves_preview() {
        let platform = SimPlatform::new();
        platform.set_recorder_failing(true);
        let mut mgr = manager(platform);
        mgr.open().unwrap();
        assert!(matches!(
            mgr.begin_recording("clip.mp4"),
            Err(CameraError::RecorderInitFailed(_))
        ));
        assert_eq!(mgr.phase(), SessionPhase::Previewing);
        assert_eq!(mgr.recording_state(), RecordingState::Idle);
    }
}
