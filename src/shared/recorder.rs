// This is free and unencumbered software released into the public domain.

use crate::shared::CameraResult;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCodec {
    Aac,
}

/// Fixed recording parameters. Not user-configurable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordingParams {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub video_bitrate: u32,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
}

impl Default for RecordingParams {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 30,
            video_bitrate: 10_000_000,
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
        }
    }
}

/// Whether a recording is in progress. Transitions only through the
/// session manager; the output file is finalized before the return to
/// `Idle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording(PathBuf),
}

impl RecordingState {
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording(_))
    }
}

/// External encoder sink fed by a `Recording` output target.
pub trait RecorderSink: Send {
    /// Bind the sink to `path` and the encoder settings. Fails with
    /// [`CameraError::RecorderInitFailed`](crate::shared::CameraError::RecorderInitFailed)
    /// when the path is unusable or the encoder cannot be acquired.
    fn prepare(&mut self, path: &Path, params: &RecordingParams) -> CameraResult<()>;

    fn start(&mut self) -> CameraResult<()>;

    /// Flush and close the output file, returning its path.
    fn finalize(&mut self) -> CameraResult<PathBuf>;
}
