// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraError, CameraResult, ImageBuffer};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Observer notified with the resulting file path, at most once per
/// persisted still or finalized recording.
pub type MediaSavedCallback = Arc<dyn Fn(&Path) + Send + Sync + 'static>;

/// Length of the hex prefix used for still file names.
pub const KEY_LEN: usize = 12;

static CAPTURE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A collision-resistant file stem: SHA-256 over the current timestamp and
/// a process-local sequence number, hex-encoded, truncated to [`KEY_LEN`].
/// The sequence number keeps two captures within the same millisecond
/// distinct.
pub fn unique_key() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = CAPTURE_SEQ.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(millis.to_string().as_bytes());
    hasher.update(seq.to_le_bytes());
    let digest = hasher.finalize();

    let mut hex = format!("{digest:x}");
    hex.truncate(KEY_LEN);
    hex
}

/// Drains completed still buffers into the media directory.
pub struct ImageSink {
    dir: PathBuf,
    on_saved: Option<MediaSavedCallback>,
}

impl ImageSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            on_saved: None,
        }
    }

    pub fn with_observer(mut self, observer: MediaSavedCallback) -> Self {
        self.on_saved = Some(observer);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the encoded JPEG to `<dir>/<12-hex>.jpg`. The source buffer is
    /// released after copying regardless of the write outcome.
    pub fn persist(&self, buffer: &mut ImageBuffer) -> CameraResult<PathBuf> {
        let buffer = scopeguard::guard(buffer, |b| b.release());

        let path = self.dir.join(format!("{}.jpg", unique_key()));
        fs::write(&path, buffer.data()).map_err(|e| {
            warn!(path = %path.display(), error = %e, "still write failed");
            CameraError::storage(&path, e)
        })?;

        debug!(path = %path.display(), bytes = buffer.len(), "still persisted");
        if let Some(cb) = &self.on_saved {
            cb(&path);
        }
        Ok(path)
    }
}
