// This is free and unencumbered software released into the public domain.

use crate::shared::{Capability, Facing};
use std::error::Error as StdError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type CameraResult<T> = Result<T, CameraError>;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("missing {0} authorization")]
    PermissionDenied(Capability),

    #[error("camera device is held by another owner")]
    DeviceUnavailable,

    #[error("no camera device facing {0}")]
    NotFound(Facing),

    #[error("camera session is not configured for this operation")]
    NotConfigured,

    #[error("capture session configuration rejected: {0}")]
    ConfigurationFailed(String),

    #[error("recorder sink could not be prepared: {0}")]
    RecorderInitFailed(String),

    #[error("failed to write {}", path.display())]
    StorageError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("timed out while {0}")]
    Timeout(&'static str),

    #[error("device error while {context}")]
    DeviceError {
        context: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl CameraError {
    #[inline]
    pub fn device(context: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::DeviceError {
            context,
            source: Box::new(source),
        }
    }

    #[inline]
    pub fn storage(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::StorageError {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    #[inline]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationFailed(msg.into())
    }

    #[inline]
    pub fn recorder_init(msg: impl Into<String>) -> Self {
        Self::RecorderInitFailed(msg.into())
    }
}
