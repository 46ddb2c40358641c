// This is free and unencumbered software released into the public domain.

use crate::shared::{Facing, Resolution};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for a [`SessionManager`](crate::shared::SessionManager).
///
/// The event deadline bounds every wait on a platform callback (open,
/// configure, still-capture completion); an expired deadline surfaces as
/// [`CameraError::Timeout`](crate::shared::CameraError::Timeout).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub facing: Facing,
    pub resolution: Option<Resolution>,
    pub media_dir: PathBuf,
    pub event_deadline: Duration,
    /// Log debug-level detail about device selection and session
    /// configuration.
    pub diagnostics: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            facing: Facing::Back,
            resolution: None,
            media_dir: std::env::temp_dir(),
            event_deadline: Duration::from_secs(2),
            diagnostics: false,
        }
    }
}

impl SessionConfig {
    pub fn new(facing: Facing) -> Self {
        Self {
            facing,
            ..Default::default()
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dir = dir.into();
        self
    }

    pub fn with_event_deadline(mut self, deadline: Duration) -> Self {
        self.event_deadline = deadline;
        self
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trips() {
        let config = SessionConfig::new(Facing::Front)
            .with_resolution(Resolution::new(1280, 720))
            .with_media_dir("/tmp/media")
            .with_event_deadline(Duration::from_millis(750))
            .with_diagnostics(true);

        assert_eq!(config.facing, Facing::Front);
        assert_eq!(config.resolution, Some(Resolution::new(1280, 720)));
        assert_eq!(config.media_dir, PathBuf::from("/tmp/media"));
        assert_eq!(config.event_deadline, Duration::from_millis(750));
        assert!(config.diagnostics);
    }
}
