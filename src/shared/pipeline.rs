// This is free and unencumbered software released into the public domain.

use crate::shared::TargetKind;

/// Per-mode base settings for a capture request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureTemplate {
    Preview,
    StillCapture,
    Record,
}

/// Device rotation as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// JPEG orientation for a device rotation. The offsets compensate the
/// sensor mounting angle and are a design constant, not configurable.
pub fn jpeg_orientation(rotation: Rotation) -> u16 {
    match rotation {
        Rotation::Deg0 => 90,
        Rotation::Deg90 => 0,
        Rotation::Deg180 => 270,
        Rotation::Deg270 => 180,
    }
}

/// A one-shot or repeating directive: a template, the subset of configured
/// targets to write into, and request-scoped parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureRequest {
    pub template: CaptureTemplate,
    pub targets: Vec<TargetKind>,
    pub jpeg_orientation: Option<u16>,
}

impl CaptureRequest {
    pub fn new(template: CaptureTemplate) -> Self {
        Self {
            template,
            targets: Vec::new(),
            jpeg_orientation: None,
        }
    }

    pub fn with_target(mut self, kind: TargetKind) -> Self {
        if !self.targets.contains(&kind) {
            self.targets.push(kind);
        }
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.jpeg_orientation = Some(jpeg_orientation(rotation));
        self
    }
}

/// Repeating request driving the live preview.
pub fn preview_request() -> CaptureRequest {
    CaptureRequest::new(CaptureTemplate::Preview).with_target(TargetKind::Preview)
}

/// Repeating request feeding preview and recorder simultaneously.
pub fn record_request() -> CaptureRequest {
    CaptureRequest::new(CaptureTemplate::Record)
        .with_target(TargetKind::Preview)
        .with_target(TargetKind::Recording)
}

/// One-shot request against the still-capture sink.
pub fn still_request(rotation: Rotation) -> CaptureRequest {
    CaptureRequest::new(CaptureTemplate::StillCapture)
        .with_target(TargetKind::StillCapture)
        .with_rotation(rotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_table_is_fixed() {
        assert_eq!(jpeg_orientation(Rotation::Deg0), 90);
        assert_eq!(jpeg_orientation(Rotation::Deg90), 0);
        assert_eq!(jpeg_orientation(Rotation::Deg180), 270);
        assert_eq!(jpeg_orientation(Rotation::Deg270), 180);
    }

    #[test]
    fn still_request_carries_orientation() {
        let req = still_request(Rotation::Deg180);
        assert_eq!(req.template, CaptureTemplate::StillCapture);
        assert_eq!(req.targets, vec![TargetKind::StillCapture]);
        assert_eq!(req.jpeg_orientation, Some(270));
    }

    #[test]
    fn record_request_feeds_both_sinks() {
        let req = record_request();
        assert!(req.targets.contains(&TargetKind::Preview));
        assert!(req.targets.contains(&TargetKind::Recording));
        assert_eq!(req.jpeg_orientation, None);
    }

    #[test]
    fn duplicate_targets_collapse() {
        let req = CaptureRequest::new(CaptureTemplate::Preview)
            .with_target(TargetKind::Preview)
            .with_target(TargetKind::Preview);
        assert_eq!(req.targets.len(), 1);
    }
}
