// This is free and unencumbered software released into the public domain.

use crate::shared::Resolution;
use bytes::Bytes;

/// A sink a capture can write into. Resolution is fixed at configuration
/// time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    /// Live preview surface.
    Preview(Resolution),
    /// Single-shot JPEG sink, at most one buffer in flight.
    StillCapture(Resolution),
    /// Encoder-input sink for continuous recording.
    Recording(Resolution),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Preview,
    StillCapture,
    Recording,
}

impl OutputTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Preview(_) => TargetKind::Preview,
            Self::StillCapture(_) => TargetKind::StillCapture,
            Self::Recording(_) => TargetKind::Recording,
        }
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            Self::Preview(r) | Self::StillCapture(r) | Self::Recording(r) => *r,
        }
    }
}

pub fn contains_kind(targets: &[OutputTarget], kind: TargetKind) -> bool {
    targets.iter().any(|t| t.kind() == kind)
}

/// An encoded still delivered by the platform. The consumer must release it
/// after copying, whatever the write outcome;
/// [`ImageSink::persist`](crate::shared::ImageSink::persist) guarantees this.
#[derive(Debug)]
pub struct ImageBuffer {
    data: Bytes,
    released: bool,
}

impl ImageBuffer {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            released: false,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Hand the backing storage back to the platform. Idempotent.
    pub fn release(&mut self) {
        self.data = Bytes::new();
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Resolution;

    #[test]
    fn kind_queries() {
        let res = Resolution::new(1280, 720);
        let targets = [OutputTarget::Preview(res), OutputTarget::StillCapture(res)];
        assert!(contains_kind(&targets, TargetKind::Preview));
        assert!(contains_kind(&targets, TargetKind::StillCapture));
        assert!(!contains_kind(&targets, TargetKind::Recording));
        assert_eq!(targets[1].resolution(), res);
    }

    #[test]
    fn release_clears_data() {
        let mut buf = ImageBuffer::new(Bytes::from_static(b"\xff\xd8\xff\xd9"));
        assert!(!buf.is_released());
        assert_eq!(buf.len(), 4);
        buf.release();
        assert!(buf.is_released());
        assert!(buf.is_empty());
        buf.release(); // idempotent
        assert!(buf.is_released());
    }
}
