use thiserror::Error;

use crate::shared::raster::Image;

use super::detection_result::DetectionResult;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("detector could not read the image: {0}")]
    Unreadable(String),
    #[error("detection timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
    #[error("detector failed: {0}")]
    InternalFailure(String),
}

/// Domain interface for face detection.
///
/// One instance serves every concurrent pipeline call, hence `&self` and
/// `Sync`. Implementations must return regions that already passed the
/// confidence threshold and lie inside the image, in an order that is
/// reproducible for identical input.
pub trait FaceDetector: Send + Sync {
    fn detect<'a>(&self, image: &'a Image) -> Result<DetectionResult<'a>, DetectionError>;
}
