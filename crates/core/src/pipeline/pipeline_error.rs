use thiserror::Error;

use crate::annotation::domain::annotator::AnnotationError;
use crate::codec::{DecodeError, EncodeError};
use crate::cropping::cropper::CropError;
use crate::detection::domain::face_detector::DetectionError;
use crate::shared::cancellation::Cancelled;

/// Outcome tag for every failed pipeline or governor call.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not decode image: {0}")]
    Decode(#[from] DecodeError),
    #[error("face detection failed: {0}")]
    Detection(#[from] DetectionError),
    #[error("could not encode image: {0}")]
    Encode(#[from] EncodeError),
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("too many calls in progress, try again later")]
    Busy,
    #[error("call exceeded its time budget")]
    Timeout,
    #[error("pipeline worker stopped without a result")]
    WorkerFailed,
}

impl PipelineError {
    /// True for failures caused by load rather than by the image itself.
    pub fn is_overload(&self) -> bool {
        matches!(self, Self::Busy | Self::Timeout)
    }
}

impl From<Cancelled> for PipelineError {
    fn from(_: Cancelled) -> Self {
        Self::Timeout
    }
}

impl From<AnnotationError> for PipelineError {
    fn from(err: AnnotationError) -> Self {
        match err {
            AnnotationError::Cancelled(c) => c.into(),
            AnnotationError::Image(e) => Self::InvalidImage(e.to_string()),
        }
    }
}

impl From<CropError> for PipelineError {
    fn from(err: CropError) -> Self {
        match err {
            CropError::Cancelled(c) => c.into(),
            CropError::Image(e) => Self::InvalidImage(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::raster::ImageDataError;

    #[test]
    fn test_overload_classification() {
        assert!(PipelineError::Busy.is_overload());
        assert!(PipelineError::Timeout.is_overload());
        assert!(!PipelineError::WorkerFailed.is_overload());
        assert!(!PipelineError::InvalidImage("x".into()).is_overload());
        assert!(!PipelineError::from(DecodeError::Corrupt {
            reason: "bad".into()
        })
        .is_overload());
    }

    #[test]
    fn test_cancellation_becomes_timeout() {
        assert!(matches!(
            PipelineError::from(AnnotationError::Cancelled(Cancelled)),
            PipelineError::Timeout
        ));
        assert!(matches!(
            PipelineError::from(CropError::Cancelled(Cancelled)),
            PipelineError::Timeout
        ));
    }

    #[test]
    fn test_image_errors_become_invalid_image() {
        let err = PipelineError::from(CropError::Image(ImageDataError::ZeroDimension {
            width: 0,
            height: 3,
        }));
        assert!(matches!(err, PipelineError::InvalidImage(_)));
    }

    #[test]
    fn test_detection_error_message_is_kept() {
        let err = PipelineError::from(DetectionError::InternalFailure("model crashed".into()));
        assert_eq!(err.to_string(), "face detection failed: detector failed: model crashed");
    }
}
