use thiserror::Error;

use crate::detection::domain::face_region::FaceRegion;
use crate::shared::cancellation::{CancellationToken, Cancelled};
use crate::shared::raster::{Image, ImageDataError};

use super::annotation_style::AnnotationStyle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("annotated image is invalid: {0}")]
    Image(#[from] ImageDataError),
}

/// Domain interface for drawing region overlays.
///
/// Implementations return a new image and never touch `image`. The token is
/// polled before each region.
pub trait Annotator: Send + Sync {
    fn draw(
        &self,
        image: &Image,
        regions: &[FaceRegion],
        style: &AnnotationStyle,
        cancel: &CancellationToken,
    ) -> Result<Image, AnnotationError>;
}
