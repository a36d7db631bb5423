use ndarray::s;
use thiserror::Error;

use crate::shared::cancellation::{CancellationToken, Cancelled};
use crate::shared::geometry::{self, Rect};
use crate::shared::raster::{Image, ImageDataError, SourceFormat};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CropError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("cropped image is invalid: {0}")]
    Image(#[from] ImageDataError),
}

/// Pixels of one requested region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CroppedImage {
    pub image: Image,
    /// Position of the originating rectangle in the request.
    pub region_index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CropOutcome {
    pub crops: Vec<CroppedImage>,
    /// Requested rectangles that had no overlap with the image.
    pub skipped: usize,
}

/// Extracts rectangular sub-images.
///
/// Each rectangle is clipped to the image first. Rectangles that clip to
/// nothing are skipped and counted; the rest of the request still runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cropper;

impl Cropper {
    pub fn new() -> Self {
        Self
    }

    pub fn crop(
        &self,
        image: &Image,
        rects: &[Rect],
        cancel: &CancellationToken,
    ) -> Result<CropOutcome, CropError> {
        let mut outcome = CropOutcome::default();
        for (region_index, rect) in rects.iter().enumerate() {
            cancel.check()?;
            match geometry::clip(rect, image.bounds()) {
                Ok(clipped) => outcome.crops.push(CroppedImage {
                    image: extract(image, &clipped)?,
                    region_index,
                }),
                Err(e) => {
                    log::warn!("Skipping crop region {region_index}: {e}");
                    outcome.skipped += 1;
                }
            }
        }
        Ok(outcome)
    }
}

/// `clipped` must already lie inside `image`.
fn extract(image: &Image, clipped: &Rect) -> Result<Image, ImageDataError> {
    let x1 = clipped.x as usize;
    let y1 = clipped.y as usize;
    let x2 = x1 + clipped.width as usize;
    let y2 = y1 + clipped.height as usize;

    let src = image.as_ndarray();
    let data: Vec<u8> = src.slice(s![y1..y2, x1..x2, ..]).iter().copied().collect();
    Image::new(
        data,
        clipped.width as u32,
        clipped.height as u32,
        SourceFormat::Raw,
    )
}
