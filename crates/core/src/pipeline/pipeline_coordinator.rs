use std::sync::Arc;
use std::time::Instant;

use crate::annotation::domain::annotation_style::AnnotationStyle;
use crate::annotation::domain::annotator::Annotator;
use crate::codec::{self, TransportFormat};
use crate::cropping::cropper::Cropper;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::cancellation::CancellationToken;
use crate::shared::geometry::Rect;

use super::pipeline_error::PipelineError;
use super::responses::{CropResponse, FaceSummary, UploadResponse};

/// Sequences the per-image stages of one call.
///
/// Upload: decode → detect → annotate → encode original → encode annotated.
/// Crop: decode → crop → encode each crop.
///
/// The token is checked between stages; a tripped token ends the call with
/// [`PipelineError::Timeout`]. Nothing is retained between calls.
pub struct PipelineCoordinator {
    detector: Arc<dyn FaceDetector>,
    annotator: Box<dyn Annotator>,
    cropper: Cropper,
    style: AnnotationStyle,
    output_format: TransportFormat,
}

impl PipelineCoordinator {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        annotator: Box<dyn Annotator>,
        style: AnnotationStyle,
        output_format: TransportFormat,
    ) -> Self {
        Self {
            detector,
            annotator,
            cropper: Cropper::new(),
            style,
            output_format,
        }
    }

    pub fn output_format(&self) -> TransportFormat {
        self.output_format
    }

    /// Detects faces in raw uploaded bytes and returns both images encoded.
    pub fn process_upload(
        &self,
        raw: &[u8],
        cancel: &CancellationToken,
    ) -> Result<UploadResponse, PipelineError> {
        let start = Instant::now();

        cancel.check()?;
        let image = codec::decode_bytes(raw)?;
        log::debug!(
            "Decoded {}x{} {} image in {:?}",
            image.width(),
            image.height(),
            image.format(),
            start.elapsed()
        );

        cancel.check()?;
        let detection = self.detector.detect(&image)?;
        log::debug!(
            "Detected {} faces in {:?}",
            detection.total_faces(),
            detection.duration()
        );

        cancel.check()?;
        let annotated = self.annotator.draw(
            detection.image(),
            detection.regions(),
            &self.style,
            cancel,
        )?;

        cancel.check()?;
        let original_image = codec::encode(&image, self.output_format)?;
        cancel.check()?;
        let annotated_image = codec::encode(&annotated, self.output_format)?;

        let faces: Vec<FaceSummary> = detection
            .regions()
            .iter()
            .map(FaceSummary::from)
            .collect();
        let elapsed = start.elapsed();
        log::info!(
            "Processed upload: {} faces in {}ms",
            faces.len(),
            elapsed.as_millis()
        );

        Ok(UploadResponse {
            original_image,
            annotated_image,
            total_faces: faces.len(),
            faces,
            processing_time_ms: elapsed.as_millis() as u64,
        })
    }

    /// Extracts `rects` from an encoded image.
    ///
    /// Rectangles with no overlap are counted in `skipped_count`; only a
    /// decode failure, cancellation or encoder failure fails the call.
    pub fn process_crop(
        &self,
        encoded: &str,
        rects: &[Rect],
        cancel: &CancellationToken,
    ) -> Result<CropResponse, PipelineError> {
        let start = Instant::now();

        cancel.check()?;
        let image = codec::decode(encoded)?;

        cancel.check()?;
        let outcome = self.cropper.crop(&image, rects, cancel)?;

        let mut response = CropResponse {
            skipped_count: outcome.skipped,
            ..CropResponse::default()
        };
        for crop in &outcome.crops {
            cancel.check()?;
            response
                .cropped_images
                .push(codec::encode(&crop.image, self.output_format)?);
            response.region_indices.push(crop.region_index);
        }

        log::info!(
            "Processed crop: {} of {} regions in {}ms",
            response.cropped_images.len(),
            rects.len(),
            start.elapsed().as_millis()
        );
        Ok(response)
    }
}
