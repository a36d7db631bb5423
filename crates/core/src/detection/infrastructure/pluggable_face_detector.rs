use std::time::{Duration, Instant};

use thiserror::Error;

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::detection::domain::face_region::{FaceRegion, Landmarks};
use crate::detection::domain::region_filter::{filter_regions, ConfidenceThreshold};
use crate::shared::raster::Image;

/// One detection as a backend reports it, before any validation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
    pub landmarks: Option<Landmarks>,
}

impl RawDetection {
    pub fn new(x: i32, y: i32, width: i32, height: i32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
            landmarks: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("backend could not read input: {0}")]
    Unreadable(String),
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(String),
}

impl From<BackendError> for DetectionError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unreadable(reason) => DetectionError::Unreadable(reason),
            BackendError::Timeout(elapsed) => DetectionError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
            },
            BackendError::Failed(reason) => DetectionError::InternalFailure(reason),
        }
    }
}

/// A face detection model seen as a function of raw RGB8 pixels.
///
/// `pixels` is row-major, three bytes per pixel, `width * height * 3` long.
pub trait DetectionBackend: Send + Sync {
    fn infer(&self, pixels: &[u8], width: u32, height: u32)
        -> Result<Vec<RawDetection>, BackendError>;
}

/// Adapts any [`DetectionBackend`] to the [`FaceDetector`] contract.
pub struct PluggableFaceDetector {
    backend: Box<dyn DetectionBackend>,
    threshold: ConfidenceThreshold,
}

impl PluggableFaceDetector {
    pub fn new(backend: Box<dyn DetectionBackend>, threshold: ConfidenceThreshold) -> Self {
        Self { backend, threshold }
    }
}

impl FaceDetector for PluggableFaceDetector {
    fn detect<'a>(&self, image: &'a Image) -> Result<DetectionResult<'a>, DetectionError> {
        let start = Instant::now();
        let raw = self
            .backend
            .infer(image.data(), image.width(), image.height())?;
        let regions = filter_regions(to_regions(raw), self.threshold, image.bounds());
        Ok(DetectionResult::new(image, regions, start.elapsed()))
    }
}

/// Converts backend output to validated regions, keeping backend order.
///
/// Non-finite confidences are dropped; finite ones are clamped into [0, 1].
/// Detections without positive size cannot form a region and are dropped.
fn to_regions(raw: Vec<RawDetection>) -> Vec<FaceRegion> {
    raw.into_iter()
        .filter_map(|det| {
            if !det.confidence.is_finite() {
                log::warn!(
                    "Dropping detection at ({}, {}) with non-finite confidence",
                    det.x,
                    det.y
                );
                return None;
            }
            let confidence = det.confidence.clamp(0.0, 1.0);
            match FaceRegion::new(det.x, det.y, det.width, det.height, confidence) {
                Ok(region) => Some(match det.landmarks {
                    Some(landmarks) => region.with_landmarks(landmarks),
                    None => region,
                }),
                Err(e) => {
                    log::warn!("Dropping detection: {e}");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::Rect;
    use crate::shared::raster::SourceFormat;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubBackend {
        output: Result<Vec<RawDetection>, BackendError>,
        seen: Arc<AtomicUsize>,
    }

    impl StubBackend {
        fn returning(detections: Vec<RawDetection>) -> Self {
            Self {
                output: Ok(detections),
                seen: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(err: BackendError) -> Self {
            Self {
                output: Err(err),
                seen: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DetectionBackend for StubBackend {
        fn infer(
            &self,
            pixels: &[u8],
            width: u32,
            height: u32,
        ) -> Result<Vec<RawDetection>, BackendError> {
            assert_eq!(pixels.len(), (width * height * 3) as usize);
            self.seen.store(pixels.len(), Ordering::SeqCst);
            self.output.clone()
        }
    }

    fn image() -> Image {
        Image::new(vec![10u8; 100 * 80 * 3], 100, 80, SourceFormat::Raw).unwrap()
    }

    fn detector(backend: StubBackend) -> PluggableFaceDetector {
        PluggableFaceDetector::new(Box::new(backend), ConfidenceThreshold::default())
    }

    #[test]
    fn test_backend_receives_full_pixel_buffer() {
        let backend = StubBackend::returning(vec![]);
        let seen = Arc::clone(&backend.seen);
        let img = image();
        detector(backend).detect(&img).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 100 * 80 * 3);
    }

    #[test]
    fn test_order_is_preserved() {
        let img = image();
        let result = detector(StubBackend::returning(vec![
            RawDetection::new(50, 10, 20, 20, 0.7),
            RawDetection::new(0, 0, 20, 20, 0.9),
            RawDetection::new(20, 40, 20, 20, 0.6),
        ]))
        .detect(&img)
        .unwrap();
        let xs: Vec<i32> = result.regions().iter().map(FaceRegion::x).collect();
        assert_eq!(xs, vec![50, 0, 20]);
    }

    #[test]
    fn test_non_finite_confidence_dropped_and_others_clamped() {
        let img = image();
        let result = detector(StubBackend::returning(vec![
            RawDetection::new(0, 0, 10, 10, f32::NAN),
            RawDetection::new(10, 10, 10, 10, f32::INFINITY),
            RawDetection::new(20, 20, 10, 10, 1.7),
            RawDetection::new(30, 30, 10, 10, -0.3),
        ]))
        .detect(&img)
        .unwrap();
        assert_eq!(result.total_faces(), 1);
        assert_eq!(result.regions()[0].confidence(), 1.0);
    }

    #[test]
    fn test_degenerate_detections_dropped() {
        let img = image();
        let result = detector(StubBackend::returning(vec![
            RawDetection::new(0, 0, 0, 10, 0.9),
            RawDetection::new(0, 0, 10, -4, 0.9),
        ]))
        .detect(&img)
        .unwrap();
        assert_eq!(result.total_faces(), 0);
    }

    #[test]
    fn test_detections_clipped_to_image() {
        let img = image();
        let result = detector(StubBackend::returning(vec![RawDetection::new(
            90, 70, 30, 30, 0.9,
        )]))
        .detect(&img)
        .unwrap();
        assert_eq!(result.regions()[0].rect(), Rect::new(90, 70, 10, 10));
    }

    #[test]
    fn test_landmarks_are_carried() {
        let img = image();
        let landmarks = Landmarks::from([("left_eye".to_string(), (12.0, 14.0))]);
        let mut det = RawDetection::new(5, 5, 20, 20, 0.8);
        det.landmarks = Some(landmarks.clone());
        let result = detector(StubBackend::returning(vec![det])).detect(&img).unwrap();
        assert_eq!(result.regions()[0].landmarks(), Some(&landmarks));
    }

    #[test]
    fn test_backend_errors_map_to_detection_errors() {
        let img = image();
        let cases = [
            (
                BackendError::Unreadable("bad stride".into()),
                DetectionError::Unreadable("bad stride".into()),
            ),
            (
                BackendError::Timeout(Duration::from_millis(1500)),
                DetectionError::Timeout { elapsed_ms: 1500 },
            ),
            (
                BackendError::Failed("session lost".into()),
                DetectionError::InternalFailure("session lost".into()),
            ),
        ];
        for (backend_err, expected) in cases {
            let err = detector(StubBackend::failing(backend_err))
                .detect(&img)
                .unwrap_err();
            assert_eq!(err, expected);
        }
    }
}
