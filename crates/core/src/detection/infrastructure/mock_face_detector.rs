use std::thread;
use std::time::{Duration, Instant};

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::detection::domain::face_region::FaceRegion;
use crate::detection::domain::region_filter::{filter_regions, ConfidenceThreshold};
use crate::shared::constants::DEFAULT_MIN_FACE_DIMENSION;
use crate::shared::raster::Image;

/// Deterministic stand-in for a real model.
///
/// Output depends only on the image dimensions. Each layout tier switches on
/// once both sides exceed a multiple of `min_dimension`:
///
/// | tier | both sides >       | region                    | confidence |
/// |------|--------------------|---------------------------|------------|
/// | 1    | `min_dimension`    | `(w/4, h/4, w/4, h/4)`    | 0.95       |
/// | 2    | `2 * min_dimension`| `(2w/3, h/3, w/5, h/5)`   | 0.87       |
/// | 3    | `3 * min_dimension`| `(w/2, 2h/3, w/6, h/6)`   | 0.92       |
pub struct MockFaceDetector {
    threshold: ConfidenceThreshold,
    min_dimension: u32,
    fixture: Option<Vec<FaceRegion>>,
    latency: Duration,
}

impl MockFaceDetector {
    pub fn new(threshold: ConfidenceThreshold) -> Self {
        Self {
            threshold,
            min_dimension: DEFAULT_MIN_FACE_DIMENSION,
            fixture: None,
            latency: Duration::ZERO,
        }
    }

    pub fn with_min_dimension(mut self, min_dimension: u32) -> Self {
        self.min_dimension = min_dimension;
        self
    }

    /// Returns `regions` for every image instead of the dimension layout.
    /// Threshold and clipping still apply.
    pub fn with_regions(mut self, regions: Vec<FaceRegion>) -> Self {
        self.fixture = Some(regions);
        self
    }

    /// Sleeps for `latency` inside every `detect` call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn layout(&self, width: u32, height: u32) -> Vec<FaceRegion> {
        let exceeds = |tier: u64| {
            let limit = u64::from(self.min_dimension) * tier;
            u64::from(width) > limit && u64::from(height) > limit
        };
        let tiers = [
            (1, [(1, 4), (1, 4), (1, 4), (1, 4)], 0.95),
            (2, [(2, 3), (1, 3), (1, 5), (1, 5)], 0.87),
            (3, [(1, 2), (2, 3), (1, 6), (1, 6)], 0.92),
        ];
        tiers
            .iter()
            .filter(|(tier, _, _)| exceeds(*tier))
            .filter_map(|(_, [x, y, w, h], confidence)| {
                FaceRegion::new(
                    fraction(width, *x),
                    fraction(height, *y),
                    fraction(width, *w),
                    fraction(height, *h),
                    *confidence,
                )
                .ok()
            })
            .collect()
    }
}

impl Default for MockFaceDetector {
    fn default() -> Self {
        Self::new(ConfidenceThreshold::default())
    }
}

impl FaceDetector for MockFaceDetector {
    fn detect<'a>(&self, image: &'a Image) -> Result<DetectionResult<'a>, DetectionError> {
        let start = Instant::now();
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let raw = match &self.fixture {
            Some(regions) => regions.clone(),
            None => self.layout(image.width(), image.height()),
        };
        let regions = filter_regions(raw, self.threshold, image.bounds());
        Ok(DetectionResult::new(image, regions, start.elapsed()))
    }
}

fn fraction(value: u32, (num, den): (u64, u64)) -> i32 {
    (u64::from(value) * num / den).min(i32::MAX as u64) as i32
}
